//! Hand-written record used by the unit tests.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::ScanError;
use crate::record::{FieldDescriptor, Record, RecordDescriptor};
use crate::settings::Settings;
use crate::table::Table;
use crate::value::{SqlField, SqlValue};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Account {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub tenant: String,
    pub email: String,
    pub name: String,
    pub password: String,
    pub age: i32,
}

impl Record for Account {
    const TABLE_NAME: &'static str = "accounts";

    fn descriptor() -> RecordDescriptor {
        RecordDescriptor::new(
            "Account",
            vec![
                FieldDescriptor::value("id", "type=uuid,primary", Uuid::HOST, false),
                FieldDescriptor::value(
                    "created_at",
                    "type=timestamp,default=clock_timestamp()",
                    <DateTime<Utc>>::HOST,
                    false,
                ),
                FieldDescriptor::value(
                    "tenant",
                    "type=varchar(64),unique_index=accounts_tenant_email",
                    String::HOST,
                    false,
                ),
                FieldDescriptor::value(
                    "email",
                    "type=varchar(255),unique_index=accounts_tenant_email",
                    String::HOST,
                    false,
                ),
                FieldDescriptor::value("name", "type=text", String::HOST, false),
                FieldDescriptor::value("password", "password", String::HOST, false),
                FieldDescriptor::value("age", "type=integer,default=0", i32::HOST, false),
            ],
        )
    }

    fn field_value(&self, path: &[usize]) -> Option<SqlValue> {
        match path {
            [0] => Some(self.id.to_sql_value()),
            [1] => Some(self.created_at.to_sql_value()),
            [2] => Some(self.tenant.to_sql_value()),
            [3] => Some(self.email.to_sql_value()),
            [4] => Some(self.name.to_sql_value()),
            [5] => Some(self.password.to_sql_value()),
            [6] => Some(self.age.to_sql_value()),
            _ => None,
        }
    }

    fn set_field_value(&mut self, path: &[usize], value: SqlValue) -> Result<(), ScanError> {
        match path {
            [0] => self.id = SqlField::from_sql_value(value)?,
            [1] => self.created_at = SqlField::from_sql_value(value)?,
            [2] => self.tenant = SqlField::from_sql_value(value)?,
            [3] => self.email = SqlField::from_sql_value(value)?,
            [4] => self.name = SqlField::from_sql_value(value)?,
            [5] => self.password = SqlField::from_sql_value(value)?,
            [6] => self.age = SqlField::from_sql_value(value)?,
            _ => {
                return Err(ScanError::UnknownField {
                    path: path.to_vec(),
                })
            }
        }
        Ok(())
    }
}

pub fn account() -> Account {
    Account {
        id: Uuid::from_u128(0x1234),
        tenant: "acme".into(),
        email: "ada@example.com".into(),
        name: "Ada".into(),
        password: "secret".into(),
        age: 30,
        ..Account::default()
    }
}

pub fn accounts() -> Table {
    match Table::from_record::<Account>(Account::TABLE_NAME, &Settings::default()) {
        Ok(table) => table,
        Err(err) => panic!("accounts table: {err}"),
    }
}

//! Registry of record types and the schema dump built from it.

use std::any::TypeId;
use std::collections::HashMap;

use tracing::debug;

use crate::builder::{build_alter_table_foreign_keys_queries, build_create_table_query, quote_identifier};
use crate::catalog::Trigger;
use crate::data_type::DataType;
use crate::error::{AnnotationError, QueryBuildError};
use crate::record::Record;
use crate::settings::Settings;
use crate::table::{PasswordHandler, Table, TableKind};

/// Table models of every registered record type, in registration order.
///
/// The registry is filled once at startup and only read afterwards.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    settings: Settings,
    tables: Vec<Table>,
    types: HashMap<TypeId, usize>,
    password_handler: Option<PasswordHandler>,
}

impl Schema {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Settings used for every registration.
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Sets the password hooks stamped on tables registered afterwards.
    #[must_use]
    pub fn handle_password(mut self, handler: PasswordHandler) -> Self {
        if handler.can_encrypt() || handler.can_decrypt() {
            self.password_handler = Some(handler);
        }
        self
    }

    /// Registers `R` as a base table named [`Record::TABLE_NAME`].
    pub fn register<R: Record>(&mut self) -> Result<&mut Table, AnnotationError> {
        self.register_as::<R>(R::TABLE_NAME, TableKind::Base)
    }

    /// Registers `R` under `name` with the given kind.
    pub fn register_as<R: Record>(
        &mut self,
        name: &str,
        kind: TableKind,
    ) -> Result<&mut Table, AnnotationError> {
        let type_id = TypeId::of::<R>();
        if self.types.contains_key(&type_id) || self.get_by_name(name).is_some() {
            return Err(AnnotationError::AlreadyRegistered {
                table: name.to_string(),
            });
        }

        let mut table = Table::from_record::<R>(name, &self.settings)?;
        table.position = self.tables.len() + 1;
        table.password_handler.clone_from(&self.password_handler);
        table.set_kind(kind);

        debug!(
            table = %table.name,
            kind = kind.as_str(),
            position = table.position,
            "registered table"
        );

        let index = self.tables.len();
        self.types.insert(type_id, index);
        self.tables.push(table);
        Ok(&mut self.tables[index])
    }

    /// The table of a registered record type.
    #[must_use]
    pub fn get<R: Record>(&self) -> Option<&Table> {
        self.types
            .get(&TypeId::of::<R>())
            .map(|&index| &self.tables[index])
    }

    /// The table with the given name.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// The table with the given name, for modification.
    pub fn get_by_name_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.name == name)
    }

    /// Tables of the given kinds in registration order; every table when
    /// `kinds` is empty.
    #[must_use]
    pub fn tables(&self, kinds: &[TableKind]) -> Vec<&Table> {
        self.tables
            .iter()
            .filter(|t| kinds.is_empty() || kinds.contains(&t.kind))
            .collect()
    }

    /// Names of the tables of the given kinds.
    #[must_use]
    pub fn table_names(&self, kinds: &[TableKind]) -> Vec<String> {
        self.tables(kinds).into_iter().map(|t| t.name.clone()).collect()
    }

    /// True if any table has a column of one of the given types.
    #[must_use]
    pub fn has_column_type(&self, data_types: &[DataType]) -> bool {
        self.tables
            .iter()
            .any(|t| data_types.iter().any(|&d| t.has_column_type(d)))
    }

    /// True if any table has a password column.
    #[must_use]
    pub fn has_password(&self) -> bool {
        self.tables.iter().any(|t| t.password_column().is_some())
    }

    /// Sets the strict flag of every table.
    pub fn set_strict(&mut self, strict: bool) {
        for table in &mut self.tables {
            table.set_strict(strict);
        }
    }

    pub(crate) fn tables_mut(&mut self) -> impl Iterator<Item = &mut Table> {
        self.tables.iter_mut()
    }

    /// Statements creating the whole schema, in execution order.
    ///
    /// Triggers listed in `existing_triggers` are not created again.
    pub fn create_sql(&self, existing_triggers: &[Trigger]) -> Result<Vec<String>, QueryBuildError> {
        let mut statements = vec![format!(
            "CREATE SCHEMA IF NOT EXISTS {};",
            quote_identifier(&self.settings.search_path)
        )];

        if self.has_column_type(&[DataType::Uuid]) || self.has_password() {
            statements.push("CREATE EXTENSION IF NOT EXISTS pgcrypto;".to_string());
        }
        if self.has_column_type(&[DataType::CiText]) {
            statements.push("CREATE EXTENSION IF NOT EXISTS citext;".to_string());
        }
        if self.has_column_type(&[DataType::HStore]) {
            statements.push("CREATE EXTENSION IF NOT EXISTS hstore;".to_string());
        }

        let tables = self.tables(&[TableKind::Base]);
        for table in &tables {
            statements.extend(build_create_table_query(table)?);
        }
        for table in &tables {
            statements.extend(build_alter_table_foreign_keys_queries(table));
        }

        statements.extend(self.set_timestamp_sql(&tables, existing_triggers));

        debug!(statements = statements.len(), "built schema dump");
        Ok(statements)
    }

    fn set_timestamp_sql(&self, tables: &[&Table], existing_triggers: &[Trigger]) -> Vec<String> {
        let trigger = &self.settings.set_timestamp_trigger;
        let column = &self.settings.updated_at_column;
        if trigger.is_empty() || column.is_empty() {
            return Vec::new();
        }

        let mut statements = Vec::new();
        for table in tables {
            let installed = existing_triggers
                .iter()
                .any(|t| t.name == *trigger && t.table_name == table.name);
            let has_column = table.column(column).is_some_and(|c| {
                matches!(c.data_type, Some(DataType::Timestamp | DataType::TimestampTz))
            });
            if installed || !has_column {
                continue;
            }

            if statements.is_empty() {
                statements.push(format!(
                    "CREATE OR REPLACE FUNCTION trigger_{trigger}() RETURNS TRIGGER AS $$ BEGIN NEW.{} = NOW(); RETURN NEW; END; $$ LANGUAGE plpgsql;",
                    quote_identifier(column)
                ));
            }
            statements.push(format!(
                "CREATE TRIGGER {} BEFORE UPDATE ON {} FOR EACH ROW EXECUTE PROCEDURE trigger_{trigger}();",
                quote_identifier(trigger),
                table.qualified_name()
            ));
        }
        statements
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Account;

    fn schema() -> Schema {
        let mut schema = Schema::new(Settings::default());
        schema.register::<Account>().unwrap();
        schema
    }

    #[test]
    fn test_register_and_lookup() {
        let schema = schema();
        let table = schema.get::<Account>().unwrap();
        assert_eq!(table.name, "accounts");
        assert_eq!(table.position, 1);
        assert!(schema.get_by_name("accounts").is_some());
        assert_eq!(schema.table_names(&[]), vec!["accounts"]);
        assert!(schema.table_names(&[TableKind::View]).is_empty());
        assert!(schema.has_password());
        assert!(schema.has_column_type(&[DataType::Uuid]));
        assert!(!schema.has_column_type(&[DataType::HStore]));
    }

    #[test]
    fn test_register_twice_rejected() {
        let mut schema = schema();
        let err = schema.register::<Account>().unwrap_err();
        assert!(matches!(err, AnnotationError::AlreadyRegistered { .. }));
    }

    #[test]
    fn test_register_as_view_stamps_kind() {
        let mut schema = Schema::new(Settings::default());
        let table = schema
            .register_as::<Account>("account_view", TableKind::View)
            .unwrap();
        assert!(table.is_read_only());
        assert!(table.columns.iter().all(|c| c.table_kind == TableKind::View));
    }

    #[test]
    fn test_password_handler_stamped() {
        let mut schema = Schema::new(Settings::default())
            .handle_password(PasswordHandler::new().with_encrypt(|_, p| Ok(p.to_string())));
        let table = schema.register::<Account>().unwrap();
        assert!(table.password_handler.is_some());
    }

    #[test]
    fn test_create_sql() {
        let statements = schema().create_sql(&[]).unwrap();
        assert_eq!(statements[0], r#"CREATE SCHEMA IF NOT EXISTS "public";"#);
        assert_eq!(statements[1], "CREATE EXTENSION IF NOT EXISTS pgcrypto;");
        assert!(statements[2].starts_with(r#"CREATE TABLE IF NOT EXISTS "public"."accounts""#));
        assert_eq!(statements.len(), 3);
    }
}

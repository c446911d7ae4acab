//! SQL statement builders.
//!
//! Every builder takes a [`Table`] model and, where relevant, a record whose
//! field values become positional `$n` arguments. Identifiers are always
//! double-quoted and DML statements address tables as `"schema"."table"`.
//!
//! # Example
//!
//! ```rust
//! use oxide_pg_core::builder::build_duplicate_query;
//! use oxide_pg_core::{Column, DataType, SqlValue, Table};
//!
//! let mut table = Table::new("public", "plans");
//! table.add_columns([
//!     Column {
//!         name: "id".into(),
//!         data_type: Some(DataType::Integer),
//!         primary_key: true,
//!         ..Column::default()
//!     },
//!     Column {
//!         name: "name".into(),
//!         data_type: Some(DataType::Text),
//!         ..Column::default()
//!     },
//! ]);
//!
//! let (sql, args) = build_duplicate_query(&table, SqlValue::Int(7), true).unwrap();
//! assert_eq!(
//!     sql,
//!     r#"INSERT INTO "public"."plans" ("name") SELECT "name" FROM "public"."plans" WHERE "id" = $1 RETURNING "id";"#
//! );
//! assert_eq!(args, vec![SqlValue::Int(7)]);
//! ```

mod alter_table;
mod create_table;
mod delete;
mod duplicate;
mod exists;
mod insert;
mod update;

pub use alter_table::build_alter_table_foreign_keys_queries;
pub use create_table::build_create_table_query;
pub use delete::build_delete_query;
pub use duplicate::build_duplicate_query;
pub use exists::build_exists_query;
pub use insert::{build_insert_query, InsertQuery};
pub use update::build_update_query;

use crate::error::QueryBuildError;
use crate::record::Record;
use crate::table::{Column, Table};
use crate::value::SqlValue;

/// A generated statement and its positional arguments.
pub type Statement = (String, Vec<SqlValue>);

/// Quotes an identifier, doubling embedded double quotes.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quotes and comma-joins identifiers.
fn quote_list<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    names
        .into_iter()
        .map(quote_identifier)
        .collect::<Vec<_>>()
        .join(", ")
}

/// `$n` placeholder for a one-based position.
fn placeholder(position: usize) -> String {
    format!("${position}")
}

/// Placeholder for a password column hashed in SQL.
fn crypt_placeholder(table: &Table, position: usize) -> String {
    format!(
        "crypt({}, gen_salt('{}'))",
        placeholder(position),
        table.crypt_algorithm
    )
}

/// Placeholder for `column`, wrapping passwords in `crypt(..)` unless the
/// table encrypts them programmatically.
fn value_placeholder(table: &Table, column: &Column, position: usize) -> String {
    if column.password && !can_encrypt(table) {
        crypt_placeholder(table, position)
    } else {
        placeholder(position)
    }
}

fn can_encrypt(table: &Table) -> bool {
    table
        .password_handler
        .as_ref()
        .is_some_and(|handler| handler.can_encrypt())
}

/// A column paired with the value read from a record.
#[derive(Debug, Clone)]
struct Argument<'t> {
    column: &'t Column,
    value: SqlValue,
}

/// Reads the value bound to `column`, encrypting passwords when the table
/// carries an encrypt hook. Returns `None` for columns with no bound field.
fn column_value<R: Record>(
    table: &Table,
    column: &Column,
    record: &R,
) -> Result<Option<SqlValue>, QueryBuildError> {
    if column.field_path.is_empty() {
        return Ok(None);
    }
    let Some(value) = record.field_value(&column.field_path) else {
        return Ok(None);
    };

    if !column.password {
        return Ok(Some(value));
    }

    match (&table.password_handler, value) {
        (Some(handler), SqlValue::Text(plain)) if handler.can_encrypt() && !plain.is_empty() => {
            let encrypted =
                handler
                    .encrypt(&table.name, &plain)
                    .map_err(|source| QueryBuildError::Credential {
                        table: table.name.clone(),
                        source,
                    })?;
            Ok(Some(SqlValue::Text(encrypted)))
        }
        (_, value) => Ok(Some(value)),
    }
}

/// Collects the arguments of every non-presenter column accepted by `keep`.
///
/// Zero values are dropped unless `include_zero` is set.
fn extract_arguments<'t, R: Record>(
    table: &'t Table,
    record: &R,
    include_zero: bool,
    mut keep: impl FnMut(&Column) -> bool,
) -> Result<Vec<Argument<'t>>, QueryBuildError> {
    let mut args = Vec::new();
    for column in table.columns.iter().filter(|c| !c.presenter) {
        if !keep(column) {
            continue;
        }
        let Some(value) = column_value(table, column, record)? else {
            continue;
        };
        if !include_zero && value.is_zero() {
            continue;
        }
        args.push(Argument { column, value });
    }
    Ok(args)
}

/// The primary key column and its value in `record`.
fn primary_key_value<'t, R: Record>(
    table: &'t Table,
    record: &R,
) -> Result<(&'t Column, SqlValue), QueryBuildError> {
    let primary_key = table
        .primary_key()
        .ok_or_else(|| QueryBuildError::NoPrimaryKey {
            table: table.name.clone(),
        })?;

    match column_value(table, primary_key, record)? {
        Some(value) if !value.is_zero() => Ok((primary_key, value)),
        _ => Err(QueryBuildError::MissingPrimaryKeyValue {
            table: table.name.clone(),
        }),
    }
}

fn ensure_writable(table: &Table) -> Result<(), QueryBuildError> {
    if table.is_read_only() {
        return Err(QueryBuildError::ReadOnly {
            table: table.name.clone(),
        });
    }
    Ok(())
}

//! Row duplication through INSERT .. SELECT.

use super::{ensure_writable, quote_identifier, quote_list, Statement};
use crate::error::QueryBuildError;
use crate::table::Table;
use crate::value::SqlValue;

/// Builds an `INSERT .. SELECT` copying the row whose primary key is `id`.
///
/// The primary key and database-generated columns are left to their defaults.
/// A column referencing the table's own primary key selects
/// `COALESCE(column, pk)`, so the copy points at the original when the source
/// row had no parent.
pub fn build_duplicate_query(
    table: &Table,
    id: SqlValue,
    returning: bool,
) -> Result<Statement, QueryBuildError> {
    ensure_writable(table)?;
    let primary_key = table
        .primary_key()
        .ok_or_else(|| QueryBuildError::NoPrimaryKey {
            table: table.name.clone(),
        })?;
    if id.is_zero() {
        return Err(QueryBuildError::MissingPrimaryKeyValue {
            table: table.name.clone(),
        });
    }

    let columns: Vec<&str> = table
        .columns
        .iter()
        .filter(|c| {
            !c.primary_key && !c.presenter && !c.auto_generated && !c.identity && !c.is_generated()
        })
        .map(|c| c.name.as_str())
        .collect();

    if columns.is_empty() {
        return Err(QueryBuildError::NoColumns {
            table: table.name.clone(),
        });
    }

    let pk = quote_identifier(&primary_key.name);
    let selected: Vec<String> = columns
        .iter()
        .filter_map(|name| table.column(name))
        .map(|c| {
            if c.references(&table.name, &primary_key.name) {
                format!("COALESCE({}, {pk})", quote_identifier(&c.name))
            } else {
                quote_identifier(&c.name)
            }
        })
        .collect();

    let mut sql = format!(
        "INSERT INTO {qualified} ({}) SELECT {} FROM {qualified} WHERE {pk} = $1",
        quote_list(columns.iter().copied()),
        selected.join(", "),
        qualified = table.qualified_name(),
    );
    if returning {
        sql.push_str(" RETURNING ");
        sql.push_str(&pk);
    }
    sql.push(';');

    Ok((sql, vec![id]))
}

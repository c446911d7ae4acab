//! UPDATE generation.

use tracing::trace;

use super::{
    ensure_writable, extract_arguments, placeholder, primary_key_value, quote_identifier,
    value_placeholder, Statement,
};
use crate::error::QueryBuildError;
use crate::record::Record;
use crate::table::Table;

/// Builds an UPDATE of the row identified by the record's primary key.
///
/// With an empty `only_columns` every column except the primary key and the
/// database-generated ones is updated, and zero values are left out. Naming
/// columns updates exactly those, zero values included. A primary key named in
/// `only_columns` is updated too and its placeholder is reused by the WHERE
/// clause.
pub fn build_update_query<R: Record>(
    table: &Table,
    record: &R,
    only_columns: &[&str],
) -> Result<Statement, QueryBuildError> {
    ensure_writable(table)?;
    let (primary_key, id) = primary_key_value(table, record)?;

    for name in only_columns {
        if !table.column_exists(name) {
            return Err(QueryBuildError::UnknownColumn {
                table: table.name.clone(),
                column: (*name).to_string(),
            });
        }
    }

    let args = if only_columns.is_empty() {
        extract_arguments(table, record, false, |c| {
            !c.primary_key && !c.auto_generated && !c.is_generated()
        })?
    } else {
        extract_arguments(table, record, true, |c| {
            only_columns.iter().any(|n| n.eq_ignore_ascii_case(&c.name))
        })?
    };

    if args.is_empty() {
        return Err(QueryBuildError::NoArguments {
            table: table.name.clone(),
        });
    }

    let sets: Vec<String> = args
        .iter()
        .enumerate()
        .map(|(i, a)| {
            format!(
                "{} = {}",
                quote_identifier(&a.column.name),
                value_placeholder(table, a.column, i + 1)
            )
        })
        .collect();

    let mut values: Vec<_> = args.iter().map(|a| a.value.clone()).collect();
    let where_position = match args.iter().position(|a| a.column.primary_key) {
        Some(i) => i + 1,
        None => {
            values.push(id);
            values.len()
        }
    };

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = {};",
        table.qualified_name(),
        sets.join(", "),
        quote_identifier(&primary_key.name),
        placeholder(where_position)
    );

    trace!(table = %table.name, %sql, "built update query");
    Ok((sql, values))
}

//! Batched DELETE by primary key.

use tracing::trace;

use super::{ensure_writable, primary_key_value, quote_identifier, Statement};
use crate::error::QueryBuildError;
use crate::record::Record;
use crate::table::Table;
use crate::value::SqlValue;

/// Builds `DELETE .. WHERE pk = ANY($1)` over the primary keys of `records`.
///
/// The single argument is an array holding one value per record.
pub fn build_delete_query<R: Record>(
    table: &Table,
    records: &[R],
) -> Result<Statement, QueryBuildError> {
    ensure_writable(table)?;
    let primary_key = table
        .primary_key()
        .ok_or_else(|| QueryBuildError::NoPrimaryKey {
            table: table.name.clone(),
        })?;

    if records.is_empty() {
        return Err(QueryBuildError::NoArguments {
            table: table.name.clone(),
        });
    }

    let ids = records
        .iter()
        .map(|record| primary_key_value(table, record).map(|(_, id)| id))
        .collect::<Result<Vec<_>, _>>()?;

    let sql = format!(
        "DELETE FROM {} WHERE {} = ANY($1);",
        table.qualified_name(),
        quote_identifier(&primary_key.name)
    );

    trace!(table = %table.name, rows = ids.len(), "built delete query");
    Ok((sql, vec![SqlValue::Array(ids)]))
}

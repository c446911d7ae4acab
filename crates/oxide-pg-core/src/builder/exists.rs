//! EXISTS check built from the set fields of a record.

use tracing::trace;

use super::{extract_arguments, placeholder, quote_identifier, Statement};
use crate::error::QueryBuildError;
use crate::record::Record;
use crate::table::Table;

/// Builds `SELECT EXISTS(SELECT 1 FROM .. WHERE a = $1 AND b = $2 ..)` from
/// every non-zero field of `sample`.
pub fn build_exists_query<R: Record>(table: &Table, sample: &R) -> Result<Statement, QueryBuildError> {
    let args = extract_arguments(table, sample, false, |_| true)?;
    if args.is_empty() {
        return Err(QueryBuildError::NoArguments {
            table: table.name.clone(),
        });
    }

    let conditions: Vec<String> = args
        .iter()
        .enumerate()
        .map(|(i, a)| format!("{} = {}", quote_identifier(&a.column.name), placeholder(i + 1)))
        .collect();

    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE {});",
        table.qualified_name(),
        conditions.join(" AND ")
    );
    trace!(table = %table.name, %sql, "built exists query");
    Ok((sql, args.into_iter().map(|a| a.value).collect()))
}

//! Foreign key constraints, added after every table exists.

use super::quote_identifier;
use crate::table::Table;

/// Builds a drop-if-exists and an add statement per foreign key column.
///
/// Constraints are named `{table}_{column}_fkey` and reference tables in the
/// same schema as `table`.
#[must_use]
pub fn build_alter_table_foreign_keys_queries(table: &Table) -> Vec<String> {
    let mut statements = Vec::new();
    if table.is_read_only() {
        return statements;
    }

    for column in table.foreign_key_columns() {
        let Some(reference) = &column.reference else {
            continue;
        };
        let constraint = quote_identifier(&format!("{}_{}_fkey", table.name, column.name));
        let qualified = table.qualified_name();

        statements.push(format!(
            "ALTER TABLE {qualified} DROP CONSTRAINT IF EXISTS {constraint};"
        ));

        let mut add = format!(
            "ALTER TABLE {qualified} ADD CONSTRAINT {constraint} FOREIGN KEY ({}) REFERENCES {}.{} ({}) ON DELETE {}",
            quote_identifier(&column.name),
            quote_identifier(&table.search_path),
            quote_identifier(&reference.table),
            quote_identifier(&reference.column),
            reference.on_delete
        );
        if reference.deferrable {
            add.push_str(" DEFERRABLE");
        }
        add.push(';');
        statements.push(add);
    }
    statements
}

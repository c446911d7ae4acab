//! Drift detection between registered tables and the live catalog.

use tracing::{debug, info};

use crate::catalog::{CatalogSource, Introspector};
use crate::error::{ReconcileError, Result};
use crate::schema::Schema;
use crate::table::{Table, TableKind};

/// Compares every registered base table, view and materialized view with its
/// live counterpart.
///
/// Stops at the first difference. Descriptions missing on one side are
/// copied from the other side.
pub async fn check_schema<S>(schema: &mut Schema, source: &S) -> Result<()>
where
    S: CatalogSource + Sync,
{
    let kinds = [TableKind::Base, TableKind::View, TableKind::MaterializedView];
    let names = schema.table_names(&kinds);
    debug!(tables = names.len(), "checking schema");

    let introspector = Introspector::new(source, schema.settings());
    let mut live_tables = introspector.list_tables(&names).await?;

    for table in schema.tables_mut().filter(|t| kinds.contains(&t.kind)) {
        let live = live_tables
            .iter_mut()
            .find(|live| live.name == table.name)
            .ok_or_else(|| ReconcileError::TableNotFound {
                table: table.name.clone(),
            })?;
        reconcile_table(table, live)?;
    }

    info!(tables = names.len(), "schema matches database");
    Ok(())
}

/// Compares a declared table with its live counterpart.
///
/// Every declared column except presenters must exist in `live` and render to
/// the same non-strict annotation, ignoring case. A strict table also rejects
/// live columns it does not declare.
pub fn reconcile_table(code: &mut Table, live: &mut Table) -> std::result::Result<(), ReconcileError> {
    for column in code.columns.iter_mut().filter(|c| !c.presenter) {
        let Some(live_column) = live.column_mut(&column.name) else {
            return Err(ReconcileError::ColumnNotFound {
                table: code.name.clone(),
                column: column.name.clone(),
            });
        };

        let code_tag = column.annotation(false).to_lowercase();
        let live_tag = live_column.annotation(false).to_lowercase();
        if code_tag != live_tag {
            return Err(ReconcileError::TagMismatch {
                table: code.name.clone(),
                column: column.name.clone(),
                live: live_column.annotation(false),
                code: column.annotation(false),
            });
        }

        if column.description.is_empty() {
            column.description.clone_from(&live_column.description);
        } else if live_column.description.is_empty() {
            live_column.description.clone_from(&column.description);
        }
    }

    if code.strict {
        if let Some(extra) = live.columns.iter().find(|c| !code.column_exists(&c.name)) {
            return Err(ReconcileError::UndeclaredColumn {
                table: code.name.clone(),
                column: extra.name.clone(),
            });
        }
    }

    if code.description.is_empty() {
        code.description.clone_from(&live.description);
    } else if live.description.is_empty() {
        live.description.clone_from(&code.description);
    }

    debug!(table = %code.name, "table matches database");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_type::DataType;
    use crate::table::Column;

    fn live() -> Table {
        let mut table = Table::new("public", "accounts");
        table.description = "User accounts.".into();
        table.add_columns([
            Column {
                name: "id".into(),
                data_type: Some(DataType::Uuid),
                primary_key: true,
                default: "gen_random_uuid()".into(),
                description: "Identifier.".into(),
                ..Column::default()
            },
            Column {
                name: "email".into(),
                data_type: Some(DataType::CharacterVarying),
                type_argument: "255".into(),
                ..Column::default()
            },
        ]);
        table
    }

    fn code() -> Table {
        let mut table = live();
        table.description.clear();
        for column in &mut table.columns {
            column.description.clear();
        }
        table.column_mut("email").unwrap().description = "Login.".into();
        table
    }

    #[test]
    fn test_descriptions_are_ignored_and_back_filled() {
        let mut code = code();
        let mut live = live();
        reconcile_table(&mut code, &mut live).unwrap();

        assert_eq!(code.description, "User accounts.");
        assert_eq!(code.column("id").unwrap().description, "Identifier.");
        assert_eq!(live.column("email").unwrap().description, "Login.");
    }

    #[test]
    fn test_missing_column() {
        let mut code = code();
        code.add_columns([Column {
            name: "age".into(),
            data_type: Some(DataType::Integer),
            ..Column::default()
        }]);
        let err = reconcile_table(&mut code, &mut live()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "column \"age\" in table \"accounts\" not found in schema"
        );
    }

    #[test]
    fn test_presenter_columns_are_not_checked() {
        let mut code = code();
        code.add_columns([Column {
            name: "total".into(),
            data_type: Some(DataType::BigInt),
            presenter: true,
            ..Column::default()
        }]);
        reconcile_table(&mut code, &mut live()).unwrap();
    }

    #[test]
    fn test_tag_mismatch_carries_both_renderings() {
        let mut code = code();
        code.column_mut("email").unwrap().unique = true;
        let err = reconcile_table(&mut code, &mut live()).unwrap_err();
        match err {
            ReconcileError::TagMismatch { live, code, .. } => {
                assert_eq!(live, "name=email,type=varchar");
                assert_eq!(code, "name=email,type=varchar,unique");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_comparison_ignores_case() {
        let mut code = code();
        code.column_mut("id").unwrap().default = "GEN_RANDOM_UUID()".into();
        reconcile_table(&mut code, &mut live()).unwrap();
    }

    #[test]
    fn test_strict_rejects_undeclared_live_column() {
        let mut code = code();
        code.remove_columns(&["email"]);
        reconcile_table(&mut code, &mut live()).unwrap();

        code.set_strict(true);
        let err = reconcile_table(&mut code, &mut live()).unwrap_err();
        assert!(matches!(err, ReconcileError::UndeclaredColumn { ref column, .. } if column == "email"));
    }
}

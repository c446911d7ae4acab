//! CREATE TABLE and CREATE INDEX generation.

use tracing::debug;

use super::{ensure_writable, quote_identifier, quote_list};
use crate::error::QueryBuildError;
use crate::table::{Column, Table};

/// Builds the `CREATE TABLE IF NOT EXISTS` statement of a base table followed
/// by one `CREATE INDEX IF NOT EXISTS` statement per indexed column.
///
/// Presenter columns are skipped. Foreign keys are emitted separately by
/// [`super::build_alter_table_foreign_keys_queries`] so the creation order of
/// tables does not matter.
pub fn build_create_table_query(table: &Table) -> Result<Vec<String>, QueryBuildError> {
    ensure_writable(table)?;

    let mut definitions: Vec<String> = table
        .columns
        .iter()
        .filter(|c| !c.presenter)
        .map(column_definition)
        .collect();

    if definitions.is_empty() {
        return Err(QueryBuildError::NoColumns {
            table: table.name.clone(),
        });
    }

    if let Some(primary_key) = table.primary_key() {
        definitions.push(format!(
            "PRIMARY KEY ({})",
            quote_identifier(&primary_key.name)
        ));
    }

    for group in table.unique_indexes() {
        definitions.push(format!(
            "CONSTRAINT {} UNIQUE ({})",
            quote_identifier(&group.name),
            quote_list(group.columns.iter().map(String::as_str))
        ));
    }

    let mut statements = vec![format!(
        "CREATE TABLE IF NOT EXISTS {} ({});",
        table.qualified_name(),
        definitions.join(", ")
    )];

    for index in table.indexes() {
        statements.push(format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} USING {} ({});",
            quote_identifier(&index.name),
            table.qualified_name(),
            index.index_type,
            quote_identifier(&index.column_name)
        ));
    }

    debug!(table = %table.name, statements = statements.len(), "built create table query");
    Ok(statements)
}

fn column_definition(column: &Column) -> String {
    let mut sql = format!("{} {}", quote_identifier(&column.name), column.type_name());

    if column.identity {
        sql.push_str(" GENERATED ALWAYS AS IDENTITY");
    } else if !column.default.is_empty() && !column.has_null_default() {
        sql.push_str(" DEFAULT ");
        sql.push_str(&column.default);
    }
    if !column.nullable {
        sql.push_str(" NOT NULL");
    }
    if column.unique {
        sql.push_str(" UNIQUE");
    }
    if !column.check.is_empty() {
        sql.push_str(&format!(" CHECK ({})", column.check));
    }
    sql
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_type::DataType;
    use crate::index_type::IndexType;
    use crate::table::TableKind;

    fn customers() -> Table {
        let mut table = Table::new("public", "customers");
        table.add_columns([
            Column {
                name: "id".into(),
                data_type: Some(DataType::Uuid),
                primary_key: true,
                default: "gen_random_uuid()".into(),
                ..Column::default()
            },
            Column {
                name: "email".into(),
                data_type: Some(DataType::CharacterVarying),
                type_argument: "255".into(),
                unique_index: "customer_unique_idx".into(),
                ..Column::default()
            },
            Column {
                name: "cognito_user_id".into(),
                data_type: Some(DataType::Uuid),
                unique_index: "customer_unique_idx".into(),
                ..Column::default()
            },
            Column {
                name: "name".into(),
                data_type: Some(DataType::Text),
                nullable: true,
                default: "null".into(),
                index: Some(IndexType::Btree),
                ..Column::default()
            },
            Column {
                name: "age".into(),
                data_type: Some(DataType::SmallInt),
                check: "age > 0".into(),
                unique: true,
                ..Column::default()
            },
            Column {
                name: "total".into(),
                data_type: Some(DataType::BigInt),
                presenter: true,
                ..Column::default()
            },
        ]);
        table
    }

    #[test]
    fn test_create_table() {
        let statements = build_create_table_query(&customers()).unwrap();
        assert_eq!(statements.len(), 2);
        assert_eq!(
            statements[0],
            concat!(
                r#"CREATE TABLE IF NOT EXISTS "public"."customers" ("#,
                r#""id" uuid DEFAULT gen_random_uuid() NOT NULL, "#,
                r#""email" varchar(255) NOT NULL, "#,
                r#""cognito_user_id" uuid NOT NULL, "#,
                r#""name" text, "#,
                r#""age" smallint NOT NULL UNIQUE CHECK (age > 0), "#,
                r#"PRIMARY KEY ("id"), "#,
                r#"CONSTRAINT "customer_unique_idx" UNIQUE ("email", "cognito_user_id"));"#
            )
        );
        assert_eq!(
            statements[1],
            r#"CREATE INDEX IF NOT EXISTS "customers_name_idx" ON "public"."customers" USING btree ("name");"#
        );
    }

    #[test]
    fn test_identity_column() {
        let mut table = Table::new("public", "events");
        table.add_columns([Column {
            name: "id".into(),
            data_type: Some(DataType::BigInt),
            primary_key: true,
            identity: true,
            ..Column::default()
        }]);
        let statements = build_create_table_query(&table).unwrap();
        assert_eq!(
            statements[0],
            r#"CREATE TABLE IF NOT EXISTS "public"."events" ("id" bigint GENERATED ALWAYS AS IDENTITY NOT NULL, PRIMARY KEY ("id"));"#
        );
    }

    #[test]
    fn test_array_type_argument() {
        let column = Column {
            data_type: Some(DataType::CharacterVaryingArray),
            type_argument: "64".into(),
            ..Column::default()
        };
        assert_eq!(column.type_name(), "varchar(64)[]");
        assert_eq!(column.annotation(true), "type=varchar(64)[]");
    }

    #[test]
    fn test_read_only_table_rejected() {
        let mut table = customers();
        table.set_kind(TableKind::View);
        let err = build_create_table_query(&table).unwrap_err();
        assert!(matches!(err, QueryBuildError::ReadOnly { .. }));
    }
}

//! Catalog queries executed through a connection pool.

use oxide_pg_core::catalog::queries::{
    LIST_COLUMNS, LIST_CONSTRAINTS, LIST_TRIGGERS, LIST_UNIQUE_INDEXES,
};
use oxide_pg_core::catalog::{CatalogSource, ColumnRow, ConstraintRow, Trigger, UniqueIndexRow};
use sqlx::PgPool;
use tracing::debug;

type ColumnTuple = (
    String,
    Option<String>,
    String,
    String,
    i32,
    Option<String>,
    Option<String>,
    String,
    bool,
    bool,
    bool,
);

type ConstraintTuple = (String, String, String, String, String, String);

type TriggerTuple = (String, String, String, String, String, String, String, String);

/// [`CatalogSource`] backed by a [`PgPool`].
#[derive(Debug, Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    /// Creates a catalog source over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl CatalogSource for PgCatalog {
    type Error = sqlx::Error;

    async fn column_rows(
        &self,
        search_path: &str,
        tables: &[String],
    ) -> Result<Vec<ColumnRow>, sqlx::Error> {
        debug!(search_path, tables = tables.len(), "listing columns");
        let rows: Vec<ColumnTuple> = sqlx::query_as(LIST_COLUMNS)
            .bind(search_path.to_string())
            .bind(tables.to_vec())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(
                |(
                    table_name,
                    table_description,
                    table_type,
                    column_name,
                    ordinal_position,
                    column_description,
                    column_default,
                    data_type,
                    is_nullable,
                    is_identity,
                    is_generated,
                )| ColumnRow {
                    table_name,
                    table_description,
                    table_type,
                    column_name,
                    ordinal_position,
                    column_description,
                    column_default,
                    data_type,
                    is_nullable,
                    is_identity,
                    is_generated,
                },
            )
            .collect())
    }

    async fn constraint_rows(
        &self,
        search_path: &str,
        tables: &[String],
    ) -> Result<Vec<ConstraintRow>, sqlx::Error> {
        debug!(search_path, tables = tables.len(), "listing constraints");
        let rows: Vec<ConstraintTuple> = sqlx::query_as(LIST_CONSTRAINTS)
            .bind(search_path.to_string())
            .bind(tables.to_vec())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(
                |(
                    table_name,
                    column_name,
                    constraint_name,
                    constraint_type,
                    constraint_definition,
                    index_type,
                )| ConstraintRow {
                    table_name,
                    column_name,
                    constraint_name,
                    constraint_type,
                    constraint_definition,
                    index_type,
                },
            )
            .collect())
    }

    async fn unique_index_rows(
        &self,
        search_path: &str,
        tables: &[String],
    ) -> Result<Vec<UniqueIndexRow>, sqlx::Error> {
        let rows: Vec<(String, String, Vec<String>)> = sqlx::query_as(LIST_UNIQUE_INDEXES)
            .bind(search_path.to_string())
            .bind(tables.to_vec())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(table_name, index_name, columns)| UniqueIndexRow {
                table_name,
                index_name,
                columns,
            })
            .collect())
    }

    async fn trigger_rows(
        &self,
        search_path: &str,
        tables: &[String],
    ) -> Result<Vec<Trigger>, sqlx::Error> {
        let rows: Vec<TriggerTuple> = sqlx::query_as(LIST_TRIGGERS)
            .bind(search_path.to_string())
            .bind(tables.to_vec())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(
                |(
                    catalog,
                    search_path,
                    name,
                    manipulation,
                    table_name,
                    action_statement,
                    action_orientation,
                    action_timing,
                )| Trigger {
                    catalog,
                    search_path,
                    name,
                    manipulation,
                    table_name,
                    action_statement,
                    action_orientation,
                    action_timing,
                },
            )
            .collect())
    }
}

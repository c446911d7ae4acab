//! Executes built statements and decodes their rows.

use std::any::type_name;

use oxide_pg_core::builder::{
    build_delete_query, build_duplicate_query, build_exists_query, build_update_query, Statement,
};
use oxide_pg_core::catalog::Introspector;
use oxide_pg_core::{
    check_schema, Decoder, InsertQuery, Record, Schema, ScanPlan, SqlValue, Table,
};
use futures::TryStreamExt;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::{debug, info};

use crate::catalog::PgCatalog;
use crate::error::{PgError, Result};
use crate::value::{bind_value, column_names, row_values};

/// A connection pool paired with the registered table models.
#[derive(Debug)]
pub struct Database {
    pool: PgPool,
    schema: Schema,
}

impl Database {
    /// Wraps an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool, schema: Schema) -> Self {
        Self { pool, schema }
    }

    /// Connects to `url`.
    pub async fn connect(url: &str, schema: Schema) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(5).connect(url).await?;
        Ok(Self::new(pool, schema))
    }

    /// Returns the pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Returns the registry.
    #[must_use]
    pub const fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns a catalog source over the pool.
    #[must_use]
    pub fn catalog(&self) -> PgCatalog {
        PgCatalog::new(self.pool.clone())
    }

    /// Returns the table model of `R`.
    pub fn table<R: Record>(&self) -> Result<&Table> {
        self.schema.get::<R>().ok_or_else(|| PgError::NotRegistered {
            record: type_name::<R>().to_string(),
        })
    }

    /// Creates the schema, its tables and the `updated_at` triggers in one
    /// transaction.
    pub async fn create_schema(&self) -> Result<()> {
        let catalog = self.catalog();
        let introspector = Introspector::new(&catalog, self.schema.settings());
        let existing = introspector
            .list_triggers(&self.schema.table_names(&[]))
            .await?;
        let statements = self.schema.create_sql(&existing)?;

        let mut tx = self.pool.begin().await?;
        for sql in &statements {
            debug!(%sql, "executing");
            sqlx::query(sql).execute(&mut *tx).await?;
        }
        tx.commit().await?;

        info!(statements = statements.len(), "schema created");
        Ok(())
    }

    /// Compares the registered tables with the live catalog.
    pub async fn check_schema(&mut self) -> Result<()> {
        let catalog = self.catalog();
        check_schema(&mut self.schema, &catalog).await?;
        Ok(())
    }

    /// Executes a statement and returns the number of affected rows.
    pub async fn execute(&self, statement: Statement) -> Result<u64> {
        let (sql, args) = statement;
        debug!(%sql, args = args.len(), "executing");
        let query = args
            .into_iter()
            .fold(sqlx::query(&sql), bind_value);
        Ok(query.execute(&self.pool).await?.rows_affected())
    }

    /// Runs a statement and returns its rows.
    pub async fn fetch(&self, statement: Statement) -> Result<Vec<PgRow>> {
        let (sql, args) = statement;
        debug!(%sql, args = args.len(), "fetching");
        let query = args
            .into_iter()
            .fold(sqlx::query(&sql), bind_value);
        Ok(query.fetch_all(&self.pool).await?)
    }

    /// Runs a statement and decodes its rows into `R` as they arrive.
    ///
    /// The scan plan is built from the first row's columns.
    pub async fn query<R: Record>(&self, statement: Statement) -> Result<Vec<R>> {
        let table = self.table::<R>()?;
        let (sql, args) = statement;
        debug!(%sql, args = args.len(), "querying");
        let query = args
            .into_iter()
            .fold(sqlx::query(&sql), bind_value);

        let mut rows = query.fetch(&self.pool);
        let mut plan: Option<(ScanPlan<'_>, Vec<usize>)> = None;
        let mut records = Vec::new();
        while let Some(row) = rows.try_next().await? {
            if plan.is_none() {
                plan = Some(plan_for(table, &row)?);
            }
            if let Some((plan, skip)) = &plan {
                records.push(plan.decode(row_values(&row, skip)?)?);
            }
        }
        Ok(records)
    }

    /// Inserts `record` and returns the generated primary key, if the
    /// statement returned one.
    pub async fn insert<R: Record>(&self, record: &R) -> Result<Option<SqlValue>> {
        let table = self.table::<R>()?;
        let statement = InsertQuery::new(table).returning().build(record)?;
        self.returned_key(statement).await
    }

    /// Inserts `record`, updating the row it conflicts with.
    pub async fn upsert<R: Record>(&self, record: &R) -> Result<Option<SqlValue>> {
        let table = self.table::<R>()?;
        let statement = InsertQuery::new(table).upsert().returning().build(record)?;
        self.returned_key(statement).await
    }

    /// Updates the row of `record`; see [`build_update_query`].
    pub async fn update<R: Record>(&self, record: &R, only_columns: &[&str]) -> Result<u64> {
        let table = self.table::<R>()?;
        self.execute(build_update_query(table, record, only_columns)?)
            .await
    }

    /// Deletes the rows of `records` by primary key.
    pub async fn delete<R: Record>(&self, records: &[R]) -> Result<u64> {
        let table = self.table::<R>()?;
        self.execute(build_delete_query(table, records)?).await
    }

    /// True if a row matches every non-zero field of `sample`.
    pub async fn exists<R: Record>(&self, sample: &R) -> Result<bool> {
        let table = self.table::<R>()?;
        let (sql, args) = build_exists_query(table, sample)?;
        let rows = self.fetch((sql.clone(), args)).await?;
        let row = rows.first().ok_or(PgError::NoRows { sql })?;
        Ok(row.try_get::<bool, _>(0)?)
    }

    /// Copies the row with primary key `id` and returns the copy's key.
    pub async fn duplicate<R: Record>(&self, id: SqlValue) -> Result<SqlValue> {
        let table = self.table::<R>()?;
        let (sql, args) = build_duplicate_query(table, id, true)?;
        self.returned_key((sql.clone(), args))
            .await?
            .ok_or(PgError::NoRows { sql })
    }

    async fn returned_key(&self, statement: Statement) -> Result<Option<SqlValue>> {
        let rows = self.fetch(statement).await?;
        let Some(row) = rows.first() else {
            return Ok(None);
        };
        let values = row_values(row, &[])?;
        Ok(values.into_iter().next())
    }
}

/// Decodes driver rows into records of `table`.
pub fn scan_pg_rows<R: Record>(table: &Table, rows: &[PgRow]) -> Result<Vec<R>> {
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };
    let (plan, skip) = plan_for(table, first)?;

    rows.iter()
        .map(|row| -> Result<R> {
            let values = row_values(row, &skip)?;
            Ok(plan.decode(values)?)
        })
        .collect()
}

/// Plans the decoding of rows shaped like `row`, with the indexes of the
/// columns that are never read.
fn plan_for<'t>(table: &'t Table, row: &PgRow) -> Result<(ScanPlan<'t>, Vec<usize>)> {
    let names = column_names(row);
    let plan = ScanPlan::new(table, names.as_slice())?;
    let skip = plan
        .targets()
        .iter()
        .enumerate()
        .filter(|(_, target)| target.decoder == Decoder::Skip)
        .map(|(index, _)| index)
        .collect();
    Ok((plan, skip))
}

//! Live catalog introspection.
//!
//! The [`Introspector`] turns the rows returned by a [`CatalogSource`] into
//! [`crate::Table`] models. The source only runs the queries in [`queries`];
//! merging and constraint decoding happen here.

pub mod constraint;
mod introspect;
pub mod queries;

use std::future::Future;

pub use constraint::{Constraint, ConstraintKind, ConstraintPayload, ForeignKeyConstraint};
pub use introspect::{assemble_columns, assemble_tables, Introspector};

/// A row of [`queries::LIST_COLUMNS`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnRow {
    /// Table name.
    pub table_name: String,
    /// Table comment.
    pub table_description: Option<String>,
    /// `information_schema.tables.table_type`.
    pub table_type: String,
    /// Column name.
    pub column_name: String,
    /// Position, starting at 1.
    pub ordinal_position: i32,
    /// Column comment.
    pub column_description: Option<String>,
    /// Default expression.
    pub column_default: Option<String>,
    /// `format_type` output, e.g. `character varying(255)`.
    pub data_type: String,
    /// NULL allowed.
    pub is_nullable: bool,
    /// Identity column.
    pub is_identity: bool,
    /// Generated column.
    pub is_generated: bool,
}

/// A row of [`queries::LIST_CONSTRAINTS`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintRow {
    /// Table name.
    pub table_name: String,
    /// Column name; empty for index rows.
    pub column_name: String,
    /// Constraint or index name.
    pub constraint_name: String,
    /// `p`, `u`, `c`, `f` or `i`.
    pub constraint_type: String,
    /// Definition text.
    pub constraint_definition: String,
    /// Access method of the backing index; may be empty.
    pub index_type: String,
}

/// A row of [`queries::LIST_UNIQUE_INDEXES`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniqueIndexRow {
    /// Table name.
    pub table_name: String,
    /// Index name.
    pub index_name: String,
    /// Indexed columns by position.
    pub columns: Vec<String>,
}

/// A trigger as listed by [`queries::LIST_TRIGGERS`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trigger {
    /// Database name.
    pub catalog: String,
    /// Schema of the table.
    pub search_path: String,
    /// Trigger name.
    pub name: String,
    /// INSERT, UPDATE or DELETE.
    pub manipulation: String,
    /// Table the trigger is on.
    pub table_name: String,
    /// Statement run by the trigger.
    pub action_statement: String,
    /// ROW or STATEMENT.
    pub action_orientation: String,
    /// BEFORE or AFTER.
    pub action_timing: String,
}

/// Something that can run the catalog queries.
///
/// `tables` narrows every query to the named tables; an empty slice means the
/// whole schema.
pub trait CatalogSource {
    /// Failure of the underlying connection.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Runs [`queries::LIST_COLUMNS`].
    fn column_rows(
        &self,
        search_path: &str,
        tables: &[String],
    ) -> impl Future<Output = Result<Vec<ColumnRow>, Self::Error>> + Send;

    /// Runs [`queries::LIST_CONSTRAINTS`].
    fn constraint_rows(
        &self,
        search_path: &str,
        tables: &[String],
    ) -> impl Future<Output = Result<Vec<ConstraintRow>, Self::Error>> + Send;

    /// Runs [`queries::LIST_UNIQUE_INDEXES`].
    fn unique_index_rows(
        &self,
        search_path: &str,
        tables: &[String],
    ) -> impl Future<Output = Result<Vec<UniqueIndexRow>, Self::Error>> + Send;

    /// Runs [`queries::LIST_TRIGGERS`].
    fn trigger_rows(
        &self,
        search_path: &str,
        tables: &[String],
    ) -> impl Future<Output = Result<Vec<Trigger>, Self::Error>> + Send;
}

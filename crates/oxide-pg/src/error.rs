//! Error types for the PostgreSQL adapter.

use thiserror::Error;

/// Adapter errors.
#[derive(Debug, Error)]
pub enum PgError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Error raised by the table model.
    #[error(transparent)]
    Core(#[from] oxide_pg_core::Error),

    /// The record type was never registered.
    #[error("record type {record} is not registered")]
    NotRegistered {
        /// Record type name.
        record: String,
    },

    /// A statement returning rows returned none.
    #[error("no rows returned by: {sql}")]
    NoRows {
        /// Executed statement.
        sql: String,
    },

    /// Settings file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<oxide_pg_core::QueryBuildError> for PgError {
    fn from(err: oxide_pg_core::QueryBuildError) -> Self {
        Self::Core(err.into())
    }
}

impl From<oxide_pg_core::ScanError> for PgError {
    fn from(err: oxide_pg_core::ScanError) -> Self {
        Self::Core(err.into())
    }
}

impl From<oxide_pg_core::ReconcileError> for PgError {
    fn from(err: oxide_pg_core::ReconcileError) -> Self {
        Self::Core(err.into())
    }
}

impl From<oxide_pg_core::AnnotationError> for PgError {
    fn from(err: oxide_pg_core::AnnotationError) -> Self {
        Self::Core(err.into())
    }
}

/// Result type alias for adapter operations.
pub type Result<T> = std::result::Result<T, PgError>;

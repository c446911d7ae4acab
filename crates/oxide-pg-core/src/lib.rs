//! # oxide-pg-core
//!
//! Annotation-driven PostgreSQL table models.
//!
//! This crate provides:
//! - A small annotation grammar (`name=id,type=uuid,primary`) parsed into
//!   [`Table`] and [`Column`] models
//! - Deterministic SQL builders for DDL and DML with positional arguments
//! - Catalog introspection and constraint-definition parsing behind the
//!   [`catalog::CatalogSource`] trait
//! - Drift detection between declared and live tables
//! - A row scanner with per-column decoding strategies
//!
//! The crate performs no I/O. Record types describe themselves through the
//! [`Record`] trait, usually derived with `oxide-pg-derive`.
//!
//! ## Registering records
//!
//! ```rust,ignore
//! use oxide_pg_core::{Schema, Settings};
//!
//! #[derive(Debug, Default, Record)]
//! #[table(name = "customers")]
//! struct Customer {
//!     #[pg("type=uuid,primary")]
//!     id: Uuid,
//!     #[pg("type=varchar(255),unique")]
//!     email: String,
//! }
//!
//! let mut schema = Schema::new(Settings::default());
//! schema.register::<Customer>()?;
//! for statement in schema.create_sql(&[])? {
//!     println!("{statement}");
//! }
//! ```

pub mod builder;
pub mod catalog;
pub mod data_type;
pub mod error;
pub mod index_type;
pub mod naming;
pub mod record;
pub mod reconcile;
pub mod scanner;
pub mod schema;
pub mod settings;
pub mod table;
pub mod value;

#[cfg(test)]
mod testing;

pub use builder::{InsertQuery, Statement};
pub use data_type::DataType;
pub use error::{
    AnnotationError, BoxError, Error, QueryBuildError, ReconcileError, Result, ScanError,
};
pub use index_type::IndexType;
pub use record::{FieldDescriptor, FieldKind, Record, RecordDescriptor};
pub use reconcile::{check_schema, reconcile_table};
pub use scanner::{scan_rows, Decoder, ScanPlan};
pub use schema::Schema;
pub use settings::{ColumnNaming, Settings};
pub use table::{
    Column, ForeignKeyAction, Index, PasswordHandler, Reference, Table, TableKind, UniqueIndex,
};
pub use value::{HostType, Json, SqlField, SqlValue};

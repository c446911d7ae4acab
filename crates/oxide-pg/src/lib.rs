//! # oxide-pg
//!
//! PostgreSQL collaborator for `oxide-pg-core`, built on sqlx.
//!
//! This crate provides:
//! - [`PgCatalog`], running the catalog queries for the introspector
//! - [`Database`], executing built statements and scanning rows into records
//! - [`ChangeNotifier`], installing change notification triggers once
//!
//! ```rust,ignore
//! use oxide_pg::{Database, Schema, Settings};
//!
//! let mut schema = Schema::new(Settings::default());
//! schema.register::<Customer>()?;
//!
//! let mut db = Database::connect("postgres://localhost/app", schema).await?;
//! db.create_schema().await?;
//! db.check_schema().await?;
//!
//! let id = db.insert(&customer).await?;
//! ```

pub mod catalog;
pub mod config;
pub mod database;
pub mod error;
pub mod notifier;
mod value;

pub use catalog::PgCatalog;
pub use config::load_settings;
pub use database::{scan_pg_rows, Database};
pub use error::{PgError, Result};
pub use notifier::{ChangeNotifier, TableChange};

pub use oxide_pg_core::{Record, Schema, Settings, SqlField, SqlValue, Table, TableKind};
pub use oxide_pg_derive::Record;

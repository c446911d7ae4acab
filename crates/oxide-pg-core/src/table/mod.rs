//! Table model.
//!
//! A [`Table`] is built once per record type from its field annotations
//! (see [`Table::from_record`]) or assembled from the live catalog by the
//! introspector. Columns are kept in declaration (or ordinal) order.

pub mod annotation;
mod builder;
pub mod column;

use std::fmt;
use std::sync::Arc;

pub use column::{Column, ForeignKeyAction, Reference};

use crate::data_type::DataType;
use crate::error::BoxError;

/// Kind of relation a table model describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TableKind {
    /// A regular table.
    #[default]
    Base,
    /// A view.
    View,
    /// A materialized view.
    MaterializedView,
    /// A row shape backed by an arbitrary SELECT, used only for decoding.
    Presenter,
}

impl TableKind {
    /// True for every kind except [`TableKind::Base`]. DDL skips read-only tables.
    #[must_use]
    pub const fn is_read_only(self) -> bool {
        !matches!(self, Self::Base)
    }

    /// Parses the `table_type` reported by `information_schema.tables`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BASE TABLE" => Some(Self::Base),
            "VIEW" => Some(Self::View),
            "MATERIALIZED VIEW" => Some(Self::MaterializedView),
            _ => None,
        }
    }

    /// Returns the catalog spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Base => "BASE TABLE",
            Self::View => "VIEW",
            Self::MaterializedView => "MATERIALIZED VIEW",
            Self::Presenter => "PRESENTER",
        }
    }
}

/// Credential hook signature: `(table_name, input) -> output`.
pub type CredentialFn = Arc<dyn Fn(&str, &str) -> Result<String, BoxError> + Send + Sync>;

/// Programmatic encryption and decryption of password columns.
///
/// Without an encrypt hook, INSERT and UPDATE hash passwords in SQL with
/// `crypt($n, gen_salt(..))`. A decrypt hook that returns an empty string
/// leaves the field untouched, which lets verify-only hooks hide plaintext.
#[derive(Clone, Default)]
pub struct PasswordHandler {
    encrypt: Option<CredentialFn>,
    decrypt: Option<CredentialFn>,
}

impl PasswordHandler {
    /// Creates a handler with no hooks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the encrypt hook.
    #[must_use]
    pub fn with_encrypt<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &str) -> Result<String, BoxError> + Send + Sync + 'static,
    {
        self.encrypt = Some(Arc::new(f));
        self
    }

    /// Sets the decrypt hook.
    #[must_use]
    pub fn with_decrypt<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &str) -> Result<String, BoxError> + Send + Sync + 'static,
    {
        self.decrypt = Some(Arc::new(f));
        self
    }

    /// True when an encrypt hook is set.
    #[must_use]
    pub const fn can_encrypt(&self) -> bool {
        self.encrypt.is_some()
    }

    /// True when a decrypt hook is set.
    #[must_use]
    pub const fn can_decrypt(&self) -> bool {
        self.decrypt.is_some()
    }

    /// Runs the encrypt hook; returns the input unchanged without one.
    pub fn encrypt(&self, table: &str, plain: &str) -> Result<String, BoxError> {
        match &self.encrypt {
            Some(f) => f(table, plain),
            None => Ok(plain.to_string()),
        }
    }

    /// Runs the decrypt hook; returns the input unchanged without one.
    pub fn decrypt(&self, table: &str, encrypted: &str) -> Result<String, BoxError> {
        match &self.decrypt {
            Some(f) => f(table, encrypted),
            None => Ok(encrypted.to_string()),
        }
    }
}

impl fmt::Debug for PasswordHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordHandler")
            .field("encrypt", &self.can_encrypt())
            .field("decrypt", &self.can_decrypt())
            .finish()
    }
}

/// A named group of columns that are unique together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueIndex {
    /// Owning table.
    pub table_name: String,
    /// Index name.
    pub name: String,
    /// Columns in declared order.
    pub columns: Vec<String>,
}

/// A single-column index created next to the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    /// Owning table.
    pub table_name: String,
    /// Index name.
    pub name: String,
    /// Indexed column.
    pub column_name: String,
    /// Access method.
    pub index_type: crate::index_type::IndexType,
}

/// A relational table, view or presenter.
#[derive(Debug, Clone, Default)]
pub struct Table {
    /// Registration order, starting at 1; 0 for introspected tables.
    pub position: usize,
    /// Relation kind.
    pub kind: TableKind,
    /// Name of the record type the table was built from.
    pub record_type: Option<&'static str>,
    /// Schema the table lives in.
    pub search_path: String,
    /// Table name.
    pub name: String,
    /// Table description.
    pub description: String,
    /// Unknown result and catalog columns are errors when set.
    pub strict: bool,
    /// Columns in order.
    pub columns: Vec<Column>,
    /// Optional password hooks.
    pub password_handler: Option<PasswordHandler>,
    /// Algorithm passed to `gen_salt` when hashing passwords in SQL.
    pub crypt_algorithm: String,
}

impl Table {
    /// Creates an empty table model.
    #[must_use]
    pub fn new(search_path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            search_path: search_path.into(),
            name: name.into(),
            crypt_algorithm: "bf".to_string(),
            ..Self::default()
        }
    }

    /// True for views, materialized views and presenters.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.kind.is_read_only()
    }

    /// Returns `"schema"."table"`.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!(
            "{}.{}",
            crate::builder::quote_identifier(&self.search_path),
            crate::builder::quote_identifier(&self.name)
        )
    }

    /// Name of the record type: the registered type, or the PascalCase table
    /// name for introspected tables.
    #[must_use]
    pub fn record_name(&self) -> String {
        self.record_type
            .map_or_else(|| crate::naming::pascal_case(&self.name), str::to_string)
    }

    /// Sets the strict flag.
    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    /// Changes the kind and propagates it to the columns.
    pub fn set_kind(&mut self, kind: TableKind) {
        self.kind = kind;
        for column in &mut self.columns {
            column.table_kind = kind;
        }
    }

    /// Appends columns, stamping them with this table's name and kind.
    pub fn add_columns(&mut self, columns: impl IntoIterator<Item = Column>) {
        for mut column in columns {
            column.table_name.clone_from(&self.name);
            column.table_kind = self.kind;
            self.columns.push(column);
        }
    }

    /// Removes columns by name (case-insensitive).
    pub fn remove_columns(&mut self, names: &[&str]) {
        self.columns
            .retain(|c| !names.iter().any(|n| n.eq_ignore_ascii_case(&c.name)));
    }

    /// Keeps only the columns accepted by `keep`.
    pub fn filter_columns(&mut self, keep: impl FnMut(&Column) -> bool) {
        self.columns.retain(keep);
    }

    /// Column names in order.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Column names in order, without those listed in `except`.
    #[must_use]
    pub fn column_names_except(&self, except: &[&str]) -> Vec<&str> {
        self.columns
            .iter()
            .map(|c| c.name.as_str())
            .filter(|name| !except.iter().any(|e| e.eq_ignore_ascii_case(name)))
            .collect()
    }

    /// Finds a column by name (case-insensitive).
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Finds a column by name for modification (case-insensitive).
    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// True if a column with that name exists.
    #[must_use]
    pub fn column_exists(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// True if any column has the given data type.
    #[must_use]
    pub fn has_column_type(&self, data_type: DataType) -> bool {
        self.columns.iter().any(|c| c.data_type == Some(data_type))
    }

    /// The primary key column.
    #[must_use]
    pub fn primary_key(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.primary_key)
    }

    /// The credential username column.
    #[must_use]
    pub fn username_column(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.username)
    }

    /// The credential secret column.
    #[must_use]
    pub fn password_column(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.password)
    }

    /// The column declaring an explicit ON CONFLICT action.
    #[must_use]
    pub fn conflict_column(&self) -> Option<&Column> {
        self.columns.iter().find(|c| !c.conflict.is_empty())
    }

    /// Columns with a foreign key.
    #[must_use]
    pub fn foreign_key_columns(&self) -> Vec<&Column> {
        self.columns.iter().filter(|c| c.reference.is_some()).collect()
    }

    /// Names of the columns with a foreign key.
    #[must_use]
    pub fn foreign_key_column_names(&self) -> Vec<&str> {
        self.foreign_key_columns()
            .into_iter()
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Named unique groups in order of first appearance, columns in declared order.
    #[must_use]
    pub fn unique_indexes(&self) -> Vec<UniqueIndex> {
        let mut groups: Vec<UniqueIndex> = Vec::new();
        for column in self.columns.iter().filter(|c| !c.unique_index.is_empty()) {
            if let Some(group) = groups.iter_mut().find(|g| g.name == column.unique_index) {
                group.columns.push(column.name.clone());
            } else {
                groups.push(UniqueIndex {
                    table_name: self.name.clone(),
                    name: column.unique_index.clone(),
                    columns: vec![column.name.clone()],
                });
            }
        }
        groups
    }

    /// Single-column indexes.
    ///
    /// Names follow `{table}_{column}_fkey` for foreign keys, `{table}_pkey` for
    /// the primary key and `{table}_{column}_idx` otherwise.
    #[must_use]
    pub fn indexes(&self) -> Vec<Index> {
        self.columns
            .iter()
            .filter_map(|c| {
                let index_type = c.index?;
                let name = if c.reference.is_some() {
                    format!("{}_{}_fkey", self.name, c.name)
                } else if c.primary_key {
                    format!("{}_pkey", self.name)
                } else {
                    format!("{}_{}_idx", self.name, c.name)
                };
                Some(Index {
                    table_name: self.name.clone(),
                    name,
                    column_name: c.name.clone(),
                    index_type,
                })
            })
            .collect()
    }
}

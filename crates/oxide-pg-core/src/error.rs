//! Error types for table modelling, SQL generation, reconciliation and scanning.

use crate::value::HostType;

/// Boxed error returned by external collaborators (catalog sources, credential hooks).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while turning field annotations into a table model.
///
/// These are always fatal to registration.
#[derive(Debug, thiserror::Error)]
pub enum AnnotationError {
    /// An option could not be split into a key and a value.
    #[error("field '{field}': invalid option '{option}'")]
    InvalidOption {
        /// Field the annotation belongs to.
        field: String,
        /// The raw option text.
        option: String,
    },

    /// An unrecognized `key=value` option.
    #[error("field '{field}': unknown option '{key}'")]
    UnknownOption {
        /// Field the annotation belongs to.
        field: String,
        /// The unrecognized key.
        key: String,
    },

    /// A boolean option carried a value that is not a boolean.
    #[error("field '{field}': option '{key}' expects a boolean, got '{value}'")]
    InvalidBool {
        /// Field the annotation belongs to.
        field: String,
        /// Option key.
        key: String,
        /// Offending value.
        value: String,
    },

    /// The data type is missing or not a known PostgreSQL type.
    #[error("field '{field}': invalid data type '{value}'")]
    InvalidDataType {
        /// Field the annotation belongs to.
        field: String,
        /// Offending type name.
        value: String,
    },

    /// A type argument was opened but never closed, e.g. `varchar(255`.
    #[error("field '{field}': missing right parenthesis in type '{value}'")]
    MissingRightParen {
        /// Field the annotation belongs to.
        field: String,
        /// The raw type text.
        value: String,
    },

    /// The `ref` option could not be parsed.
    #[error("field '{field}': invalid reference '{value}': {reason}")]
    InvalidReference {
        /// Field the annotation belongs to.
        field: String,
        /// The raw reference text.
        value: String,
        /// What was wrong with it.
        reason: &'static str,
    },

    /// The `index` option names an unknown index method.
    #[error("field '{field}': invalid index type '{value}'")]
    InvalidIndexType {
        /// Field the annotation belongs to.
        field: String,
        /// Offending index method.
        value: String,
    },

    /// A column declares both `unique` and `unique_index`.
    #[error("field '{field}': unique and unique_index are mutually exclusive")]
    UniqueConflict {
        /// Field the annotation belongs to.
        field: String,
    },

    /// More than one column of a table declares a `conflict` action.
    #[error("table '{table}': conflict action declared on both '{first}' and '{second}'")]
    DuplicateConflict {
        /// Table name.
        table: String,
        /// First column declaring a conflict action.
        first: String,
        /// Second column declaring a conflict action.
        second: String,
    },

    /// No field carried a usable annotation.
    #[error("table '{table}': no columns found")]
    NoColumns {
        /// Table name.
        table: String,
    },

    /// The record type or table name was registered twice.
    #[error("table '{table}' is already registered")]
    AlreadyRegistered {
        /// Table name.
        table: String,
    },
}

/// Errors raised while building a single SQL statement.
#[derive(Debug, thiserror::Error)]
pub enum QueryBuildError {
    /// The statement needs a primary key and the table has none.
    #[error("table '{table}' has no primary key")]
    NoPrimaryKey {
        /// Table name.
        table: String,
    },

    /// The primary key field of the supplied record holds its zero value.
    #[error("table '{table}': primary key value is missing")]
    MissingPrimaryKeyValue {
        /// Table name.
        table: String,
    },

    /// No field produced an argument; usually a missing or mistyped annotation.
    #[error("table '{table}': no arguments found, check the field annotations")]
    NoArguments {
        /// Table name.
        table: String,
    },

    /// Nothing left to insert after filtering.
    #[error("table '{table}': no columns to insert")]
    NoColumns {
        /// Table name.
        table: String,
    },

    /// A forced conflict target matched neither a unique index nor a unique column.
    #[error("table '{table}': can't find unique index with name: {name}")]
    UnresolvedConflictTarget {
        /// Table name.
        table: String,
        /// Requested conflict target.
        name: String,
    },

    /// A column named by the caller does not exist.
    #[error("table '{table}': unknown column '{column}'")]
    UnknownColumn {
        /// Table name.
        table: String,
        /// Requested column.
        column: String,
    },

    /// DDL or DML was requested for a view, materialized view or presenter.
    #[error("table '{table}' is read-only")]
    ReadOnly {
        /// Table name.
        table: String,
    },

    /// The credential hook failed to encrypt a password value.
    #[error("table '{table}': password encryption failed: {source}")]
    Credential {
        /// Table name.
        table: String,
        /// Hook error.
        #[source]
        source: BoxError,
    },
}

/// Errors raised when the code model and the live catalog disagree.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// A registered table is missing from the database.
    #[error("table \"{table}\" not found in schema")]
    TableNotFound {
        /// Table name.
        table: String,
    },

    /// A declared column is missing from the live table.
    #[error("column \"{column}\" in table \"{table}\" not found in schema")]
    ColumnNotFound {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// A strict table has a live column without a declared counterpart.
    #[error("column \"{column}\" in table \"{table}\" is not declared (strict check)")]
    UndeclaredColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// Rendered tags differ.
    #[error("column \"{column}\" in table \"{table}\" has wrong field tag: db:\n{live}\nvs code:\n{code}")]
    TagMismatch {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// Rendering of the live column.
        live: String,
        /// Rendering of the declared column.
        code: String,
    },
}

/// Errors raised while decoding a result row into a record.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// A strict table received a column it has no field for.
    #[error("record doesn't have corresponding field for column: {column} (strict check)")]
    UnmappedColumn {
        /// Result column name.
        column: String,
    },

    /// A value could not be converted to the destination field type.
    #[error("cannot decode {found} into {expected:?}")]
    Decode {
        /// Destination host type.
        expected: HostType,
        /// Kind of the source value.
        found: &'static str,
    },

    /// The database type has no decoder.
    #[error("column {column}: unsupported decode type '{type_name}'")]
    UnsupportedType {
        /// Result column name.
        column: String,
        /// Database type name.
        type_name: String,
    },

    /// A field path does not point at a field of the record.
    #[error("no field at path {path:?}")]
    UnknownField {
        /// The offending path.
        path: Vec<usize>,
    },

    /// The row holds a different number of values than the scan plan expects.
    #[error("row has {found} values, expected {expected}")]
    ColumnCount {
        /// Planned column count.
        expected: usize,
        /// Actual value count.
        found: usize,
    },

    /// The credential hook failed to decrypt a password value.
    #[error("table '{table}': password decryption failed: {source}")]
    Credential {
        /// Table name.
        table: String,
        /// Hook error.
        #[source]
        source: BoxError,
    },

    /// Decoding failed for a named column.
    #[error("column {column}: {source}")]
    Column {
        /// Result column name.
        column: String,
        /// Underlying failure.
        #[source]
        source: Box<ScanError>,
    },
}

/// Any error produced by this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Annotation parsing or registration failure.
    #[error(transparent)]
    Annotation(#[from] AnnotationError),

    /// Statement construction failure.
    #[error(transparent)]
    Query(#[from] QueryBuildError),

    /// Code model and catalog disagree.
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    /// Row decoding failure.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// The catalog collaborator failed.
    #[error("catalog query failed: {0}")]
    Catalog(#[source] BoxError),

    /// Settings could not be (de)serialized.
    #[error("invalid settings: {0}")]
    Settings(#[from] serde_json::Error),
}

/// Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

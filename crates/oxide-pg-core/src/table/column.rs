//! Column model and its canonical annotation rendering.

use std::fmt;

use crate::data_type::DataType;
use crate::index_type::IndexType;
use crate::table::TableKind;
use crate::value::HostType;

/// Foreign key referential action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ForeignKeyAction {
    /// NO ACTION.
    NoAction,
    /// CASCADE, the default for annotations.
    #[default]
    Cascade,
    /// RESTRICT.
    Restrict,
    /// SET NULL.
    SetNull,
    /// SET DEFAULT.
    SetDefault,
}

impl ForeignKeyAction {
    /// Returns the SQL representation.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Cascade => "CASCADE",
            Self::Restrict => "RESTRICT",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }

    /// Parses an action, case-insensitively and ignoring extra whitespace.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.split_whitespace().collect::<Vec<_>>().join(" ");
        [
            Self::NoAction,
            Self::Cascade,
            Self::Restrict,
            Self::SetNull,
            Self::SetDefault,
        ]
        .into_iter()
        .find(|action| action.as_sql().eq_ignore_ascii_case(&s))
    }
}

impl fmt::Display for ForeignKeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Target of a foreign key column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Referenced table.
    pub table: String,
    /// Referenced column.
    pub column: String,
    /// ON DELETE action.
    pub on_delete: ForeignKeyAction,
    /// Whether the constraint is DEFERRABLE.
    pub deferrable: bool,
}

/// One field to column binding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Column {
    /// Owning table name.
    pub table_name: String,
    /// Owning table description; set on introspected columns.
    pub table_description: String,
    /// Owning table kind.
    pub table_kind: TableKind,

    /// Column name.
    pub name: String,
    /// Record field name; empty for introspected columns.
    pub field_name: String,
    /// Path of the bound field in the record descriptor; empty for introspected columns.
    pub field_path: Vec<usize>,
    /// Host representation of the bound field.
    pub host: Option<HostType>,
    /// Whether the bound field is an `Option<T>`.
    pub optional: bool,
    /// Ordinal position in the live table, starting at 1.
    pub ordinal_position: i32,
    /// Column description.
    pub description: String,

    /// Column data type; `None` until resolved.
    pub data_type: Option<DataType>,
    /// Type argument, e.g. the length of a varchar.
    pub type_argument: String,
    /// PRIMARY KEY.
    pub primary_key: bool,
    /// GENERATED ALWAYS AS IDENTITY.
    pub identity: bool,
    /// Default expression.
    pub default: String,
    /// CHECK expression.
    pub check: String,
    /// Single-column UNIQUE.
    pub unique: bool,
    /// Name of the multi-column unique index this column belongs to.
    pub unique_index: String,
    /// Explicit ON CONFLICT action text.
    pub conflict: String,
    /// Marks the credential username column.
    pub username: bool,
    /// Marks the credential secret column.
    pub password: bool,
    /// NULL allowed.
    pub nullable: bool,
    /// Foreign key target.
    pub reference: Option<Reference>,
    /// Index method, if the column is indexed.
    pub index: Option<IndexType>,
    /// Only used for decoding; never part of DDL or DML.
    pub presenter: bool,
    /// Generated by the database; omitted from INSERT.
    pub auto_generated: bool,
    /// Never decoded from result rows.
    pub unscannable: bool,
    /// The bound field has its own value conversion.
    pub scanner: bool,
}

const NULL_LITERAL: &str = "null";
const GENERATED_TIMESTAMPS: &[&str] = &["clock_timestamp()", "now()", "current_timestamp"];
const GENERATED_UUIDS: &[&str] = &["gen_random_uuid()", "uuid_generate_v4()"];

impl Column {
    /// True when the default expression is the `null` literal.
    #[must_use]
    pub fn has_null_default(&self) -> bool {
        self.default.eq_ignore_ascii_case(NULL_LITERAL)
    }

    /// A time column defaulting to the current time.
    #[must_use]
    pub fn is_generated_timestamp(&self) -> bool {
        self.data_type.is_some_and(DataType::is_time)
            && GENERATED_TIMESTAMPS
                .iter()
                .any(|d| d.eq_ignore_ascii_case(&self.default))
    }

    /// A UUID primary key defaulting to a random UUID.
    #[must_use]
    pub fn is_generated_primary_uuid(&self) -> bool {
        self.primary_key
            && self.data_type == Some(DataType::Uuid)
            && GENERATED_UUIDS
                .iter()
                .any(|d| d.eq_ignore_ascii_case(&self.default))
    }

    /// The database fills this column when it is left out.
    #[must_use]
    pub fn is_generated(&self) -> bool {
        self.is_generated_timestamp() || self.is_generated_primary_uuid()
    }

    /// The column references `table`'s own primary key column.
    #[must_use]
    pub fn references(&self, table: &str, column: &str) -> bool {
        self.reference
            .as_ref()
            .is_some_and(|r| r.table == table && r.column == column)
    }

    /// Renders the canonical annotation, e.g. `name=id,type=uuid,primary,default=gen_random_uuid()`.
    ///
    /// The non-strict form is the one compared against the live catalog. It
    /// leaves out the type argument, the conflict action and the flags the
    /// catalog cannot report, and strips type casts from defaults.
    #[must_use]
    pub fn annotation(&self, strict: bool) -> String {
        let mut out = String::new();
        prop(&mut out, "name", &self.name);
        if let Some(data_type) = self.data_type {
            if strict {
                prop(&mut out, "type", &self.type_name());
            } else {
                prop(&mut out, "type", data_type.name());
            }
        }

        if self.table_kind.is_read_only() {
            return out;
        }

        flag(&mut out, "primary", self.primary_key);
        flag(&mut out, "identity", self.identity);
        flag(&mut out, "nullable", self.nullable);
        if !self.has_null_default() {
            if strict {
                prop(&mut out, "default", &self.default);
            } else {
                prop(&mut out, "default", &self.default_without_cast());
            }
        }
        flag(&mut out, "unique", self.unique);
        if strict {
            prop(&mut out, "conflict", &self.conflict);
            flag(&mut out, "username", self.username);
            flag(&mut out, "password", self.password);
        }
        if let Some(reference) = &self.reference {
            let mut value = format!(
                "{}({} {}",
                reference.table, reference.column, reference.on_delete
            );
            if reference.deferrable {
                value.push_str(" deferrable");
            }
            value.push(')');
            prop(&mut out, "ref", &value);
        }
        if let Some(index) = self.index {
            prop(&mut out, "index", index.as_str());
        }
        prop(&mut out, "unique_index", &self.unique_index);
        prop(&mut out, "check", &self.check);
        if strict {
            flag(&mut out, "auto", self.auto_generated);
            flag(&mut out, "presenter", self.presenter);
            flag(&mut out, "unscannable", self.unscannable);
        }
        out
    }

    /// SQL type with its argument, e.g. `varchar(64)` or `varchar(64)[]`.
    ///
    /// Empty when the data type is unknown.
    #[must_use]
    pub fn type_name(&self) -> String {
        let Some(data_type) = self.data_type else {
            return String::new();
        };
        let name = data_type.name();
        if self.type_argument.is_empty() {
            return name.to_string();
        }
        match name.find('[') {
            Some(at) => format!("{}({}){}", &name[..at], self.type_argument, &name[at..]),
            None => format!("{name}({})", self.type_argument),
        }
    }

    /// Renders the annotation wrapped in its key, e.g. `pg:"name=id,type=uuid"`.
    #[must_use]
    pub fn field_tag(&self, tag_key: &str, strict: bool) -> String {
        format!("{tag_key}:\"{}\"", self.annotation(strict))
    }

    fn default_without_cast(&self) -> String {
        let Some(data_type) = self.data_type else {
            return self.default.clone();
        };
        let lower = self.default.to_ascii_lowercase();
        for alias in data_type.aliases() {
            let cast = format!("::{alias}");
            if lower.ends_with(&cast) {
                return self.default[..self.default.len() - cast.len()].to_string();
            }
        }
        self.default.clone()
    }
}

fn prop(out: &mut String, key: &str, value: &str) {
    if value.is_empty() {
        return;
    }
    if !out.is_empty() {
        out.push(',');
    }
    out.push_str(key);
    out.push('=');
    out.push_str(value);
}

fn flag(out: &mut String, key: &str, set: bool) {
    if !set {
        return;
    }
    if !out.is_empty() {
        out.push(',');
    }
    out.push_str(key);
}

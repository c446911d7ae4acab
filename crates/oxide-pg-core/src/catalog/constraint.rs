//! Decoders for the constraint and index definitions printed by the catalog.
//!
//! The text comes from `pg_get_constraintdef` and `pg_indexes.indexdef`.
//! Text in an unexpected shape decodes to `None`; the caller keeps the rest
//! of the row.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::ConstraintRow;
use crate::index_type::IndexType;
use crate::table::{Column, ForeignKeyAction};

static FOREIGN_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)^FOREIGN KEY\s*\(\s*"?(\w+)"?\s*\)\s*REFERENCES\s+(?:"?\w+"?\.)?"?(\w+)"?\s*\(\s*"?(\w+)"?\s*\)(.*)$"#,
    )
    .expect("foreign key pattern is valid")
});

static ON_DELETE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)ON\s+DELETE\s+(CASCADE|RESTRICT|NO\s+ACTION|SET\s+NULL|SET\s+DEFAULT)")
        .expect("on delete pattern is valid")
});

static ON_UPDATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)ON\s+UPDATE\s+(CASCADE|RESTRICT|NO\s+ACTION|SET\s+NULL|SET\s+DEFAULT)")
        .expect("on update pattern is valid")
});

static DEFERRABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(NOT\s+)?\bDEFERRABLE\b").expect("deferrable pattern is valid")
});

static CHECK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s*CHECK\s*\((.*)\)\s*(?:NOT\s+VALID\s*)?$").expect("check pattern is valid")
});

static UNIQUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^UNIQUE\s*(?:NULLS\s+(?:NOT\s+)?DISTINCT\s*)?\((.*)\)")
        .expect("unique pattern is valid")
});

static SIMPLE_INDEX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)^CREATE INDEX\s+"?(\w+)"?\s+ON\s+(?:ONLY\s+)?(?:"?\w+"?\.)?"?(\w+)"?\s+USING\s+(\w+)\s*\(\s*"?(\w+)"?\s*\)"#,
    )
    .expect("index pattern is valid")
});

/// Constraint discriminator as reported by `pg_constraint.contype`, plus the
/// synthetic `i` used for plain indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// `p`
    PrimaryKey,
    /// `u`
    Unique,
    /// `c`
    Check,
    /// `f`
    ForeignKey,
    /// `i`, a non-unique index.
    Index,
}

impl ConstraintKind {
    /// Parses the one-letter code or the full name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "P" | "PRIMARY KEY" => Some(Self::PrimaryKey),
            "U" | "UNIQUE" => Some(Self::Unique),
            "C" | "CHECK" => Some(Self::Check),
            "F" | "FOREIGN KEY" => Some(Self::ForeignKey),
            "I" | "INDEX" => Some(Self::Index),
            _ => None,
        }
    }
}

/// A decoded foreign key definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyConstraint {
    /// Referencing column.
    pub column_name: String,
    /// Referenced table.
    pub reference_table_name: String,
    /// Referenced column.
    pub reference_column_name: String,
    /// ON DELETE action; `None` when the clause is absent (NO ACTION).
    pub on_delete: Option<ForeignKeyAction>,
    /// ON UPDATE action; `None` when the clause is absent.
    pub on_update: Option<ForeignKeyAction>,
    /// DEFERRABLE.
    pub deferrable: bool,
}

/// A decoded plain index definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleIndex {
    /// Index name.
    pub name: String,
    /// Indexed table.
    pub table_name: String,
    /// Indexed column.
    pub column_name: String,
    /// Access method.
    pub index_type: IndexType,
}

/// Kind-specific payload of a constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintPayload {
    /// Columns of a UNIQUE constraint.
    Unique(Vec<String>),
    /// CHECK expression without its wrapping parentheses.
    Check(String),
    /// Foreign key details.
    ForeignKey(ForeignKeyConstraint),
}

/// One decoded constraint row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    /// Table name.
    pub table_name: String,
    /// Column the row is about.
    pub column_name: String,
    /// Constraint or index name.
    pub constraint_name: String,
    /// Kind.
    pub kind: ConstraintKind,
    /// Access method of the backing index, if any.
    pub index_type: Option<IndexType>,
    /// Decoded definition; `None` when the text could not be decoded or the
    /// kind has no payload.
    pub payload: Option<ConstraintPayload>,
}

impl Constraint {
    /// Decodes a catalog row. Rows of an unknown kind are skipped.
    #[must_use]
    pub fn from_row(row: &ConstraintRow) -> Option<Self> {
        let Some(kind) = ConstraintKind::parse(&row.constraint_type) else {
            debug!(
                table = %row.table_name,
                constraint = %row.constraint_name,
                kind = %row.constraint_type,
                "skipping constraint of unsupported kind"
            );
            return None;
        };

        let mut constraint = Self {
            table_name: row.table_name.clone(),
            column_name: row.column_name.clone(),
            constraint_name: row.constraint_name.clone(),
            kind,
            index_type: IndexType::parse(&row.index_type),
            payload: None,
        };

        let definition = row.constraint_definition.as_str();
        match kind {
            ConstraintKind::PrimaryKey => {}
            ConstraintKind::Unique => {
                constraint.payload = parse_unique_constraint(definition).map(ConstraintPayload::Unique);
            }
            ConstraintKind::Check => {
                constraint.payload = parse_check_constraint(definition).map(ConstraintPayload::Check);
            }
            ConstraintKind::ForeignKey => {
                constraint.payload =
                    parse_foreign_key_constraint(definition).map(ConstraintPayload::ForeignKey);
            }
            ConstraintKind::Index => {
                if let Some(index) = parse_simple_index(definition) {
                    constraint.column_name = index.column_name;
                    constraint.index_type = Some(index.index_type);
                }
            }
        }

        if constraint.payload.is_none()
            && matches!(
                kind,
                ConstraintKind::Unique | ConstraintKind::Check | ConstraintKind::ForeignKey
            )
        {
            debug!(
                table = %constraint.table_name,
                constraint = %constraint.constraint_name,
                definition,
                "could not decode constraint definition"
            );
        }
        Some(constraint)
    }

    /// Applies the constraint to a matching live column.
    pub fn apply_to(&self, column: &mut Column) {
        if column.index.is_none() {
            column.index = self.index_type;
        }

        match (&self.kind, &self.payload) {
            (ConstraintKind::PrimaryKey, _) => column.primary_key = true,
            (ConstraintKind::Unique, payload) => {
                let single = match payload {
                    Some(ConstraintPayload::Unique(columns)) => {
                        columns.is_empty() || (columns.len() == 1 && columns[0] == self.column_name)
                    }
                    _ => true,
                };
                if single {
                    column.unique = true;
                } else {
                    column.unique_index.clone_from(&self.constraint_name);
                }
            }
            (ConstraintKind::Check, Some(ConstraintPayload::Check(expression))) => {
                column.check.clone_from(expression);
            }
            (ConstraintKind::ForeignKey, Some(ConstraintPayload::ForeignKey(fk))) => {
                column.reference = Some(crate::table::Reference {
                    table: fk.reference_table_name.clone(),
                    column: fk.reference_column_name.clone(),
                    on_delete: fk.on_delete.unwrap_or(ForeignKeyAction::NoAction),
                    deferrable: fk.deferrable,
                });
            }
            (ConstraintKind::Index, _) => column.index = self.index_type,
            _ => {}
        }
    }
}

/// Decodes `FOREIGN KEY (col) REFERENCES [schema.]tbl(ref) [ON DELETE ..] [ON UPDATE ..] [DEFERRABLE]`.
#[must_use]
pub fn parse_foreign_key_constraint(definition: &str) -> Option<ForeignKeyConstraint> {
    let caps = FOREIGN_KEY_RE.captures(definition.trim())?;
    let rest = caps.get(4).map_or("", |m| m.as_str());

    let action = |re: &Regex| {
        re.captures(rest)
            .and_then(|m| m.get(1))
            .and_then(|m| ForeignKeyAction::parse(m.as_str()))
    };
    let deferrable = DEFERRABLE_RE
        .captures_iter(rest)
        .any(|m| m.get(1).is_none());

    Some(ForeignKeyConstraint {
        column_name: caps[1].to_string(),
        reference_table_name: caps[2].to_string(),
        reference_column_name: caps[3].to_string(),
        on_delete: action(&ON_DELETE_RE),
        on_update: action(&ON_UPDATE_RE),
        deferrable,
    })
}

/// Decodes `CHECK ((expr))` into `expr`.
#[must_use]
pub fn parse_check_constraint(definition: &str) -> Option<String> {
    let caps = CHECK_RE.captures(definition)?;
    let mut expression = caps[1].trim();
    if let Some(inner) = strip_wrapping_parens(expression) {
        expression = inner.trim();
    }
    (!expression.is_empty()).then(|| expression.to_string())
}

/// Decodes `UNIQUE (a, b)` into its column list.
#[must_use]
pub fn parse_unique_constraint(definition: &str) -> Option<Vec<String>> {
    let caps = UNIQUE_RE.captures(definition.trim())?;
    let columns: Vec<String> = caps[1]
        .split(',')
        .map(|c| c.trim().trim_matches('"').to_string())
        .filter(|c| !c.is_empty())
        .collect();
    (!columns.is_empty()).then_some(columns)
}

/// Decodes a single-column `CREATE INDEX name ON schema.table USING method (column)`.
#[must_use]
pub fn parse_simple_index(definition: &str) -> Option<SimpleIndex> {
    let caps = SIMPLE_INDEX_RE.captures(definition.trim())?;
    Some(SimpleIndex {
        name: caps[1].to_string(),
        table_name: caps[2].to_string(),
        index_type: IndexType::parse(&caps[3])?,
        column_name: caps[4].to_string(),
    })
}

/// Returns the text inside one pair of parentheses that wraps all of `s`.
fn strip_wrapping_parens(s: &str) -> Option<&str> {
    let inner = s.strip_prefix('(')?.strip_suffix(')')?;
    let mut depth = 0usize;
    for c in inner.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                if depth == 0 {
                    return None;
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    (depth == 0).then_some(inner)
}

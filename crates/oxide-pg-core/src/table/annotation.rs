//! Field annotation grammar.
//!
//! An annotation is a comma separated list of `key` or `key=value` options,
//! e.g. `name=id,type=uuid,primary,default=gen_random_uuid()`. Commas inside
//! parentheses or single quotes do not split options, so `check=length(a, b) > 0`
//! and `default='a,b'` are single options.

use std::sync::LazyLock;

use regex::Regex;

use crate::data_type::DataType;
use crate::error::AnnotationError;
use crate::index_type::IndexType;
use crate::table::column::{Column, ForeignKeyAction, Reference};

/// The literal marking a field as excluded.
pub const SKIP: &str = "-";

/// One parsed annotation option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagOption {
    /// `name=...` or a bare rename.
    Name(String),
    /// `type=TYPE[(ARG)]`.
    Type {
        /// Parsed type.
        data_type: DataType,
        /// Type argument without parentheses.
        argument: Option<String>,
    },
    /// `primary` / `pk`.
    Primary(bool),
    /// `identity`.
    Identity(bool),
    /// `default=EXPR`.
    Default(String),
    /// `unique`.
    Unique(bool),
    /// `conflict=ACTION`.
    Conflict(String),
    /// `username`.
    Username(bool),
    /// `password`.
    Password(bool),
    /// `nullable` / `null`.
    Nullable(bool),
    /// `ref` / `reference` / `references`.
    Reference(Reference),
    /// `index[=TYPE]`.
    Index(IndexType),
    /// `unique_index[=NAME]`; an empty name is resolved by the table builder.
    UniqueIndex(String),
    /// `check=EXPR`.
    Check(String),
    /// `auto`.
    Auto(bool),
    /// `presenter`.
    Presenter(bool),
    /// `unscannable`.
    Unscannable(bool),
}

static REFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:\w+\.)?(\w+)\s*\(\s*(\w+)\s*(no\s+action|cascade|restrict|set\s+null|set\s+default)?\s*(\w*)\s*\)$",
    )
    .expect("valid reference regex")
});

/// Splits an annotation into raw options at top-level commas.
#[must_use]
pub fn split_options(annotation: &str) -> Vec<&str> {
    let mut options = Vec::new();
    let mut depth = 0usize;
    let mut quoted = false;
    let mut start = 0;

    for (i, c) in annotation.char_indices() {
        match c {
            '\'' => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => depth = depth.saturating_sub(1),
            ',' if !quoted && depth == 0 => {
                options.push(&annotation[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    options.push(&annotation[start..]);

    options
        .into_iter()
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .collect()
}

/// Parses an annotation into its option list.
///
/// `field` names the record field in errors; `table` is the default target of
/// a self-referencing `ref`.
pub fn parse_options(
    field: &str,
    table: &str,
    annotation: &str,
) -> Result<Vec<TagOption>, AnnotationError> {
    split_options(annotation)
        .into_iter()
        .map(|option| parse_option(field, table, option))
        .collect()
}

fn parse_option(field: &str, table: &str, option: &str) -> Result<TagOption, AnnotationError> {
    let (key, value) = match option.split_once('=') {
        Some((key, value)) => (key.trim().to_ascii_lowercase(), Some(value.trim())),
        None => (option.to_ascii_lowercase(), None),
    };

    let required = |value: Option<&str>| {
        value.map(str::to_string).ok_or_else(|| AnnotationError::InvalidOption {
            field: field.to_string(),
            option: option.to_string(),
        })
    };
    let boolean = |value: Option<&str>| match value {
        None => Ok(true),
        Some(v) => parse_bool(v).ok_or_else(|| AnnotationError::InvalidBool {
            field: field.to_string(),
            key: key.clone(),
            value: v.to_string(),
        }),
    };

    let parsed = match key.as_str() {
        "name" => TagOption::Name(required(value)?),
        "type" => parse_type(field, &required(value)?)?,
        "primary" | "pk" => TagOption::Primary(boolean(value)?),
        "identity" => TagOption::Identity(boolean(value)?),
        "default" => TagOption::Default(required(value)?),
        "unique" => TagOption::Unique(boolean(value)?),
        "conflict" => TagOption::Conflict(required(value)?),
        "username" => TagOption::Username(boolean(value)?),
        "password" => TagOption::Password(boolean(value)?),
        "nullable" | "null" => TagOption::Nullable(boolean(value)?),
        "ref" | "reference" | "references" => {
            TagOption::Reference(parse_reference(field, table, &required(value)?)?)
        }
        "index" => match value {
            None => TagOption::Index(IndexType::default()),
            Some(v) => TagOption::Index(IndexType::parse(v).ok_or_else(|| {
                AnnotationError::InvalidIndexType {
                    field: field.to_string(),
                    value: v.to_string(),
                }
            })?),
        },
        "unique_index" => TagOption::UniqueIndex(value.unwrap_or_default().to_string()),
        "check" => TagOption::Check(required(value)?),
        "auto" => TagOption::Auto(boolean(value)?),
        "presenter" => TagOption::Presenter(boolean(value)?),
        "unscannable" => TagOption::Unscannable(boolean(value)?),
        _ if value.is_none() && is_identifier(option) => TagOption::Name(option.to_string()),
        _ => {
            return Err(AnnotationError::UnknownOption {
                field: field.to_string(),
                key: key.clone(),
            })
        }
    };
    Ok(parsed)
}

fn parse_type(field: &str, value: &str) -> Result<TagOption, AnnotationError> {
    if value.contains('(') && !value.contains(')') {
        return Err(AnnotationError::MissingRightParen {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    let (data_type, argument) =
        DataType::parse(value).ok_or_else(|| AnnotationError::InvalidDataType {
            field: field.to_string(),
            value: value.to_string(),
        })?;
    Ok(TagOption::Type {
        data_type,
        argument,
    })
}

/// Parses a `ref` value: `table(column [on-delete] [deferrable])`.
///
/// A value without a table, `column` or `(column ...)`, references `table`.
pub fn parse_reference(field: &str, table: &str, value: &str) -> Result<Reference, AnnotationError> {
    let value = value.trim();
    let full = if value.starts_with('(') {
        format!("{table}{value}")
    } else if value.contains('(') {
        value.to_string()
    } else {
        format!("{table}({value})")
    };

    let invalid = |reason| AnnotationError::InvalidReference {
        field: field.to_string(),
        value: value.to_string(),
        reason,
    };

    let caps = REFERENCE_RE
        .captures(&full)
        .ok_or_else(|| invalid("expected table(column [action] [deferrable])"))?;

    let on_delete = match caps.get(3) {
        Some(m) => ForeignKeyAction::parse(m.as_str()).ok_or_else(|| invalid("invalid on delete action"))?,
        None => ForeignKeyAction::Cascade,
    };

    let deferrable = match caps.get(4).map(|m| m.as_str()) {
        None | Some("") => false,
        Some(word) if word.eq_ignore_ascii_case("deferrable") => true,
        Some(_) => return Err(invalid("invalid deferrable value")),
    };

    if deferrable && on_delete == ForeignKeyAction::Restrict {
        return Err(invalid("deferrable reference cannot have RESTRICT on delete"));
    }

    Ok(Reference {
        table: caps[1].to_string(),
        column: caps[2].to_string(),
        on_delete,
        deferrable,
    })
}

/// Accepts the spellings `1 t T TRUE true True 0 f F FALSE false False`.
fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Column {
    /// Applies parsed options in order.
    ///
    /// Later options win; `nullable` and `default=null` keep each other consistent.
    pub fn apply_options(&mut self, options: Vec<TagOption>) {
        for option in options {
            match option {
                TagOption::Name(name) => self.name = name,
                TagOption::Type {
                    data_type,
                    argument,
                } => {
                    self.data_type = Some(data_type);
                    self.type_argument = argument.unwrap_or_default();
                    if data_type == DataType::TsVector {
                        self.unscannable = true;
                    }
                }
                TagOption::Primary(v) => self.primary_key = v,
                TagOption::Identity(v) => {
                    self.identity = v;
                    if v {
                        self.auto_generated = true;
                    }
                }
                TagOption::Default(expr) => {
                    if expr.eq_ignore_ascii_case("null") {
                        self.nullable = true;
                    }
                    self.default = expr;
                }
                TagOption::Unique(v) => self.unique = v,
                TagOption::Conflict(action) => self.conflict = action,
                TagOption::Username(v) => self.username = v,
                TagOption::Password(v) => self.password = v,
                TagOption::Nullable(v) => {
                    self.nullable = v;
                    if v && self.default.is_empty() {
                        self.default = "null".to_string();
                    } else if !v && self.has_null_default() {
                        self.default.clear();
                    }
                }
                TagOption::Reference(reference) => self.reference = Some(reference),
                TagOption::Index(index) => self.index = Some(index),
                TagOption::UniqueIndex(name) => self.unique_index = name,
                TagOption::Check(expr) => self.check = expr,
                TagOption::Auto(v) => self.auto_generated = v,
                TagOption::Presenter(v) => self.presenter = v,
                TagOption::Unscannable(v) => self.unscannable = v,
            }
        }
    }
}

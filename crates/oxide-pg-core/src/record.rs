//! Static record descriptors.
//!
//! A [`Record`] describes its fields once through a [`RecordDescriptor`] and
//! exposes path-based accessors, so the table builder, the query builders and
//! the scanner never inspect types at runtime. `#[derive(Record)]` from
//! `oxide-pg-derive` generates the implementation.

use crate::error::ScanError;
use crate::value::{HostType, SqlValue};

/// What a descriptor field holds.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// A single value implementing [`crate::SqlField`].
    Value {
        /// Host representation.
        host: HostType,
        /// True when the field is an `Option<T>`.
        optional: bool,
    },
    /// An embedded record whose fields are promoted into the parent table.
    Composite(fn() -> RecordDescriptor),
}

/// One field of a record type.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    /// Field identifier in the record type.
    pub name: &'static str,
    /// Raw annotation; empty when the field carries none.
    pub annotation: &'static str,
    /// Field kind.
    pub kind: FieldKind,
}

impl FieldDescriptor {
    /// Describes a value field.
    #[must_use]
    pub const fn value(
        name: &'static str,
        annotation: &'static str,
        host: HostType,
        optional: bool,
    ) -> Self {
        Self {
            name,
            annotation,
            kind: FieldKind::Value { host, optional },
        }
    }

    /// Describes an embedded record field.
    #[must_use]
    pub const fn composite(
        name: &'static str,
        annotation: &'static str,
        descriptor: fn() -> RecordDescriptor,
    ) -> Self {
        Self {
            name,
            annotation,
            kind: FieldKind::Composite(descriptor),
        }
    }

    /// Host representation; composites report [`HostType::Composite`].
    #[must_use]
    pub const fn host(&self) -> HostType {
        match self.kind {
            FieldKind::Value { host, .. } => host,
            FieldKind::Composite(_) => HostType::Composite,
        }
    }

    /// True for `Option<T>` fields.
    #[must_use]
    pub const fn is_optional(&self) -> bool {
        matches!(self.kind, FieldKind::Value { optional: true, .. })
    }
}

/// Ordered field list of a record type.
#[derive(Debug, Clone)]
pub struct RecordDescriptor {
    /// Record type name.
    pub type_name: &'static str,
    /// Fields in declaration order.
    pub fields: Vec<FieldDescriptor>,
}

impl RecordDescriptor {
    /// Creates a descriptor.
    #[must_use]
    pub const fn new(type_name: &'static str, fields: Vec<FieldDescriptor>) -> Self {
        Self { type_name, fields }
    }
}

/// A record type mapped to a table.
///
/// Field paths are index lists into [`RecordDescriptor::fields`]; a path longer
/// than one element descends into embedded records.
pub trait Record: Default + 'static {
    /// Default table name.
    const TABLE_NAME: &'static str;

    /// Returns the descriptor of this record type.
    fn descriptor() -> RecordDescriptor;

    /// Reads the field at `path`.
    fn field_value(&self, path: &[usize]) -> Option<SqlValue>;

    /// Writes the field at `path`.
    fn set_field_value(&mut self, path: &[usize], value: SqlValue) -> Result<(), ScanError>;
}

/// Reads an embedded record as a single JSON value keyed by field name.
///
/// Returns [`SqlValue::Null`] when every field holds its zero value.
#[must_use]
pub fn composite_value<R: Record>(record: &R) -> SqlValue {
    let descriptor = R::descriptor();
    let mut map = serde_json::Map::new();
    let mut all_zero = true;

    for (i, field) in descriptor.fields.iter().enumerate() {
        let Some(value) = record.field_value(&[i]) else {
            continue;
        };
        if !value.is_zero() {
            all_zero = false;
        }
        map.insert(field.name.to_string(), value.to_json());
    }

    if all_zero {
        SqlValue::Null
    } else {
        SqlValue::Json(serde_json::Value::Object(map))
    }
}

/// Writes an embedded record from a JSON value produced by [`composite_value`].
pub fn set_composite_value<R: Record>(record: &mut R, value: SqlValue) -> Result<(), ScanError> {
    let map = match value {
        SqlValue::Null => return Ok(()),
        SqlValue::Json(serde_json::Value::Object(map)) => map,
        SqlValue::Text(text) => match serde_json::from_str(&text) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => {
                return Err(ScanError::Decode {
                    expected: HostType::Composite,
                    found: "text",
                })
            }
        },
        other => {
            return Err(ScanError::Decode {
                expected: HostType::Composite,
                found: other.kind(),
            })
        }
    };

    let descriptor = R::descriptor();
    for (i, field) in descriptor.fields.iter().enumerate() {
        if let Some(json) = map.get(field.name) {
            let value = SqlValue::from_json(json.clone(), field.host());
            record.set_field_value(&[i], value)?;
        }
    }
    Ok(())
}

//! SQL argument values and conversions from record field types.
//!
//! Builders never inline values into SQL text; every value travels as a
//! positional [`SqlValue`] argument bound to a `$n` placeholder.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::data_type::DataType;
use crate::error::ScanError;

/// A SQL value that can be bound as a positional parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Binary value.
    Bytes(Vec<u8>),
    /// UUID value.
    Uuid(Uuid),
    /// Timestamp value.
    Timestamp(DateTime<Utc>),
    /// Calendar date value.
    Date(NaiveDate),
    /// Time span value.
    Interval(Duration),
    /// JSON document.
    Json(serde_json::Value),
    /// Array of values, bound as a PostgreSQL array.
    Array(Vec<SqlValue>),
}

impl SqlValue {
    /// Returns true for the zero value of the variant.
    ///
    /// Zero values are left out of INSERT, full UPDATE and EXISTS arguments so
    /// that database defaults apply.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Bool(b) => !b,
            Self::Int(n) => *n == 0,
            Self::Float(f) => *f == 0.0,
            Self::Text(s) => s.is_empty(),
            Self::Bytes(b) => b.is_empty(),
            Self::Uuid(u) => u.is_nil(),
            Self::Timestamp(t) => t.timestamp() == 0 && t.timestamp_subsec_nanos() == 0,
            Self::Date(d) => NaiveDate::from_ymd_opt(1970, 1, 1).is_some_and(|epoch| *d == epoch),
            Self::Interval(d) => d.is_zero(),
            Self::Json(v) => match v {
                serde_json::Value::Null => true,
                serde_json::Value::Object(map) => map.is_empty(),
                serde_json::Value::Array(items) => items.is_empty(),
                _ => false,
            },
            Self::Array(items) => items.is_empty(),
        }
    }

    /// Returns true for [`SqlValue::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short name of the variant, used in decode errors.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Uuid(_) => "uuid",
            Self::Timestamp(_) => "timestamp",
            Self::Date(_) => "date",
            Self::Interval(_) => "interval",
            Self::Json(_) => "json",
            Self::Array(_) => "array",
        }
    }

    /// Converts the value to JSON, used for composite fields stored as one column.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(n) => Value::from(*n),
            Self::Float(f) => Value::from(*f),
            Self::Text(s) => Value::String(s.clone()),
            Self::Bytes(b) => Value::Array(b.iter().map(|byte| Value::from(*byte)).collect()),
            Self::Uuid(u) => Value::String(u.to_string()),
            Self::Timestamp(t) => Value::String(t.to_rfc3339()),
            Self::Date(d) => Value::String(d.to_string()),
            Self::Interval(d) => Value::from(d.as_secs_f64()),
            Self::Json(v) => v.clone(),
            Self::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
        }
    }

    /// Converts a JSON value into the representation expected by `host`.
    #[must_use]
    pub fn from_json(value: serde_json::Value, host: HostType) -> Self {
        use serde_json::Value;
        match (host, value) {
            (_, Value::Null) => Self::Null,
            (HostType::Json, v) => Self::Json(v),
            (_, Value::Bool(b)) => Self::Bool(b),
            (HostType::F32 | HostType::F64, Value::Number(n)) => {
                n.as_f64().map_or(Self::Null, Self::Float)
            }
            (HostType::Interval, Value::Number(n)) => n
                .as_f64()
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                .map_or(Self::Null, Self::Interval),
            (_, Value::Number(n)) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float))
                .unwrap_or(Self::Null),
            (HostType::Uuid, Value::String(s)) => {
                Uuid::parse_str(&s).map_or(Self::Text(s), Self::Uuid)
            }
            (HostType::Timestamp, Value::String(s)) => DateTime::parse_from_rfc3339(&s)
                .map_or(Self::Text(s), |t| Self::Timestamp(t.with_timezone(&Utc))),
            (HostType::Date, Value::String(s)) => {
                s.parse::<NaiveDate>().map_or(Self::Text(s), Self::Date)
            }
            (_, Value::String(s)) => Self::Text(s),
            (HostType::Bytes, Value::Array(items)) => Self::Bytes(
                items
                    .iter()
                    .filter_map(|v| v.as_u64().and_then(|n| u8::try_from(n).ok()))
                    .collect(),
            ),
            (host, Value::Array(items)) => {
                let element = host.element().unwrap_or(HostType::Json);
                Self::Array(
                    items
                        .into_iter()
                        .map(|item| Self::from_json(item, element))
                        .collect(),
                )
            }
            (_, v @ Value::Object(_)) => Self::Json(v),
        }
    }
}

/// The host representation of a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostType {
    /// `bool`.
    Bool,
    /// `i16`.
    I16,
    /// `i32`.
    I32,
    /// `i64`.
    I64,
    /// `f32`.
    F32,
    /// `f64`.
    F64,
    /// `String`.
    String,
    /// `Vec<u8>`.
    Bytes,
    /// `uuid::Uuid`.
    Uuid,
    /// `chrono::DateTime<Utc>`.
    Timestamp,
    /// `chrono::NaiveDate`.
    Date,
    /// `std::time::Duration`.
    Interval,
    /// `serde_json::Value` or [`Json<T>`].
    Json,
    /// `Vec<String>`.
    StringArray,
    /// `Vec<i32>`.
    I32Array,
    /// `Vec<i64>`.
    I64Array,
    /// `Vec<Uuid>`.
    UuidArray,
    /// A user type with its own [`SqlField`] conversion (a scanner).
    Custom,
    /// An embedded record.
    Composite,
}

impl HostType {
    /// Returns the column type used when the annotation has no `type=`.
    #[must_use]
    pub const fn default_data_type(self) -> Option<DataType> {
        let data_type = match self {
            Self::Bool => DataType::Boolean,
            Self::I16 => DataType::SmallInt,
            Self::I32 => DataType::Integer,
            Self::I64 => DataType::BigInt,
            Self::F32 => DataType::Real,
            Self::F64 => DataType::DoublePrecision,
            Self::String => DataType::Text,
            Self::Bytes => DataType::Bytea,
            Self::Uuid => DataType::Uuid,
            Self::Timestamp => DataType::Timestamp,
            Self::Date => DataType::Date,
            Self::Interval => DataType::Interval,
            Self::Json => DataType::Jsonb,
            Self::StringArray => DataType::TextArray,
            Self::I32Array => DataType::IntegerArray,
            Self::I64Array => DataType::BigIntArray,
            Self::UuidArray => DataType::UuidArray,
            Self::Custom | Self::Composite => return None,
        };
        Some(data_type)
    }

    /// Element type of array host types.
    #[must_use]
    pub const fn element(self) -> Option<Self> {
        match self {
            Self::StringArray => Some(Self::String),
            Self::I32Array => Some(Self::I32),
            Self::I64Array => Some(Self::I64),
            Self::UuidArray => Some(Self::Uuid),
            _ => None,
        }
    }
}

/// Conversion between a record field type and [`SqlValue`].
///
/// Every field of a `#[derive(Record)]` type must implement this trait.
pub trait SqlField: Sized {
    /// Host representation of the type.
    const HOST: HostType;
    /// True for `Option<T>`.
    const OPTIONAL: bool = false;

    /// Converts the field to an argument value.
    fn to_sql_value(&self) -> SqlValue;

    /// Converts a decoded value back into the field type.
    fn from_sql_value(value: SqlValue) -> Result<Self, ScanError>;
}

fn mismatch<T>(expected: HostType, value: &SqlValue) -> Result<T, ScanError> {
    Err(ScanError::Decode {
        expected,
        found: value.kind(),
    })
}

impl SqlField for bool {
    const HOST: HostType = HostType::Bool;

    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Bool(*self)
    }

    fn from_sql_value(value: SqlValue) -> Result<Self, ScanError> {
        match value {
            SqlValue::Bool(b) => Ok(b),
            other => mismatch(Self::HOST, &other),
        }
    }
}

macro_rules! integer_field {
    ($ty:ty, $host:expr) => {
        impl SqlField for $ty {
            const HOST: HostType = $host;

            fn to_sql_value(&self) -> SqlValue {
                SqlValue::Int(i64::from(*self))
            }

            fn from_sql_value(value: SqlValue) -> Result<Self, ScanError> {
                match value {
                    SqlValue::Int(n) => <$ty>::try_from(n).map_err(|_| ScanError::Decode {
                        expected: Self::HOST,
                        found: "out of range int",
                    }),
                    other => mismatch(Self::HOST, &other),
                }
            }
        }
    };
}

integer_field!(i16, HostType::I16);
integer_field!(i32, HostType::I32);
integer_field!(i64, HostType::I64);

impl SqlField for f64 {
    const HOST: HostType = HostType::F64;

    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Float(*self)
    }

    #[allow(clippy::cast_precision_loss)]
    fn from_sql_value(value: SqlValue) -> Result<Self, ScanError> {
        match value {
            SqlValue::Float(f) => Ok(f),
            SqlValue::Int(n) => Ok(n as Self),
            other => mismatch(Self::HOST, &other),
        }
    }
}

impl SqlField for f32 {
    const HOST: HostType = HostType::F32;

    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Float(f64::from(*self))
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn from_sql_value(value: SqlValue) -> Result<Self, ScanError> {
        match value {
            SqlValue::Float(f) => Ok(f as Self),
            SqlValue::Int(n) => Ok(n as Self),
            other => mismatch(Self::HOST, &other),
        }
    }
}

impl SqlField for String {
    const HOST: HostType = HostType::String;

    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Text(self.clone())
    }

    fn from_sql_value(value: SqlValue) -> Result<Self, ScanError> {
        match value {
            SqlValue::Text(s) => Ok(s),
            SqlValue::Uuid(u) => Ok(u.to_string()),
            other => mismatch(Self::HOST, &other),
        }
    }
}

impl SqlField for Vec<u8> {
    const HOST: HostType = HostType::Bytes;

    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Bytes(self.clone())
    }

    fn from_sql_value(value: SqlValue) -> Result<Self, ScanError> {
        match value {
            SqlValue::Bytes(b) => Ok(b),
            other => mismatch(Self::HOST, &other),
        }
    }
}

impl SqlField for Uuid {
    const HOST: HostType = HostType::Uuid;

    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Uuid(*self)
    }

    fn from_sql_value(value: SqlValue) -> Result<Self, ScanError> {
        match value {
            SqlValue::Uuid(u) => Ok(u),
            SqlValue::Text(ref s) => Self::parse_str(s).or_else(|_| mismatch(Self::HOST, &value)),
            other => mismatch(Self::HOST, &other),
        }
    }
}

impl SqlField for DateTime<Utc> {
    const HOST: HostType = HostType::Timestamp;

    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Timestamp(*self)
    }

    fn from_sql_value(value: SqlValue) -> Result<Self, ScanError> {
        match value {
            SqlValue::Timestamp(t) => Ok(t),
            other => mismatch(Self::HOST, &other),
        }
    }
}

impl SqlField for NaiveDate {
    const HOST: HostType = HostType::Date;

    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Date(*self)
    }

    fn from_sql_value(value: SqlValue) -> Result<Self, ScanError> {
        match value {
            SqlValue::Date(d) => Ok(d),
            other => mismatch(Self::HOST, &other),
        }
    }
}

impl SqlField for Duration {
    const HOST: HostType = HostType::Interval;

    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Interval(*self)
    }

    fn from_sql_value(value: SqlValue) -> Result<Self, ScanError> {
        match value {
            SqlValue::Interval(d) => Ok(d),
            other => mismatch(Self::HOST, &other),
        }
    }
}

impl SqlField for serde_json::Value {
    const HOST: HostType = HostType::Json;

    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Json(self.clone())
    }

    fn from_sql_value(value: SqlValue) -> Result<Self, ScanError> {
        match value {
            SqlValue::Json(v) => Ok(v),
            SqlValue::Null => Ok(Self::Null),
            other => mismatch(Self::HOST, &other),
        }
    }
}

macro_rules! array_field {
    ($elem:ty, $host:expr) => {
        impl SqlField for Vec<$elem> {
            const HOST: HostType = $host;

            fn to_sql_value(&self) -> SqlValue {
                SqlValue::Array(self.iter().map(SqlField::to_sql_value).collect())
            }

            fn from_sql_value(value: SqlValue) -> Result<Self, ScanError> {
                match value {
                    SqlValue::Array(items) => items
                        .into_iter()
                        .map(<$elem as SqlField>::from_sql_value)
                        .collect(),
                    other => mismatch(Self::HOST, &other),
                }
            }
        }
    };
}

array_field!(String, HostType::StringArray);
array_field!(i32, HostType::I32Array);
array_field!(i64, HostType::I64Array);
array_field!(Uuid, HostType::UuidArray);

impl<T: SqlField> SqlField for Option<T> {
    const HOST: HostType = T::HOST;
    const OPTIONAL: bool = true;

    fn to_sql_value(&self) -> SqlValue {
        match self {
            Some(v) => v.to_sql_value(),
            None => SqlValue::Null,
        }
    }

    fn from_sql_value(value: SqlValue) -> Result<Self, ScanError> {
        match value {
            SqlValue::Null => Ok(None),
            other => T::from_sql_value(other).map(Some),
        }
    }
}

/// Stores any serde type in a `json`/`jsonb` column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T: Serialize + DeserializeOwned> SqlField for Json<T> {
    const HOST: HostType = HostType::Json;

    fn to_sql_value(&self) -> SqlValue {
        serde_json::to_value(&self.0).map_or(SqlValue::Null, SqlValue::Json)
    }

    fn from_sql_value(value: SqlValue) -> Result<Self, ScanError> {
        let json = match value {
            SqlValue::Json(v) => v,
            SqlValue::Text(s) => serde_json::from_str(&s).map_err(|_| ScanError::Decode {
                expected: Self::HOST,
                found: "malformed json text",
            })?,
            other => return mismatch(Self::HOST, &other),
        };
        serde_json::from_value(json).map(Json).map_err(|_| ScanError::Decode {
            expected: Self::HOST,
            found: "json of another shape",
        })
    }
}

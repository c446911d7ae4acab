//! Conversions between [`SqlValue`] and the sqlx Postgres driver.

use std::net::IpAddr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use oxide_pg_core::{ScanError, SqlValue};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::types::{Oid, PgInterval};
use sqlx::postgres::{PgArgumentBuffer, PgArguments, PgRow, PgTypeInfo, PgValueFormat};
use sqlx::query::Query;
use sqlx::{Column, Encode, Postgres, Row, Type, TypeInfo, ValueRef};
use uuid::Uuid;

const MICROS_PER_DAY: i64 = 86_400_000_000;

/// A NULL whose type the server infers from the statement.
struct UntypedNull;

impl Type<Postgres> for UntypedNull {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_oid(Oid(0))
    }
}

impl Encode<'_, Postgres> for UntypedNull {
    fn encode_by_ref(&self, _buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        Ok(IsNull::Yes)
    }
}

/// Binds one argument to a query.
pub(crate) fn bind_value(
    query: Query<'_, Postgres, PgArguments>,
    value: SqlValue,
) -> Query<'_, Postgres, PgArguments> {
    match value {
        SqlValue::Null => query.bind(UntypedNull),
        SqlValue::Bool(b) => query.bind(b),
        SqlValue::Int(i) => query.bind(i),
        SqlValue::Float(f) => query.bind(f),
        SqlValue::Text(s) => query.bind(s),
        SqlValue::Bytes(b) => query.bind(b),
        SqlValue::Uuid(u) => query.bind(u),
        SqlValue::Timestamp(t) => query.bind(t),
        SqlValue::Date(d) => query.bind(d),
        SqlValue::Interval(d) => query.bind(d),
        SqlValue::Json(v) => query.bind(v),
        SqlValue::Array(items) => bind_array(query, items),
    }
}

/// Homogeneous arrays bind as native arrays; anything else as a JSON array.
fn bind_array(
    query: Query<'_, Postgres, PgArguments>,
    items: Vec<SqlValue>,
) -> Query<'_, Postgres, PgArguments> {
    if items.iter().all(|v| matches!(v, SqlValue::Text(_))) {
        let texts: Vec<String> = items
            .into_iter()
            .filter_map(|v| match v {
                SqlValue::Text(s) => Some(s),
                _ => None,
            })
            .collect();
        return query.bind(texts);
    }
    if items.iter().all(|v| matches!(v, SqlValue::Int(_))) {
        let ints: Vec<i64> = items
            .into_iter()
            .filter_map(|v| match v {
                SqlValue::Int(i) => Some(i),
                _ => None,
            })
            .collect();
        return query.bind(ints);
    }
    if items.iter().all(|v| matches!(v, SqlValue::Uuid(_))) {
        let uuids: Vec<Uuid> = items
            .into_iter()
            .filter_map(|v| match v {
                SqlValue::Uuid(u) => Some(u),
                _ => None,
            })
            .collect();
        return query.bind(uuids);
    }
    if items.iter().all(|v| matches!(v, SqlValue::Float(_))) {
        let floats: Vec<f64> = items
            .into_iter()
            .filter_map(|v| match v {
                SqlValue::Float(f) => Some(f),
                _ => None,
            })
            .collect();
        return query.bind(floats);
    }
    let json = serde_json::Value::Array(items.iter().map(SqlValue::to_json).collect());
    query.bind(json)
}

/// Names of the result columns of a row.
pub(crate) fn column_names(row: &PgRow) -> Vec<String> {
    row.columns().iter().map(|c| c.name().to_string()).collect()
}

/// Reads every column of `row`; columns whose index is in `skip` read as NULL.
pub(crate) fn row_values(row: &PgRow, skip: &[usize]) -> Result<Vec<SqlValue>, ScanError> {
    row.columns()
        .iter()
        .map(|column| {
            let index = column.ordinal();
            if skip.contains(&index) {
                return Ok(SqlValue::Null);
            }
            let type_name = column.type_info().name().to_ascii_uppercase();
            read_value(row, index, &type_name).map_err(|source| match source {
                ReadError::Unsupported => ScanError::UnsupportedType {
                    column: column.name().to_string(),
                    type_name,
                },
                ReadError::Driver(err) => ScanError::Column {
                    column: column.name().to_string(),
                    source: Box::new(ScanError::Decode {
                        expected: oxide_pg_core::HostType::Custom,
                        found: driver_error_kind(&err),
                    }),
                },
            })
        })
        .collect()
}

enum ReadError {
    Unsupported,
    Driver(sqlx::Error),
}

impl From<sqlx::Error> for ReadError {
    fn from(err: sqlx::Error) -> Self {
        Self::Driver(err)
    }
}

const fn driver_error_kind(err: &sqlx::Error) -> &'static str {
    match err {
        sqlx::Error::ColumnDecode { .. } => "undecodable column",
        sqlx::Error::ColumnNotFound(_) | sqlx::Error::ColumnIndexOutOfBounds { .. } => {
            "missing column"
        }
        _ => "driver error",
    }
}

/// How a column of a given Postgres type is read into a [`SqlValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reader {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Numeric,
    Text,
    /// The single-byte internal `"char"` type.
    InternalChar,
    Inet,
    Bytes,
    Uuid,
    Timestamptz,
    Timestamp,
    Date,
    Time,
    Interval,
    Json,
    TextArray,
    BoolArray,
    Int4Array,
    Int8Array,
    Float4Array,
    Float8Array,
    UuidArray,
}

impl Reader {
    /// Maps an upper-cased driver type name to its reader.
    fn for_type(type_name: &str) -> Option<Self> {
        let reader = match type_name {
            "BOOL" => Self::Bool,
            "INT2" => Self::Int2,
            "INT4" => Self::Int4,
            "INT8" => Self::Int8,
            "FLOAT4" => Self::Float4,
            "FLOAT8" => Self::Float8,
            "NUMERIC" => Self::Numeric,
            "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" | "CITEXT" | "XML" => Self::Text,
            "\"CHAR\"" => Self::InternalChar,
            "INET" | "CIDR" => Self::Inet,
            "BYTEA" => Self::Bytes,
            "UUID" => Self::Uuid,
            "TIMESTAMPTZ" => Self::Timestamptz,
            "TIMESTAMP" => Self::Timestamp,
            "DATE" => Self::Date,
            "TIME" => Self::Time,
            "INTERVAL" => Self::Interval,
            "JSON" | "JSONB" => Self::Json,
            "TEXT[]" | "VARCHAR[]" | "_TEXT" | "_VARCHAR" => Self::TextArray,
            "BOOL[]" | "_BOOL" => Self::BoolArray,
            "INT4[]" | "_INT4" => Self::Int4Array,
            "INT8[]" | "_INT8" => Self::Int8Array,
            "FLOAT4[]" | "_FLOAT4" => Self::Float4Array,
            "FLOAT8[]" | "_FLOAT8" => Self::Float8Array,
            "UUID[]" | "_UUID" => Self::UuidArray,
            _ => return None,
        };
        Some(reader)
    }

    fn read(self, row: &PgRow, index: usize) -> Result<SqlValue, sqlx::Error> {
        let value = match self {
            Self::Bool => opt(row.try_get::<Option<bool>, _>(index)?, SqlValue::Bool),
            Self::Int2 => opt(row.try_get::<Option<i16>, _>(index)?, |n| {
                SqlValue::Int(i64::from(n))
            }),
            Self::Int4 => opt(row.try_get::<Option<i32>, _>(index)?, |n| {
                SqlValue::Int(i64::from(n))
            }),
            Self::Int8 => opt(row.try_get::<Option<i64>, _>(index)?, SqlValue::Int),
            Self::Float4 => opt(row.try_get::<Option<f32>, _>(index)?, |f| {
                SqlValue::Float(f64::from(f))
            }),
            Self::Float8 => opt(row.try_get::<Option<f64>, _>(index)?, SqlValue::Float),
            Self::Numeric => match raw_text(row, index, numeric_text)? {
                Some(text) => SqlValue::Float(text.parse().map_err(|e| decode_error(index, e))?),
                None => SqlValue::Null,
            },
            Self::Text => opt(
                row.try_get_unchecked::<Option<String>, _>(index)?,
                SqlValue::Text,
            ),
            Self::InternalChar => opt(row.try_get::<Option<i8>, _>(index)?, |c| {
                SqlValue::Text(char::from(c.to_ne_bytes()[0]).to_string())
            }),
            Self::Inet => opt(raw_text(row, index, inet_text)?, SqlValue::Text),
            Self::Bytes => opt(row.try_get::<Option<Vec<u8>>, _>(index)?, SqlValue::Bytes),
            Self::Uuid => opt(row.try_get::<Option<Uuid>, _>(index)?, SqlValue::Uuid),
            Self::Timestamptz => opt(
                row.try_get::<Option<DateTime<Utc>>, _>(index)?,
                SqlValue::Timestamp,
            ),
            Self::Timestamp => opt(row.try_get::<Option<NaiveDateTime>, _>(index)?, |t| {
                SqlValue::Timestamp(t.and_utc())
            }),
            Self::Date => opt(row.try_get::<Option<NaiveDate>, _>(index)?, SqlValue::Date),
            Self::Time => opt(row.try_get::<Option<NaiveTime>, _>(index)?, |t| {
                SqlValue::Text(t.to_string())
            }),
            Self::Interval => opt(row.try_get::<Option<PgInterval>, _>(index)?, interval_value),
            Self::Json => opt(
                row.try_get::<Option<serde_json::Value>, _>(index)?,
                SqlValue::Json,
            ),
            Self::TextArray => opt(row.try_get::<Option<Vec<String>>, _>(index)?, |items| {
                SqlValue::Array(items.into_iter().map(SqlValue::Text).collect())
            }),
            Self::BoolArray => opt(row.try_get::<Option<Vec<bool>>, _>(index)?, |items| {
                SqlValue::Array(items.into_iter().map(SqlValue::Bool).collect())
            }),
            Self::Int4Array => opt(row.try_get::<Option<Vec<i32>>, _>(index)?, |items| {
                SqlValue::Array(items.into_iter().map(|n| SqlValue::Int(i64::from(n))).collect())
            }),
            Self::Int8Array => opt(row.try_get::<Option<Vec<i64>>, _>(index)?, |items| {
                SqlValue::Array(items.into_iter().map(SqlValue::Int).collect())
            }),
            Self::Float4Array => opt(row.try_get::<Option<Vec<f32>>, _>(index)?, |items| {
                SqlValue::Array(items.into_iter().map(|f| SqlValue::Float(f64::from(f))).collect())
            }),
            Self::Float8Array => opt(row.try_get::<Option<Vec<f64>>, _>(index)?, |items| {
                SqlValue::Array(items.into_iter().map(SqlValue::Float).collect())
            }),
            Self::UuidArray => opt(row.try_get::<Option<Vec<Uuid>>, _>(index)?, |items| {
                SqlValue::Array(items.into_iter().map(SqlValue::Uuid).collect())
            }),
        };
        Ok(value)
    }
}

fn read_value(row: &PgRow, index: usize, type_name: &str) -> Result<SqlValue, ReadError> {
    let reader = Reader::for_type(type_name).ok_or(ReadError::Unsupported)?;
    Ok(reader.read(row, index)?)
}

fn decode_error(index: usize, err: impl Into<BoxDynError>) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: index.to_string(),
        source: err.into(),
    }
}

/// Reads a column the driver has no host type for.
///
/// Text-format values are taken as is; binary ones go through `binary`.
fn raw_text(
    row: &PgRow,
    index: usize,
    binary: fn(&[u8]) -> Result<String, BoxDynError>,
) -> Result<Option<String>, sqlx::Error> {
    let value = row.try_get_raw(index)?;
    if value.is_null() {
        return Ok(None);
    }
    let text = match value.format() {
        PgValueFormat::Text => value.as_str().map(str::to_owned),
        PgValueFormat::Binary => value.as_bytes().and_then(binary),
    };
    text.map(Some).map_err(|e| decode_error(index, e))
}

const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

/// Renders the binary form of a `numeric`: a header of digit count, weight,
/// sign and display scale followed by base-10000 digits.
fn numeric_text(bytes: &[u8]) -> Result<String, BoxDynError> {
    let word = |at: usize| -> Result<u16, BoxDynError> {
        bytes
            .get(at..at + 2)
            .map(|b| u16::from_be_bytes([b[0], b[1]]))
            .ok_or_else(|| "truncated numeric".into())
    };
    let count = usize::from(word(0)?);
    let weight = i32::from(i16::from_be_bytes(word(2)?.to_be_bytes()));
    let sign = word(4)?;
    let scale = usize::from(word(6)?);
    let digits = (0..count)
        .map(|i| word(8 + 2 * i))
        .collect::<Result<Vec<u16>, _>>()?;

    match sign {
        NUMERIC_NAN => return Ok("NaN".into()),
        NUMERIC_PINF => return Ok("Infinity".into()),
        NUMERIC_NINF => return Ok("-Infinity".into()),
        _ => {}
    }

    let digit = |k: i32| -> u16 {
        usize::try_from(k)
            .ok()
            .and_then(|k| digits.get(k).copied())
            .unwrap_or(0)
    };

    let mut out = String::new();
    if sign == NUMERIC_NEG {
        out.push('-');
    }
    if weight < 0 {
        out.push('0');
    } else {
        out.push_str(&digit(0).to_string());
        for k in 1..=weight {
            out.push_str(&format!("{:04}", digit(k)));
        }
    }
    if scale > 0 {
        let mut fraction = String::new();
        let mut k = weight + 1;
        while fraction.len() < scale {
            fraction.push_str(&format!("{:04}", digit(k)));
            k += 1;
        }
        fraction.truncate(scale);
        out.push('.');
        out.push_str(&fraction);
    }
    Ok(out)
}

const INET_FAMILY_V4: u8 = 2;
const INET_FAMILY_V6: u8 = 3;

/// Renders the binary form of an `inet` or `cidr` as `address/bits`.
///
/// The prefix length is omitted for a single host, as `inet` output does.
fn inet_text(bytes: &[u8]) -> Result<String, BoxDynError> {
    let [family, bits, is_cidr, len, address @ ..] = bytes else {
        return Err("truncated inet".into());
    };
    let (address, max_bits) = match (*family, address.len()) {
        (INET_FAMILY_V4, 4) if *len == 4 => {
            let octets: [u8; 4] = address.try_into()?;
            (IpAddr::from(octets), 32)
        }
        (INET_FAMILY_V6, 16) if *len == 16 => {
            let octets: [u8; 16] = address.try_into()?;
            (IpAddr::from(octets), 128)
        }
        _ => return Err(format!("unexpected inet family {family}").into()),
    };
    if *is_cidr == 0 && *bits == max_bits {
        Ok(address.to_string())
    } else {
        Ok(format!("{address}/{bits}"))
    }
}

fn opt<T>(value: Option<T>, f: impl FnOnce(T) -> SqlValue) -> SqlValue {
    value.map_or(SqlValue::Null, f)
}

/// Months count as 30 days; negative spans clamp to zero.
fn interval_value(interval: PgInterval) -> SqlValue {
    let micros = i64::from(interval.months) * 30 * MICROS_PER_DAY
        + i64::from(interval.days) * MICROS_PER_DAY
        + interval.microseconds;
    let micros = u64::try_from(micros).unwrap_or(0);
    SqlValue::Interval(std::time::Duration::from_micros(micros))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_value() {
        let value = interval_value(PgInterval {
            months: 1,
            days: 2,
            microseconds: 3_000_000,
        });
        assert_eq!(
            value,
            SqlValue::Interval(std::time::Duration::from_secs(32 * 86_400 + 3))
        );
    }

    #[test]
    fn test_negative_interval_clamps() {
        let value = interval_value(PgInterval {
            months: 0,
            days: -1,
            microseconds: 0,
        });
        assert_eq!(value, SqlValue::Interval(std::time::Duration::ZERO));
    }

    #[test]
    fn test_reader_for_type() {
        assert_eq!(Reader::for_type("NUMERIC"), Some(Reader::Numeric));
        assert_eq!(Reader::for_type("TIME"), Some(Reader::Time));
        assert_eq!(Reader::for_type("INET"), Some(Reader::Inet));
        assert_eq!(Reader::for_type("CIDR"), Some(Reader::Inet));
        assert_eq!(Reader::for_type("XML"), Some(Reader::Text));
        assert_eq!(Reader::for_type("CHAR"), Some(Reader::Text));
        assert_eq!(Reader::for_type("CITEXT"), Some(Reader::Text));
        assert_eq!(Reader::for_type("\"CHAR\""), Some(Reader::InternalChar));
        assert_eq!(Reader::for_type("BOOL[]"), Some(Reader::BoolArray));
        assert_eq!(Reader::for_type("FLOAT8[]"), Some(Reader::Float8Array));
        assert_eq!(Reader::for_type("_FLOAT4"), Some(Reader::Float4Array));
        assert_eq!(Reader::for_type("TSVECTOR"), None);
        assert_eq!(Reader::for_type("MONEY"), None);
    }

    fn numeric(count: u16, weight: i16, sign: u16, scale: u16, digits: &[u16]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for word in [count, u16::from_be_bytes(weight.to_be_bytes()), sign, scale] {
            bytes.extend_from_slice(&word.to_be_bytes());
        }
        for digit in digits {
            bytes.extend_from_slice(&digit.to_be_bytes());
        }
        bytes
    }

    #[test]
    fn test_numeric_text() {
        assert_eq!(numeric_text(&numeric(2, 0, 0, 2, &[12, 3400])).unwrap(), "12.34");
        assert_eq!(numeric_text(&numeric(1, -1, 0, 4, &[5])).unwrap(), "0.0005");
        assert_eq!(
            numeric_text(&numeric(1, 1, NUMERIC_NEG, 0, &[10])).unwrap(),
            "-100000"
        );
        assert_eq!(numeric_text(&numeric(0, 0, 0, 2, &[])).unwrap(), "0.00");
        assert_eq!(numeric_text(&numeric(0, 0, NUMERIC_NAN, 0, &[])).unwrap(), "NaN");
        assert!(numeric_text(&[0, 1]).is_err());
    }

    #[test]
    fn test_inet_text() {
        assert_eq!(inet_text(&[2, 32, 0, 4, 10, 0, 0, 1]).unwrap(), "10.0.0.1");
        assert_eq!(inet_text(&[2, 24, 1, 4, 192, 168, 1, 0]).unwrap(), "192.168.1.0/24");

        let mut v6 = vec![3, 64, 0, 16, 0x20, 0x01, 0x0d, 0xb8];
        v6.extend_from_slice(&[0; 12]);
        assert_eq!(inet_text(&v6).unwrap(), "2001:db8::/64");

        assert!(inet_text(&[2, 32, 0]).is_err());
        assert!(inet_text(&[9, 32, 0, 4, 1, 2, 3, 4]).is_err());
    }
}

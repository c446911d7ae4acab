//! PostgreSQL column data types and their textual aliases.

use std::fmt;
use std::str::FromStr;

use crate::value::HostType;

/// A PostgreSQL column data type.
///
/// Every variant has at least one alias; the first alias is the canonical name
/// used when generating DDL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Signed 64-bit integer.
    BigInt,
    /// Array of signed 64-bit integers.
    BigIntArray,
    /// Auto-incrementing 64-bit integer.
    BigSerial,
    /// Fixed-length bit string.
    Bit,
    /// Variable-length bit string.
    BitVarying,
    /// Logical boolean.
    Boolean,
    /// Rectangular box on a plane.
    Box,
    /// Binary string.
    Bytea,
    /// Fixed-length character string.
    Character,
    /// Array of fixed-length character strings.
    CharacterArray,
    /// Variable-length character string.
    CharacterVarying,
    /// Array of variable-length character strings.
    CharacterVaryingArray,
    /// IPv4 or IPv6 network.
    Cidr,
    /// Circle on a plane.
    Circle,
    /// Calendar date.
    Date,
    /// Double-precision floating-point number.
    DoublePrecision,
    /// IPv4 or IPv6 host address.
    Inet,
    /// Signed 32-bit integer.
    Integer,
    /// Array of signed 32-bit integers.
    IntegerArray,
    /// Two-dimensional array of signed 32-bit integers.
    IntegerDoubleArray,
    /// Array of any dimension.
    Array,
    /// Time span.
    Interval,
    /// Textual JSON.
    Json,
    /// Binary JSON.
    Jsonb,
    /// Infinite line on a plane.
    Line,
    /// Line segment on a plane.
    Lseg,
    /// MAC address (6 bytes).
    MacAddr,
    /// EUI-64 MAC address (8 bytes).
    MacAddr8,
    /// Currency amount.
    Money,
    /// Exact numeric with selectable precision.
    Numeric,
    /// Geometric path on a plane.
    Path,
    /// Write-ahead log sequence number.
    PgLsn,
    /// Geometric point on a plane.
    Point,
    /// Closed geometric path on a plane.
    Polygon,
    /// Single-precision floating-point number.
    Real,
    /// Signed 16-bit integer.
    SmallInt,
    /// Auto-incrementing 16-bit integer.
    SmallSerial,
    /// Auto-incrementing 32-bit integer.
    Serial,
    /// Unlimited variable-length character string.
    Text,
    /// Array of text.
    TextArray,
    /// Two-dimensional array of text.
    TextDoubleArray,
    /// Time of day without time zone.
    Time,
    /// Time of day with time zone.
    TimeTz,
    /// Date and time without time zone.
    Timestamp,
    /// Date and time with time zone.
    TimestampTz,
    /// Text search query.
    TsQuery,
    /// Text search document.
    TsVector,
    /// Transaction snapshot.
    TxidSnapshot,
    /// Universally unique identifier.
    Uuid,
    /// Array of universally unique identifiers.
    UuidArray,
    /// XML document.
    Xml,
    /// Range of integer.
    Int4Range,
    /// Multirange of integer.
    Int4MultiRange,
    /// Range of bigint.
    Int8Range,
    /// Multirange of bigint.
    Int8MultiRange,
    /// Range of numeric.
    NumRange,
    /// Multirange of numeric.
    NumMultiRange,
    /// Range of timestamp without time zone.
    TsRange,
    /// Multirange of timestamp without time zone.
    TsMultiRange,
    /// Range of timestamp with time zone.
    TsTzRange,
    /// Multirange of timestamp with time zone.
    TsTzMultiRange,
    /// Range of date.
    DateRange,
    /// Multirange of date.
    DateMultiRange,
    /// Case-insensitive text (`citext` extension).
    CiText,
    /// Key/value store (`hstore` extension).
    HStore,
}

impl DataType {
    /// Every known data type, in alias lookup order.
    pub const ALL: &'static [Self] = &[
        Self::BigInt,
        Self::BigIntArray,
        Self::BigSerial,
        Self::Bit,
        Self::BitVarying,
        Self::Boolean,
        Self::Box,
        Self::Bytea,
        Self::Character,
        Self::CharacterArray,
        Self::CharacterVarying,
        Self::CharacterVaryingArray,
        Self::Cidr,
        Self::Circle,
        Self::Date,
        Self::DoublePrecision,
        Self::Inet,
        Self::Integer,
        Self::IntegerArray,
        Self::IntegerDoubleArray,
        Self::Array,
        Self::Interval,
        Self::Json,
        Self::Jsonb,
        Self::Line,
        Self::Lseg,
        Self::MacAddr,
        Self::MacAddr8,
        Self::Money,
        Self::Numeric,
        Self::Path,
        Self::PgLsn,
        Self::Point,
        Self::Polygon,
        Self::Real,
        Self::SmallInt,
        Self::SmallSerial,
        Self::Serial,
        Self::Text,
        Self::TextArray,
        Self::TextDoubleArray,
        Self::Time,
        Self::TimeTz,
        Self::Timestamp,
        Self::TimestampTz,
        Self::TsQuery,
        Self::TsVector,
        Self::TxidSnapshot,
        Self::Uuid,
        Self::UuidArray,
        Self::Xml,
        Self::Int4Range,
        Self::Int4MultiRange,
        Self::Int8Range,
        Self::Int8MultiRange,
        Self::NumRange,
        Self::NumMultiRange,
        Self::TsRange,
        Self::TsMultiRange,
        Self::TsTzRange,
        Self::TsTzMultiRange,
        Self::DateRange,
        Self::DateMultiRange,
        Self::CiText,
        Self::HStore,
    ];

    /// Returns the textual names of this type, canonical name first.
    #[must_use]
    pub const fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::BigInt => &["bigint", "int8"],
            Self::BigIntArray => &["bigint[]", "int8[]"],
            Self::BigSerial => &["bigserial", "serial8"],
            Self::Bit => &["bit"],
            Self::BitVarying => &["varbit", "bit varying"],
            Self::Boolean => &["boolean", "bool"],
            Self::Box => &["box"],
            Self::Bytea => &["bytea"],
            Self::Character => &["character", "char"],
            Self::CharacterArray => &["character[]", "char[]"],
            Self::CharacterVarying => &["varchar", "character varying"],
            Self::CharacterVaryingArray => &["varchar[]", "character varying[]"],
            Self::Cidr => &["cidr"],
            Self::Circle => &["circle"],
            Self::Date => &["date"],
            Self::DoublePrecision => &["float8", "double precision"],
            Self::Inet => &["inet"],
            Self::Integer => &["int", "int4", "integer"],
            Self::IntegerArray => &["int[]", "int4[]", "integer[]"],
            Self::IntegerDoubleArray => &["int[][]", "int4[][]", "integer[][]"],
            Self::Array => &["array"],
            Self::Interval => &["interval"],
            Self::Json => &["json"],
            Self::Jsonb => &["jsonb"],
            Self::Line => &["line"],
            Self::Lseg => &["lseg"],
            Self::MacAddr => &["macaddr"],
            Self::MacAddr8 => &["macaddr8"],
            Self::Money => &["money"],
            Self::Numeric => &["numeric", "decimal"],
            Self::Path => &["path"],
            Self::PgLsn => &["pg_lsn"],
            Self::Point => &["point"],
            Self::Polygon => &["polygon"],
            Self::Real => &["real", "float4"],
            Self::SmallInt => &["smallint", "int2"],
            Self::SmallSerial => &["smallserial", "serial2"],
            Self::Serial => &["serial", "serial4"],
            Self::Text => &["text"],
            Self::TextArray => &["text[]"],
            Self::TextDoubleArray => &["text[][]"],
            Self::Time => &["time", "time without time zone", "time(6) without time zone"],
            Self::TimeTz => &["timetz", "time with time zone", "time(6) with time zone"],
            Self::Timestamp => &[
                "timestamp",
                "timestamp without time zone",
                "timestamp(6) without time zone",
            ],
            Self::TimestampTz => &[
                "timestamptz",
                "timestamp with time zone",
                "timestamp(6) with time zone",
            ],
            Self::TsQuery => &["tsquery"],
            Self::TsVector => &["tsvector"],
            Self::TxidSnapshot => &["txid_snapshot"],
            Self::Uuid => &["uuid"],
            Self::UuidArray => &["uuid[]"],
            Self::Xml => &["xml"],
            Self::Int4Range => &["int4range"],
            Self::Int4MultiRange => &["int4multirange"],
            Self::Int8Range => &["int8range"],
            Self::Int8MultiRange => &["int8multirange"],
            Self::NumRange => &["numrange"],
            Self::NumMultiRange => &["nummultirange"],
            Self::TsRange => &["tsrange"],
            Self::TsMultiRange => &["tsmultirange"],
            Self::TsTzRange => &["tstzrange"],
            Self::TsTzMultiRange => &["tstzmultirange"],
            Self::DateRange => &["daterange"],
            Self::DateMultiRange => &["datemultirange"],
            Self::CiText => &["citext"],
            Self::HStore => &["hstore"],
        }
    }

    /// Returns the canonical name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.aliases()[0]
    }

    /// Returns true if `name` is one of this type's aliases.
    ///
    /// The generic name `array` matches every array type.
    #[must_use]
    pub fn matches(self, name: &str) -> bool {
        let name = normalize(name);
        if name == "array" {
            return self.is_array();
        }
        self.aliases().iter().any(|alias| *alias == name)
    }

    /// Returns true for array column types.
    #[must_use]
    pub const fn is_array(self) -> bool {
        matches!(
            self,
            Self::BigIntArray
                | Self::IntegerArray
                | Self::IntegerDoubleArray
                | Self::CharacterArray
                | Self::CharacterVaryingArray
                | Self::TextArray
                | Self::TextDoubleArray
                | Self::UuidArray
        )
    }

    /// Returns true for time of day and timestamp types.
    #[must_use]
    pub const fn is_time(self) -> bool {
        matches!(
            self,
            Self::Time | Self::TimeTz | Self::Timestamp | Self::TimestampTz
        )
    }

    /// Returns the host representation a value of this type decodes into by default.
    #[must_use]
    pub const fn default_host(self) -> Option<HostType> {
        let host = match self {
            Self::Text
            | Self::CharacterVarying
            | Self::Character
            | Self::CiText
            | Self::TsVector
            | Self::Xml => HostType::String,
            Self::Uuid => HostType::Uuid,
            Self::Bytea => HostType::Bytes,
            Self::SmallInt | Self::SmallSerial => HostType::I16,
            Self::Integer | Self::Serial => HostType::I32,
            Self::BigInt | Self::BigSerial => HostType::I64,
            Self::Real => HostType::F32,
            Self::DoublePrecision | Self::Numeric => HostType::F64,
            Self::Boolean => HostType::Bool,
            Self::Date => HostType::Date,
            Self::Timestamp | Self::TimestampTz => HostType::Timestamp,
            Self::Interval => HostType::Interval,
            Self::Json | Self::Jsonb => HostType::Json,
            Self::TextArray | Self::CharacterVaryingArray | Self::CharacterArray => {
                HostType::StringArray
            }
            Self::IntegerArray => HostType::I32Array,
            Self::BigIntArray => HostType::I64Array,
            Self::UuidArray => HostType::UuidArray,
            _ => return None,
        };
        Some(host)
    }

    /// Parses a type name as reported by the catalog or written in an annotation.
    ///
    /// Returns the type and its argument, e.g. `character varying(255)` gives
    /// `(CharacterVarying, Some("255"))`. Case and surrounding whitespace are ignored.
    #[must_use]
    pub fn parse(text: &str) -> Option<(Self, Option<String>)> {
        let normalized = normalize(text);
        if let Some(data_type) = Self::lookup(&normalized) {
            return Some((data_type, None));
        }

        let open = normalized.find('(')?;
        let close = open + normalized[open..].find(')')?;
        let argument = normalized[open + 1..close].trim().to_string();
        let stripped = format!(
            "{}{}",
            normalized[..open].trim_end(),
            &normalized[close + 1..]
        );
        let data_type = Self::lookup(&normalize(&stripped))?;
        let argument = (!argument.is_empty()).then_some(argument);
        Some((data_type, argument))
    }

    fn lookup(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.aliases().iter().any(|alias| *alias == name))
    }
}

/// Lowercases and collapses whitespace runs.
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a type name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown data type '{0}'")]
pub struct UnknownDataType(pub String);

impl FromStr for DataType {
    type Err = UnknownDataType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
            .map(|(data_type, _)| data_type)
            .ok_or_else(|| UnknownDataType(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_type_has_an_alias() {
        for data_type in DataType::ALL {
            assert!(!data_type.aliases().is_empty(), "{data_type:?}");
            assert_eq!(DataType::parse(data_type.name()), Some((*data_type, None)));
        }
    }

    #[test]
    fn test_parse_aliases_case_insensitive() {
        assert_eq!(DataType::parse("INT8"), Some((DataType::BigInt, None)));
        assert_eq!(DataType::parse("  Integer "), Some((DataType::Integer, None)));
        assert_eq!(
            DataType::parse("Timestamp   WITH time zone"),
            Some((DataType::TimestampTz, None))
        );
    }

    #[test]
    fn test_parse_with_argument() {
        assert_eq!(
            DataType::parse("character varying(255)"),
            Some((DataType::CharacterVarying, Some("255".to_string())))
        );
        assert_eq!(
            DataType::parse("varchar (32)"),
            Some((DataType::CharacterVarying, Some("32".to_string())))
        );
        assert_eq!(
            DataType::parse("numeric(10,2)"),
            Some((DataType::Numeric, Some("10,2".to_string())))
        );
        assert_eq!(
            DataType::parse("character varying(64)[]"),
            Some((DataType::CharacterVaryingArray, Some("64".to_string())))
        );
    }

    #[test]
    fn test_parse_precision_alias_kept_whole() {
        assert_eq!(
            DataType::parse("timestamp(6) without time zone"),
            Some((DataType::Timestamp, None))
        );
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(DataType::parse("geography"), None);
        assert_eq!(DataType::parse(""), None);
        assert!("nope".parse::<DataType>().is_err());
    }

    #[test]
    fn test_predicates() {
        assert!(DataType::UuidArray.is_array());
        assert!(!DataType::Uuid.is_array());
        assert!(DataType::TimestampTz.is_time());
        assert!(!DataType::Date.is_time());
        assert!(DataType::TextArray.matches("ARRAY"));
        assert!(DataType::CharacterVarying.matches("Character Varying"));
    }

    #[test]
    fn test_default_host() {
        assert_eq!(DataType::Uuid.default_host(), Some(HostType::Uuid));
        assert_eq!(DataType::CharacterVarying.default_host(), Some(HostType::String));
        assert_eq!(DataType::BigInt.default_host(), Some(HostType::I64));
        assert_eq!(DataType::Point.default_host(), None);
    }
}

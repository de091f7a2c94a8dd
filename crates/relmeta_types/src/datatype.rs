use std::fmt;

use serde::{Deserialize, Serialize};

/// Default scale used for decimals without explicit metadata.
pub const DECIMAL_DEFAULT_SCALE: i8 = 9;

/// Max precision of a 128-bit decimal.
pub const DECIMAL128_MAX_PRECISION: u8 = 38;

/// Metadata associated with decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecimalTypeMeta {
    pub precision: u8,
    pub scale: i8,
}

impl DecimalTypeMeta {
    pub const fn new(precision: u8, scale: i8) -> Self {
        DecimalTypeMeta { precision, scale }
    }
}

impl Default for DecimalTypeMeta {
    fn default() -> Self {
        DecimalTypeMeta {
            precision: DECIMAL128_MAX_PRECISION,
            scale: DECIMAL_DEFAULT_SCALE,
        }
    }
}

/// The value domain a type or scalar belongs to.
///
/// Values within the same domain are totally ordered with respect to each
/// other. Integers, decimals and floats all share the numeric domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScalarDomain {
    Null,
    Boolean,
    Numeric,
    Utf8,
    Binary,
    Date,
    Time,
    Timestamp,
}

/// Supported column types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Constant null columns.
    Null,
    Boolean,
    Int32,
    Int64,
    Float64,
    /// 128-bit decimal.
    Decimal128(DecimalTypeMeta),
    Utf8,
    Binary,
    /// Days since epoch.
    Date32,
    /// Microseconds since midnight.
    Time64,
    /// Microseconds since epoch.
    Timestamp,
}

impl DataType {
    /// Return if this datatype is null.
    pub const fn is_null(&self) -> bool {
        matches!(self, DataType::Null)
    }

    pub const fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Int32 | Self::Int64 | Self::Float64 | Self::Decimal128(_)
        )
    }

    pub const fn is_integer(&self) -> bool {
        matches!(self, Self::Int32 | Self::Int64)
    }

    pub const fn is_temporal(&self) -> bool {
        matches!(self, Self::Date32 | Self::Time64 | Self::Timestamp)
    }

    pub const fn domain(&self) -> ScalarDomain {
        match self {
            Self::Null => ScalarDomain::Null,
            Self::Boolean => ScalarDomain::Boolean,
            Self::Int32 | Self::Int64 | Self::Float64 | Self::Decimal128(_) => {
                ScalarDomain::Numeric
            }
            Self::Utf8 => ScalarDomain::Utf8,
            Self::Binary => ScalarDomain::Binary,
            Self::Date32 => ScalarDomain::Date,
            Self::Time64 => ScalarDomain::Time,
            Self::Timestamp => ScalarDomain::Timestamp,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Boolean => write!(f, "Boolean"),
            Self::Int32 => write!(f, "Int32"),
            Self::Int64 => write!(f, "Int64"),
            Self::Float64 => write!(f, "Float64"),
            Self::Decimal128(meta) => write!(f, "Decimal128({}, {})", meta.precision, meta.scale),
            Self::Utf8 => write!(f, "Utf8"),
            Self::Binary => write!(f, "Binary"),
            Self::Date32 => write!(f, "Date32"),
            Self::Time64 => write!(f, "Time64(μs)"),
            Self::Timestamp => write!(f, "Timestamp(μs)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_types_share_domain() {
        assert_eq!(DataType::Int32.domain(), DataType::Float64.domain());
        assert_eq!(
            DataType::Int64.domain(),
            DataType::Decimal128(DecimalTypeMeta::default()).domain()
        );
        assert_ne!(DataType::Date32.domain(), DataType::Timestamp.domain());
    }

    #[test]
    fn display_decimal() {
        let dt = DataType::Decimal128(DecimalTypeMeta::new(10, 2));
        assert_eq!("Decimal128(10, 2)", dt.to_string());
    }

    #[test]
    fn serde_roundtrip_decimal() {
        let dt = DataType::Decimal128(DecimalTypeMeta::new(12, 3));
        let s = serde_json::to_string(&dt).unwrap();
        let got: DataType = serde_json::from_str(&s).unwrap();
        assert_eq!(dt, got);
    }
}

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use relmeta_error::{RelmetaError, Result};
use serde::{Deserialize, Serialize};

use crate::datatype::{DataType, DecimalTypeMeta, ScalarDomain};
use crate::parse::{
    date_to_days, days_to_date, micros_to_time, time_to_micros, BoolParser, Date32Parser,
    Decimal128Parser, Float64Parser, Int32Parser, Int64Parser, Parser, Time64Parser,
    TimestampParser,
};

/// A decimal value with its precision and scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecimalScalar {
    pub precision: u8,
    pub scale: i8,
    pub value: i128,
}

impl DecimalScalar {
    pub fn to_f64(&self) -> f64 {
        self.value as f64 / 10f64.powi(self.scale as i32)
    }

    /// Rescale the unscaled value to `scale`, returning None on overflow or if
    /// precision would be lost.
    fn rescaled(&self, scale: i8) -> Option<i128> {
        match scale.cmp(&self.scale) {
            Ordering::Equal => Some(self.value),
            Ordering::Greater => {
                let exp = (scale as i32 - self.scale as i32) as u32;
                self.value.checked_mul(10i128.checked_pow(exp)?)
            }
            Ordering::Less => None,
        }
    }
}

/// A single scalar value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScalarValue<'a> {
    /// Represents `DataType::Null` (castable to/from any other type)
    Null,

    /// True or false value
    Boolean(bool),

    /// Signed 32bit int
    Int32(i32),

    /// Signed 64bit int
    Int64(i64),

    /// 64bit float
    Float64(f64),

    /// 128bit decimal
    Decimal128(DecimalScalar),

    /// Utf-8 encoded string.
    Utf8(Cow<'a, str>),

    /// Binary
    Binary(Cow<'a, [u8]>),

    /// Days since epoch.
    Date32(i32),

    /// Microseconds since midnight.
    Time64(i64),

    /// Microseconds since epoch.
    Timestamp(i64),
}

pub type OwnedScalarValue = ScalarValue<'static>;

impl<'a> ScalarValue<'a> {
    pub fn into_owned(self) -> OwnedScalarValue {
        match self {
            Self::Null => OwnedScalarValue::Null,
            Self::Boolean(v) => OwnedScalarValue::Boolean(v),
            Self::Int32(v) => OwnedScalarValue::Int32(v),
            Self::Int64(v) => OwnedScalarValue::Int64(v),
            Self::Float64(v) => OwnedScalarValue::Float64(v),
            Self::Decimal128(v) => OwnedScalarValue::Decimal128(v),
            Self::Utf8(v) => OwnedScalarValue::Utf8(v.into_owned().into()),
            Self::Binary(v) => OwnedScalarValue::Binary(v.into_owned().into()),
            Self::Date32(v) => OwnedScalarValue::Date32(v),
            Self::Time64(v) => OwnedScalarValue::Time64(v),
            Self::Timestamp(v) => OwnedScalarValue::Timestamp(v),
        }
    }

    pub fn datatype(&self) -> DataType {
        match self {
            Self::Null => DataType::Null,
            Self::Boolean(_) => DataType::Boolean,
            Self::Int32(_) => DataType::Int32,
            Self::Int64(_) => DataType::Int64,
            Self::Float64(_) => DataType::Float64,
            Self::Decimal128(v) => DataType::Decimal128(DecimalTypeMeta::new(v.precision, v.scale)),
            Self::Utf8(_) => DataType::Utf8,
            Self::Binary(_) => DataType::Binary,
            Self::Date32(_) => DataType::Date32,
            Self::Time64(_) => DataType::Time64,
            Self::Timestamp(_) => DataType::Timestamp,
        }
    }

    pub fn domain(&self) -> ScalarDomain {
        self.datatype().domain()
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Check if this value can be compared against values of the given type.
    ///
    /// Nulls are comparable against everything.
    pub fn is_comparable_to(&self, datatype: &DataType) -> bool {
        self.is_null() || datatype.is_null() || self.domain() == datatype.domain()
    }

    /// Get the value as a float if it's numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int32(v) => Some(*v as f64),
            Self::Int64(v) => Some(*v as f64),
            Self::Float64(v) => Some(*v),
            Self::Decimal128(v) => Some(v.to_f64()),
            _ => None,
        }
    }

    /// Compare two values.
    ///
    /// Null sorts before every other value. Numeric values compare across
    /// integer, decimal and float representations. Returns None if the values
    /// belong to different domains.
    pub fn compare(&self, other: &ScalarValue) -> Option<Ordering> {
        match (self, other) {
            (Self::Null, ScalarValue::Null) => Some(Ordering::Equal),
            (Self::Null, _) => Some(Ordering::Less),
            (_, ScalarValue::Null) => Some(Ordering::Greater),
            (Self::Boolean(a), ScalarValue::Boolean(b)) => Some(a.cmp(b)),
            (Self::Utf8(a), ScalarValue::Utf8(b)) => Some(a.as_ref().cmp(b.as_ref())),
            (Self::Binary(a), ScalarValue::Binary(b)) => Some(a.as_ref().cmp(b.as_ref())),
            (Self::Date32(a), ScalarValue::Date32(b)) => Some(a.cmp(b)),
            (Self::Time64(a), ScalarValue::Time64(b)) => Some(a.cmp(b)),
            (Self::Timestamp(a), ScalarValue::Timestamp(b)) => Some(a.cmp(b)),
            (a, b) => compare_numeric(a, b),
        }
    }

    /// A total order across all values.
    ///
    /// Values from different domains are ordered by domain. Used where a
    /// deterministic order is needed even for incomparable values.
    pub fn total_cmp(&self, other: &ScalarValue) -> Ordering {
        self.compare(other)
            .unwrap_or_else(|| self.domain().cmp(&other.domain()))
    }

    /// Parse a string as a value of the given type.
    pub fn parse_as(datatype: &DataType, s: &str) -> Result<OwnedScalarValue> {
        let parsed = match datatype {
            DataType::Null => Some(ScalarValue::Null),
            DataType::Boolean => BoolParser.parse(s).map(ScalarValue::Boolean),
            DataType::Int32 => Int32Parser::default().parse(s).map(ScalarValue::Int32),
            DataType::Int64 => Int64Parser::default().parse(s).map(ScalarValue::Int64),
            DataType::Float64 => Float64Parser::default().parse(s).map(ScalarValue::Float64),
            DataType::Decimal128(meta) => Decimal128Parser::new(meta.precision, meta.scale)
                .parse(s)
                .map(|value| {
                    ScalarValue::Decimal128(DecimalScalar {
                        precision: meta.precision,
                        scale: meta.scale,
                        value,
                    })
                }),
            DataType::Utf8 => Some(ScalarValue::Utf8(s.to_string().into())),
            DataType::Binary => Some(ScalarValue::Binary(s.as_bytes().to_vec().into())),
            DataType::Date32 => Date32Parser.parse(s).map(ScalarValue::Date32),
            DataType::Time64 => Time64Parser.parse(s).map(ScalarValue::Time64),
            DataType::Timestamp => TimestampParser.parse(s).map(ScalarValue::Timestamp),
        };

        parsed.ok_or_else(|| RelmetaError::new(format!("Failed to parse '{s}' as {datatype}")))
    }

    pub fn from_naive_date(date: NaiveDate) -> OwnedScalarValue {
        ScalarValue::Date32(date_to_days(date))
    }

    pub fn from_naive_time(time: NaiveTime) -> OwnedScalarValue {
        ScalarValue::Time64(time_to_micros(time))
    }

    pub fn from_naive_datetime(datetime: NaiveDateTime) -> OwnedScalarValue {
        ScalarValue::Timestamp(datetime.and_utc().timestamp_micros())
    }
}

fn compare_numeric(a: &ScalarValue, b: &ScalarValue) -> Option<Ordering> {
    fn as_i64(v: &ScalarValue) -> Option<i64> {
        match v {
            ScalarValue::Int32(v) => Some(*v as i64),
            ScalarValue::Int64(v) => Some(*v),
            _ => None,
        }
    }

    if let (Some(a), Some(b)) = (as_i64(a), as_i64(b)) {
        return Some(a.cmp(&b));
    }

    // Exact decimal comparisons when both sides can be brought to a common
    // scale.
    let as_decimal = |v: &ScalarValue| match v {
        ScalarValue::Decimal128(d) => Some(*d),
        other => as_i64(other).map(|v| DecimalScalar {
            precision: 19,
            scale: 0,
            value: v as i128,
        }),
    };
    if let (Some(da), Some(db)) = (as_decimal(a), as_decimal(b)) {
        let scale = da.scale.max(db.scale);
        if let (Some(va), Some(vb)) = (da.rescaled(scale), db.rescaled(scale)) {
            return Some(va.cmp(&vb));
        }
    }

    let a = a.as_f64()?;
    let b = b.as_f64()?;
    Some(a.total_cmp(&b))
}

impl fmt::Display for ScalarValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Decimal128(v) => {
                if v.scale <= 0 {
                    return write!(f, "{}", v.value * 10i128.pow(v.scale.unsigned_abs() as u32));
                }
                let pow = 10i128.pow(v.scale as u32);
                let sign = if v.value < 0 { "-" } else { "" };
                let abs = v.value.unsigned_abs();
                write!(
                    f,
                    "{sign}{}.{:0width$}",
                    abs / pow as u128,
                    abs % pow as u128,
                    width = v.scale as usize
                )
            }
            Self::Utf8(v) => write!(f, "'{v}'"),
            Self::Binary(v) => {
                write!(f, "\\x")?;
                for b in v.iter() {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
            Self::Date32(v) => match days_to_date(*v) {
                Some(date) => write!(f, "{date}"),
                None => write!(f, "Date32({v})"),
            },
            Self::Time64(v) => match micros_to_time(*v) {
                Some(time) => write!(f, "{time}"),
                None => write!(f, "Time64({v})"),
            },
            Self::Timestamp(v) => match DateTime::from_timestamp_micros(*v) {
                Some(ts) => write!(f, "{}", ts.naive_utc()),
                None => write!(f, "Timestamp({v})"),
            },
        }
    }
}

impl From<bool> for OwnedScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Boolean(value)
    }
}

impl From<i32> for OwnedScalarValue {
    fn from(value: i32) -> Self {
        ScalarValue::Int32(value)
    }
}

impl From<i64> for OwnedScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Int64(value)
    }
}

impl From<f64> for OwnedScalarValue {
    fn from(value: f64) -> Self {
        ScalarValue::Float64(value)
    }
}

impl From<&str> for OwnedScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::Utf8(Cow::Owned(value.to_string()))
    }
}

impl From<String> for OwnedScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::Utf8(Cow::Owned(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(value: i128, scale: i8) -> OwnedScalarValue {
        ScalarValue::Decimal128(DecimalScalar {
            precision: 20,
            scale,
            value,
        })
    }

    #[test]
    fn null_sorts_lowest() {
        assert_eq!(
            Some(Ordering::Less),
            ScalarValue::Null.compare(&ScalarValue::Int64(i64::MIN))
        );
        assert_eq!(
            Some(Ordering::Greater),
            ScalarValue::from("").compare(&ScalarValue::Null)
        );
        assert_eq!(
            Some(Ordering::Equal),
            ScalarValue::Null.compare(&ScalarValue::Null)
        );
    }

    #[test]
    fn numeric_cross_type() {
        assert_eq!(
            Some(Ordering::Equal),
            ScalarValue::Int32(10).compare(&ScalarValue::Int64(10))
        );
        assert_eq!(Some(Ordering::Less), ScalarValue::Int32(10).compare(&dec(1001, 2)));
        assert_eq!(Some(Ordering::Equal), dec(1000, 2).compare(&dec(100, 1)));
        assert_eq!(
            Some(Ordering::Greater),
            ScalarValue::Float64(10.5).compare(&ScalarValue::Int64(10))
        );
        assert_eq!(Some(Ordering::Less), dec(-5, 1).compare(&ScalarValue::Float64(0.0)));
    }

    #[test]
    fn incomparable_domains() {
        assert_eq!(None, ScalarValue::Int32(1).compare(&ScalarValue::from("1")));
        assert_eq!(
            None,
            ScalarValue::Date32(1).compare(&ScalarValue::Timestamp(1))
        );
        // Still has a deterministic total order.
        assert_eq!(
            Ordering::Less,
            ScalarValue::Int32(1).total_cmp(&ScalarValue::from("1"))
        );
    }

    #[test]
    fn parse_as_types() {
        assert_eq!(
            ScalarValue::Int32(10),
            ScalarValue::parse_as(&DataType::Int32, "010").unwrap()
        );
        assert_eq!(
            ScalarValue::from("ABBY"),
            ScalarValue::parse_as(&DataType::Utf8, "ABBY").unwrap()
        );
        assert_eq!(
            ScalarValue::Date32(8319),
            ScalarValue::parse_as(&DataType::Date32, "1992-10-11").unwrap()
        );
        assert_eq!(
            dec(1234, 2),
            ScalarValue::parse_as(&DataType::Decimal128(DecimalTypeMeta::new(20, 2)), "12.34")
                .unwrap()
        );
        assert!(ScalarValue::parse_as(&DataType::Int64, "abc").is_err());
    }

    #[test]
    fn chrono_constructors() {
        let date = NaiveDate::from_ymd_opt(1992, 10, 11).unwrap();
        assert_eq!(ScalarValue::Date32(8319), ScalarValue::from_naive_date(date));
        assert_eq!("1992-10-11", ScalarValue::from_naive_date(date).to_string());

        let time = NaiveTime::from_hms_opt(0, 0, 1).unwrap();
        assert_eq!(ScalarValue::Time64(1_000_000), ScalarValue::from_naive_time(time));

        let ts = date.and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(
            ScalarValue::Timestamp(8319 * 86400 * 1_000_000),
            ScalarValue::from_naive_datetime(ts)
        );
    }

    #[test]
    fn display_values() {
        assert_eq!("12.34", dec(1234, 2).to_string());
        assert_eq!("-0.05", dec(-5, 2).to_string());
        assert_eq!("'abc'", ScalarValue::from("abc").to_string());
        assert_eq!("NULL", ScalarValue::Null.to_string());
    }
}

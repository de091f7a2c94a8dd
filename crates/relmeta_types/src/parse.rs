//! Parsing strings into typed scalar representations.
//!
//! Histogram boundaries arrive from the statistics producer as text and are
//! parsed according to the column type.
use std::marker::PhantomData;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use num::PrimInt;

pub const EPOCH_NAIVE_DATE: NaiveDate = match NaiveDate::from_ymd_opt(1970, 1, 1) {
    Some(date) => date,
    _ => unreachable!(),
};

pub const EPOCH_DAYS_FROM_CE: i32 = 719163;

pub const MICROSECONDS_IN_SECOND: i64 = 1_000_000;

/// Logic for parsing a string into some type.
pub trait Parser {
    /// The type we'll be producing.
    type Type;

    /// Parse a string into `Type`, returning None if the parse cannot be done.
    fn parse(&mut self, s: &str) -> Option<Self::Type>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoolParser;

impl Parser for BoolParser {
    type Type = bool;
    fn parse(&mut self, s: &str) -> Option<Self::Type> {
        match s {
            "t" | "true" | "TRUE" | "T" => Some(true),
            "f" | "false" | "FALSE" | "F" => Some(false),
            _ => None,
        }
    }
}

/// Parser that uses the stdlib `FromStr` trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FromStrParser<T: FromStr> {
    _type: PhantomData<T>,
}

impl<T: FromStr> Parser for FromStrParser<T> {
    type Type = T;
    fn parse(&mut self, s: &str) -> Option<Self::Type> {
        T::from_str(s.trim()).ok()
    }
}

pub type Int32Parser = FromStrParser<i32>;
pub type Int64Parser = FromStrParser<i64>;
pub type Float64Parser = FromStrParser<f64>;

/// Parse a string date into a number of days since epoch.
///
/// Example formats:
///
/// '1992-10-11'
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Date32Parser;

impl Parser for Date32Parser {
    type Type = i32;
    fn parse(&mut self, s: &str) -> Option<Self::Type> {
        let date = NaiveDate::from_str(s.trim()).ok()?;
        Some(date_to_days(date))
    }
}

/// Parse a time of day into microseconds since midnight.
///
/// '10:15:30', '10:15:30.250'
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Time64Parser;

impl Parser for Time64Parser {
    type Type = i64;
    fn parse(&mut self, s: &str) -> Option<Self::Type> {
        let time = NaiveTime::from_str(s.trim()).ok()?;
        Some(time_to_micros(time))
    }
}

/// Parse a timestamp into microseconds since epoch.
///
/// Accepts both '1992-10-11T10:15:30' and '1992-10-11 10:15:30'.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampParser;

impl Parser for TimestampParser {
    type Type = i64;
    fn parse(&mut self, s: &str) -> Option<Self::Type> {
        let s = s.trim();
        let datetime = NaiveDateTime::from_str(s)
            .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()?;
        Some(datetime.and_utc().timestamp_micros())
    }
}

pub fn date_to_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - EPOCH_DAYS_FROM_CE
}

pub fn days_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(EPOCH_DAYS_FROM_CE)?)
}

pub fn time_to_micros(time: NaiveTime) -> i64 {
    time.num_seconds_from_midnight() as i64 * MICROSECONDS_IN_SECOND
        + (time.nanosecond() / 1000) as i64
}

pub fn micros_to_time(micros: i64) -> Option<NaiveTime> {
    let secs = micros.div_euclid(MICROSECONDS_IN_SECOND);
    let nanos = micros.rem_euclid(MICROSECONDS_IN_SECOND) * 1000;
    NaiveTime::from_num_seconds_from_midnight_opt(u32::try_from(secs).ok()?, nanos as u32)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecimalParser<T: PrimInt> {
    precision: u8,
    scale: i8,
    _type: PhantomData<T>,
}

pub type Decimal128Parser = DecimalParser<i128>;

impl<T: PrimInt> DecimalParser<T> {
    pub fn new(precision: u8, scale: i8) -> Self {
        DecimalParser {
            precision,
            scale,
            _type: PhantomData,
        }
    }
}

impl<T: PrimInt> Parser for DecimalParser<T> {
    type Type = T;
    fn parse(&mut self, s: &str) -> Option<Self::Type> {
        let bs = s.trim().as_bytes();
        let (neg, bs) = match bs.first() {
            Some(b'-') => (true, &bs[1..]),
            Some(b'+') => (false, &bs[1..]),
            _ => (false, bs),
        };

        let mut val = T::zero();
        let mut digits: u8 = 0; // Total number of digits.
        let mut decimals: i8 = 0; // Digits to right of decimal point.

        let ten = T::from(10)?;

        let mut iter = bs.iter();

        // Leading digits.
        for b in iter.by_ref() {
            match b {
                b'0'..=b'9' => {
                    // Leading zero.
                    if digits == 0 && *b == b'0' {
                        continue;
                    }
                    digits += 1;
                    val = val.checked_mul(&ten)?;
                    val = val.checked_add(&T::from(b - b'0')?)?;
                }
                b'.' => {
                    break;
                }
                _ => return None,
            }
        }

        // Digits after decimal.
        for b in iter {
            match b {
                b'0'..=b'9' => {
                    if decimals == self.scale {
                        continue;
                    }

                    decimals += 1;
                    digits += 1;
                    val = val.checked_mul(&ten)?;
                    val = val.checked_add(&T::from(b - b'0')?)?;
                }
                _ => return None,
            }
        }

        if self.scale < 0 {
            digits = digits.checked_sub(self.scale.unsigned_abs())?;
            let exp = self.scale.unsigned_abs() as u32;
            val = val.div(ten.pow(exp));
        }

        if digits > self.precision {
            return None;
        }

        if decimals < self.scale {
            let exp = (self.scale - decimals) as u32;
            val = val.checked_mul(&ten.pow(exp))?;
        }

        if neg {
            val = T::zero().checked_sub(&val)?;
        }

        Some(val)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_days() {
        assert_eq!(EPOCH_DAYS_FROM_CE, EPOCH_NAIVE_DATE.num_days_from_ce());
    }

    #[test]
    fn test_parse_date32() {
        assert_eq!(8319, Date32Parser.parse("1992-10-11").unwrap());
        assert_eq!(-1, Date32Parser.parse("1969-12-31").unwrap());
        assert_eq!(None, Date32Parser.parse("1992-13-11"));
    }

    #[test]
    fn test_parse_time64() {
        assert_eq!(
            (10 * 3600 + 15 * 60 + 30) * MICROSECONDS_IN_SECOND + 250_000,
            Time64Parser.parse("10:15:30.250").unwrap()
        );
    }

    #[test]
    fn test_parse_timestamp() {
        let a = TimestampParser.parse("1970-01-02T00:00:01").unwrap();
        let b = TimestampParser.parse("1970-01-02 00:00:01").unwrap();
        assert_eq!((86400 + 1) * MICROSECONDS_IN_SECOND, a);
        assert_eq!(a, b);
    }

    #[test]
    fn time_roundtrip() {
        let micros = Time64Parser.parse("23:59:59.999999").unwrap();
        let time = micros_to_time(micros).unwrap();
        assert_eq!(micros, time_to_micros(time));
    }

    #[test]
    fn parse_decimal() {
        // Can parse
        assert_eq!(123, Decimal128Parser::new(5, 1).parse("12.3").unwrap());
        assert_eq!(12, Decimal128Parser::new(5, 0).parse("12.3").unwrap());
        assert_eq!(1230, Decimal128Parser::new(5, 1).parse("123").unwrap());
        assert_eq!(-1230, Decimal128Parser::new(5, 1).parse("-123").unwrap());
        assert_eq!(1230, Decimal128Parser::new(5, 2).parse("12.3").unwrap());
        assert_eq!(123, Decimal128Parser::new(5, -2).parse("12300").unwrap());

        // Can't parse
        assert_eq!(None, Decimal128Parser::new(5, 1).parse("1four2.3"));
        assert_eq!(None, Decimal128Parser::new(3, 1).parse("123.4"));
    }
}

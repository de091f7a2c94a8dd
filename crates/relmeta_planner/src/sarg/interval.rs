use std::cmp::Ordering;
use std::fmt;
use std::ops::Bound;

use relmeta_types::scalar::{OwnedScalarValue, ScalarValue};

/// A contiguous range of values of one column.
///
/// Null is treated as the lowest value of every domain. Range comparisons
/// (`<`, `>` ...) never match nulls, so their intervals start just above
/// null instead of at an unbounded low end.
#[derive(Debug, Clone, PartialEq)]
pub struct Interval {
    pub low: Bound<OwnedScalarValue>,
    pub high: Bound<OwnedScalarValue>,
}

impl Interval {
    pub const fn new(low: Bound<OwnedScalarValue>, high: Bound<OwnedScalarValue>) -> Self {
        Interval { low, high }
    }

    /// Every value including null.
    pub const fn all() -> Self {
        Interval::new(Bound::Unbounded, Bound::Unbounded)
    }

    /// Every non-null value.
    pub const fn non_null() -> Self {
        Interval::new(Bound::Excluded(ScalarValue::Null), Bound::Unbounded)
    }

    /// Exactly one value, `[v, v]`.
    pub fn point(value: OwnedScalarValue) -> Self {
        Interval::new(Bound::Included(value.clone()), Bound::Included(value))
    }

    /// Values less than `v`.
    pub const fn lt(value: OwnedScalarValue) -> Self {
        Interval::new(Bound::Excluded(ScalarValue::Null), Bound::Excluded(value))
    }

    /// Values less than or equal to `v`.
    pub const fn le(value: OwnedScalarValue) -> Self {
        Interval::new(Bound::Excluded(ScalarValue::Null), Bound::Included(value))
    }

    /// Values greater than `v`.
    pub const fn gt(value: OwnedScalarValue) -> Self {
        Interval::new(Bound::Excluded(value), Bound::Unbounded)
    }

    /// Values greater than or equal to `v`.
    pub const fn ge(value: OwnedScalarValue) -> Self {
        Interval::new(Bound::Included(value), Bound::Unbounded)
    }

    pub fn is_point(&self) -> bool {
        match (&self.low, &self.high) {
            (Bound::Included(low), Bound::Included(high)) => low.total_cmp(high).is_eq(),
            _ => false,
        }
    }

    /// Check if this interval is a point on null (`IS NULL`).
    pub fn is_null_point(&self) -> bool {
        self.is_point() && matches!(&self.low, Bound::Included(ScalarValue::Null))
    }

    pub fn is_empty(&self) -> bool {
        match (&self.low, &self.high) {
            (Bound::Unbounded, _) | (_, Bound::Unbounded) => false,
            (Bound::Included(low), Bound::Included(high)) => low.total_cmp(high).is_gt(),
            (Bound::Included(low), Bound::Excluded(high))
            | (Bound::Excluded(low), Bound::Included(high))
            | (Bound::Excluded(low), Bound::Excluded(high)) => !low.total_cmp(high).is_lt(),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!((&self.low, &self.high), (Bound::Unbounded, Bound::Unbounded))
    }

    /// Intersection of two intervals. May be empty.
    pub fn intersect(&self, other: &Interval) -> Interval {
        let low = match cmp_low(&self.low, &other.low) {
            Ordering::Less => other.low.clone(),
            _ => self.low.clone(),
        };
        let high = match cmp_high(&self.high, &other.high) {
            Ordering::Greater => other.high.clone(),
            _ => self.high.clone(),
        };
        Interval::new(low, high)
    }

    /// Check if `other` starts at or before the point where this interval
    /// ends, such that the two can be merged into one contiguous interval.
    ///
    /// Assumes `self.low <= other.low`.
    pub(crate) fn touches(&self, other: &Interval) -> bool {
        match (&self.high, &other.low) {
            (Bound::Unbounded, _) | (_, Bound::Unbounded) => true,
            (Bound::Included(high), Bound::Included(low))
            | (Bound::Included(high), Bound::Excluded(low))
            | (Bound::Excluded(high), Bound::Included(low)) => !high.total_cmp(low).is_lt(),
            (Bound::Excluded(high), Bound::Excluded(low)) => high.total_cmp(low).is_gt(),
        }
    }
}

/// Order two lower bounds by the smallest value they admit.
pub(crate) fn cmp_low(a: &Bound<OwnedScalarValue>, b: &Bound<OwnedScalarValue>) -> Ordering {
    match (a, b) {
        (Bound::Unbounded, Bound::Unbounded) => Ordering::Equal,
        (Bound::Unbounded, _) => Ordering::Less,
        (_, Bound::Unbounded) => Ordering::Greater,
        (Bound::Included(a), Bound::Included(b)) | (Bound::Excluded(a), Bound::Excluded(b)) => {
            a.total_cmp(b)
        }
        (Bound::Included(a), Bound::Excluded(b)) => a.total_cmp(b).then(Ordering::Less),
        (Bound::Excluded(a), Bound::Included(b)) => a.total_cmp(b).then(Ordering::Greater),
    }
}

/// Order two upper bounds by the largest value they admit.
pub(crate) fn cmp_high(a: &Bound<OwnedScalarValue>, b: &Bound<OwnedScalarValue>) -> Ordering {
    match (a, b) {
        (Bound::Unbounded, Bound::Unbounded) => Ordering::Equal,
        (Bound::Unbounded, _) => Ordering::Greater,
        (_, Bound::Unbounded) => Ordering::Less,
        (Bound::Included(a), Bound::Included(b)) | (Bound::Excluded(a), Bound::Excluded(b)) => {
            a.total_cmp(b)
        }
        (Bound::Included(a), Bound::Excluded(b)) => a.total_cmp(b).then(Ordering::Greater),
        (Bound::Excluded(a), Bound::Included(b)) => a.total_cmp(b).then(Ordering::Less),
    }
}

/// Flip a bound from one side of a boundary value to the other, e.g. the
/// high bound `< 5` becomes the low bound `>= 5`.
pub(crate) fn flip_bound(bound: &Bound<OwnedScalarValue>) -> Bound<OwnedScalarValue> {
    match bound {
        Bound::Included(v) => Bound::Excluded(v.clone()),
        Bound::Excluded(v) => Bound::Included(v.clone()),
        Bound::Unbounded => Bound::Unbounded,
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.low {
            Bound::Unbounded => write!(f, "(-inf")?,
            Bound::Included(v) => write!(f, "[{v}")?,
            Bound::Excluded(v) => write!(f, "({v}")?,
        }
        match &self.high {
            Bound::Unbounded => write!(f, ", +inf)"),
            Bound::Included(v) => write!(f, ", {v}]"),
            Bound::Excluded(v) => write!(f, ", {v})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(i: i32) -> OwnedScalarValue {
        ScalarValue::Int32(i)
    }

    #[test]
    fn emptiness() {
        assert!(!Interval::point(v(3)).is_empty());
        assert!(Interval::new(Bound::Included(v(3)), Bound::Excluded(v(3))).is_empty());
        assert!(Interval::new(Bound::Included(v(4)), Bound::Included(v(3))).is_empty());
        assert!(!Interval::lt(v(0)).is_empty());
        assert!(Interval::lt(ScalarValue::Null).is_empty());
    }

    #[test]
    fn intersect_ranges() {
        let got = Interval::ge(v(3)).intersect(&Interval::lt(v(10)));
        assert_eq!(
            Interval::new(Bound::Included(v(3)), Bound::Excluded(v(10))),
            got
        );

        let got = Interval::gt(v(3)).intersect(&Interval::ge(v(3)));
        assert_eq!(Interval::gt(v(3)), got);

        assert!(Interval::lt(v(3)).intersect(&Interval::gt(v(5))).is_empty());
    }

    #[test]
    fn touching() {
        let a = Interval::new(Bound::Included(v(1)), Bound::Excluded(v(5)));
        let b = Interval::new(Bound::Included(v(5)), Bound::Included(v(9)));
        let c = Interval::new(Bound::Excluded(v(5)), Bound::Included(v(9)));
        assert!(a.touches(&b));
        assert!(!a.touches(&c));
    }

    #[test]
    fn point_and_null_point() {
        assert!(Interval::point(v(1)).is_point());
        assert!(!Interval::point(v(1)).is_null_point());
        assert!(Interval::point(ScalarValue::Null).is_null_point());
        assert!(!Interval::le(v(1)).is_point());
    }

    #[test]
    fn display() {
        assert_eq!("(NULL, 5)", Interval::lt(v(5)).to_string());
        assert_eq!("[7, 7]", Interval::point(v(7)).to_string());
        assert_eq!("('A', +inf)", Interval::gt("A".into()).to_string());
        assert_eq!("(-inf, +inf)", Interval::all().to_string());
    }
}

use std::fmt;
use std::ops::Bound;

use fmtutil::IntoDisplayableSlice;

use super::interval::{cmp_high, cmp_low, flip_bound, Interval};

/// A normalized union of intervals over one column.
///
/// Intervals are sorted by their low bound, non-empty, and no two intervals
/// overlap or touch. Normalizing on construction means two sequences
/// describing the same set of values compare equal regardless of how they
/// were built.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IntervalSequence {
    intervals: Vec<Interval>,
}

impl IntervalSequence {
    pub fn new(intervals: impl IntoIterator<Item = Interval>) -> Self {
        let mut intervals: Vec<_> = intervals.into_iter().filter(|i| !i.is_empty()).collect();
        intervals.sort_by(|a, b| cmp_low(&a.low, &b.low));

        let mut normalized: Vec<Interval> = Vec::with_capacity(intervals.len());
        for interval in intervals {
            match normalized.last_mut() {
                Some(last) if last.touches(&interval) => {
                    if cmp_high(&interval.high, &last.high).is_gt() {
                        last.high = interval.high;
                    }
                }
                _ => normalized.push(interval),
            }
        }

        IntervalSequence {
            intervals: normalized,
        }
    }

    /// Sequence matching nothing.
    pub const fn empty() -> Self {
        IntervalSequence {
            intervals: Vec::new(),
        }
    }

    /// Sequence matching every value including null.
    pub fn full() -> Self {
        Self::single(Interval::all())
    }

    pub fn single(interval: Interval) -> Self {
        Self::new([interval])
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.intervals.len() == 1 && self.intervals[0].is_all()
    }

    /// Check if every interval is a single point.
    pub fn is_points_only(&self) -> bool {
        self.intervals.iter().all(|i| i.is_point())
    }

    pub fn union(&self, other: &IntervalSequence) -> IntervalSequence {
        Self::new(self.intervals.iter().chain(other.intervals.iter()).cloned())
    }

    pub fn intersect(&self, other: &IntervalSequence) -> IntervalSequence {
        Self::new(
            self.intervals
                .iter()
                .flat_map(|a| other.intervals.iter().map(move |b| a.intersect(b))),
        )
    }

    /// Every value (including null) not matched by this sequence.
    pub fn complement(&self) -> IntervalSequence {
        let mut gaps = Vec::with_capacity(self.intervals.len() + 1);
        let mut cursor = Some(Bound::Unbounded);

        for interval in &self.intervals {
            let low = match cursor.take() {
                Some(low) => low,
                None => break,
            };
            if !matches!(interval.low, Bound::Unbounded) {
                gaps.push(Interval::new(low, flip_bound(&interval.low)));
            }
            cursor = match &interval.high {
                Bound::Unbounded => None,
                high => Some(flip_bound(high)),
            };
        }

        if let Some(low) = cursor {
            gaps.push(Interval::new(low, Bound::Unbounded));
        }

        Self::new(gaps)
    }
}

impl From<Interval> for IntervalSequence {
    fn from(interval: Interval) -> Self {
        Self::single(interval)
    }
}

impl fmt::Display for IntervalSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.intervals.display_as_set())
    }
}

#[cfg(test)]
mod tests {
    use relmeta_types::scalar::{OwnedScalarValue, ScalarValue};

    use super::*;

    fn v(i: i32) -> OwnedScalarValue {
        ScalarValue::Int32(i)
    }

    #[test]
    fn normalizes_overlapping_and_touching() {
        let seq = IntervalSequence::new([
            Interval::point(v(7)),
            Interval::lt(v(5)),
            Interval::new(Bound::Included(v(5)), Bound::Excluded(v(6))),
            Interval::point(v(7)),
        ]);

        let expected = IntervalSequence::new([
            Interval::new(Bound::Excluded(ScalarValue::Null), Bound::Excluded(v(6))),
            Interval::point(v(7)),
        ]);
        assert_eq!(expected, seq);
        assert_eq!(2, seq.intervals().len());
    }

    #[test]
    fn union_is_order_independent() {
        let a = IntervalSequence::single(Interval::point(v(7)));
        let b = IntervalSequence::single(Interval::lt(v(5)));
        let c = IntervalSequence::single(Interval::ge(v(100)));

        assert_eq!(a.union(&b).union(&c), c.union(&a).union(&b));
        assert_eq!(a.union(&b), b.union(&a));
    }

    #[test]
    fn intersect_sequences() {
        let a = IntervalSequence::new([Interval::lt(v(5)), Interval::gt(v(10))]);
        let b = IntervalSequence::single(Interval::new(
            Bound::Included(v(3)),
            Bound::Included(v(12)),
        ));

        let expected = IntervalSequence::new([
            Interval::new(Bound::Included(v(3)), Bound::Excluded(v(5))),
            Interval::new(Bound::Excluded(v(10)), Bound::Included(v(12))),
        ]);
        assert_eq!(expected, a.intersect(&b));

        assert!(IntervalSequence::single(Interval::point(v(1)))
            .intersect(&IntervalSequence::single(Interval::point(v(2))))
            .is_empty());
    }

    #[test]
    fn complement_point() {
        let got = IntervalSequence::single(Interval::point(v(7))).complement();
        let expected = IntervalSequence::new([
            Interval::new(Bound::Unbounded, Bound::Excluded(v(7))),
            Interval::gt(v(7)),
        ]);
        assert_eq!(expected, got);
    }

    #[test]
    fn complement_round_trip() {
        let seq = IntervalSequence::new([Interval::lt(v(5)), Interval::point(v(7))]);
        assert_eq!(seq, seq.complement().complement());

        assert!(IntervalSequence::full().complement().is_empty());
        assert!(IntervalSequence::empty().complement().is_full());
    }

    #[test]
    fn display() {
        let seq = IntervalSequence::new([Interval::lt(v(5)), Interval::point(v(7))]);
        assert_eq!("{(NULL, 5), [7, 7]}", seq.to_string());
    }
}

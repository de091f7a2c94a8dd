use std::cmp::Ordering;
use std::ops::Bound;

use relmeta_error::{RelmetaError, Result};
use relmeta_types::scalar::OwnedScalarValue;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::ColumnStatistics;
use crate::sarg::interval::Interval;
use crate::sarg::sequence::IntervalSequence;

/// One bucket of an equi-depth histogram.
///
/// A bar covers the values from its `start` up to the `start` of the next
/// bar. The last bar is open ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBar {
    pub start: OwnedScalarValue,
    /// Number of distinct values seen in the sample for this bar.
    pub value_count: u64,
}

/// Equi-depth histogram over one column built from a sample.
///
/// Every bar holds `rows_per_bar` sampled rows except the last which holds
/// `rows_last_bar`. The distinct counts of the bars are scaled so that they
/// sum to the column's estimated distinct count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "HistogramParts")]
pub struct ColumnHistogram {
    distinct_values: u64,
    rows_per_bar: u64,
    rows_last_bar: u64,
    bars: Vec<HistogramBar>,
}

/// Unchecked fields of a deserialized histogram.
#[derive(Deserialize)]
struct HistogramParts {
    distinct_values: u64,
    rows_per_bar: u64,
    rows_last_bar: u64,
    bars: Vec<HistogramBar>,
}

impl TryFrom<HistogramParts> for ColumnHistogram {
    type Error = RelmetaError;

    fn try_from(parts: HistogramParts) -> Result<Self> {
        ColumnHistogram::try_new(
            parts.distinct_values,
            parts.rows_per_bar,
            parts.rows_last_bar,
            parts.bars,
        )
    }
}

impl ColumnHistogram {
    pub fn try_new(
        distinct_values: u64,
        rows_per_bar: u64,
        rows_last_bar: u64,
        bars: Vec<HistogramBar>,
    ) -> Result<Self> {
        let hist = ColumnHistogram {
            distinct_values,
            rows_per_bar,
            rows_last_bar,
            bars,
        };
        hist.validate()?;
        Ok(hist)
    }

    /// Check the structural invariants of the histogram.
    ///
    /// Called on construction, including deserialization.
    pub fn validate(&self) -> Result<()> {
        if self.bars.is_empty() {
            return Err(RelmetaError::new("Histogram must contain at least one bar"));
        }
        if self.rows_per_bar == 0 {
            return Err(RelmetaError::new("Histogram rows per bar must be positive"));
        }
        if self.rows_last_bar == 0 || self.rows_last_bar > self.rows_per_bar {
            return Err(RelmetaError::new(format!(
                "Histogram last bar holds {} rows, expected between 1 and {}",
                self.rows_last_bar, self.rows_per_bar
            )));
        }

        for pair in self.bars.windows(2) {
            match pair[0].start.compare(&pair[1].start) {
                Some(Ordering::Less) => (),
                Some(_) => {
                    return Err(RelmetaError::new(format!(
                        "Histogram bars not sorted: {} followed by {}",
                        pair[0].start, pair[1].start
                    )))
                }
                None => {
                    return Err(RelmetaError::new(format!(
                        "Histogram bar values {} and {} are not comparable",
                        pair[0].start, pair[1].start
                    )))
                }
            }
        }

        let sampled = self.sampled_values();
        if sampled > self.distinct_values {
            return Err(RelmetaError::new(format!(
                "Histogram bars contain {sampled} distinct values, more than the column's {}",
                self.distinct_values
            )));
        }

        Ok(())
    }

    pub fn distinct_values(&self) -> u64 {
        self.distinct_values
    }

    pub fn rows_per_bar(&self) -> u64 {
        self.rows_per_bar
    }

    pub fn rows_last_bar(&self) -> u64 {
        self.rows_last_bar
    }

    pub fn bars(&self) -> &[HistogramBar] {
        &self.bars
    }

    /// Number of sampled rows represented by the histogram.
    pub fn sampled_rows(&self) -> u64 {
        (self.bars.len() as u64)
            .saturating_sub(1)
            .saturating_mul(self.rows_per_bar)
            .saturating_add(self.rows_last_bar)
    }

    fn sampled_values(&self) -> u64 {
        self.bars
            .iter()
            .fold(0, |acc, b| acc.saturating_add(b.value_count))
    }

    /// Estimate the selectivity and cardinality of the column after applying
    /// the predicate.
    ///
    /// With no predicate, selectivity is 1 and the cardinality is the
    /// column's distinct count. Returns None if a predicate bound cannot be
    /// compared against the histogram's values.
    pub fn estimate(&self, predicate: Option<&IntervalSequence>) -> Option<ColumnStatistics> {
        let predicate = match predicate {
            Some(predicate) => predicate,
            None => {
                return Some(ColumnStatistics {
                    selectivity: 1.0,
                    cardinality: self.distinct_values as f64,
                })
            }
        };

        let coverages = self.coverages(predicate)?;

        let sampled = self.sampled_values();
        let correction = if sampled == 0 {
            0.0
        } else {
            self.distinct_values as f64 / sampled as f64
        };

        let last = self.bars.len() - 1;
        let mut total_fraction = 0.0;
        let mut total_values = 0.0;
        for (idx, (bar, coverage)) in self.bars.iter().zip(&coverages).enumerate() {
            let bar_values = bar.value_count as f64 * correction;
            let mut fraction = coverage.estimate_fraction(bar_values);
            if idx == last {
                fraction *= self.rows_last_bar as f64 / self.rows_per_bar as f64;
            }
            total_fraction += fraction;
            total_values += coverage.estimate_cardinality(bar_values);
        }

        let stats = ColumnStatistics {
            selectivity: total_fraction / self.bars.len() as f64,
            cardinality: total_values,
        };
        trace!(%predicate, ?stats, "histogram estimate");

        Some(stats)
    }

    fn coverages(&self, predicate: &IntervalSequence) -> Option<Vec<BarCoverage>> {
        let mut coverages = vec![BarCoverage::default(); self.bars.len()];

        let mut min_bar = 0;
        for interval in predicate.intervals() {
            let first = self.find_start_bar(min_bar, &interval.low)?;
            let end = self.find_end_bar(first, &interval.high)?;
            if first == end {
                continue;
            }
            let last = end - 1;
            self.add_range(&mut coverages, interval, first, last)?;
            min_bar = last;
        }

        Some(coverages)
    }

    /// Find the bar containing the lower bound, searching from `min`.
    fn find_start_bar(&self, min: usize, low: &Bound<OwnedScalarValue>) -> Option<usize> {
        let (value, open) = match low {
            Bound::Unbounded => return Some(0),
            Bound::Included(v) => (v, false),
            Bound::Excluded(v) => (v, true),
        };

        let mut start = min;
        while start + 1 < self.bars.len() {
            let cmp = self.bars[start + 1].start.compare(value)?;
            if cmp.is_lt() || (open && cmp.is_eq()) {
                start += 1;
                continue;
            }
            break;
        }
        Some(start)
    }

    /// Find the first bar past the upper bound, searching from `min`.
    fn find_end_bar(&self, min: usize, high: &Bound<OwnedScalarValue>) -> Option<usize> {
        let (value, open) = match high {
            Bound::Unbounded => return Some(self.bars.len()),
            Bound::Included(v) => (v, false),
            Bound::Excluded(v) => (v, true),
        };

        let mut end = min;
        while end < self.bars.len() {
            let cmp = self.bars[end].start.compare(value)?;
            if cmp.is_gt() || (open && cmp.is_eq()) {
                break;
            }
            end += 1;
        }
        Some(end)
    }

    fn add_range(
        &self,
        coverages: &mut [BarCoverage],
        interval: &Interval,
        first: usize,
        last: usize,
    ) -> Option<()> {
        let is_point = interval.is_point();
        if is_point {
            coverages[first].cardinality_point += 1;
        } else {
            for coverage in &mut coverages[first..=last] {
                coverage.cardinality_ranges += 1;
            }
        }

        if first == last {
            if is_point {
                coverages[first].selectivity_points += 1;
            } else {
                coverages[first].selectivity_ranges += 1;
            }
            return Some(());
        }

        for coverage in &mut coverages[first..=last] {
            coverage.selectivity_ranges += 1;
        }

        // The first bar is covered entirely if the range starts at or before
        // the bar's first value.
        let first_entire = match &interval.low {
            Bound::Unbounded => true,
            Bound::Included(v) => self.bars[first].start.compare(v)?.is_ge(),
            Bound::Excluded(v) => self.bars[first].start.compare(v)?.is_gt(),
        };
        if first_entire {
            coverages[first].entire = true;
        }

        for coverage in &mut coverages[first + 1..last] {
            coverage.entire = true;
        }

        if matches!(interval.high, Bound::Unbounded) {
            coverages[last].entire = true;
        }

        Some(())
    }
}

/// How much of a single bar is matched by a predicate.
#[derive(Debug, Clone, Copy, Default)]
struct BarCoverage {
    entire: bool,
    cardinality_point: u32,
    cardinality_ranges: u32,
    selectivity_points: u32,
    selectivity_ranges: u32,
}

impl BarCoverage {
    /// Fraction of the bar's rows matched, from 0 to 1.
    ///
    /// Each matched point accounts for one distinct value of the bar. A
    /// range partially covering the bar matches half of what remains.
    fn estimate_fraction(&self, bar_values: f64) -> f64 {
        if self.entire {
            return 1.0;
        }

        let mut fraction = 0.0;
        if self.selectivity_points > 0 {
            fraction = (self.selectivity_points as f64 / bar_values.max(1.0)).min(1.0);
        }
        if self.selectivity_ranges > 0 {
            fraction += (1.0 - fraction) / 2.0;
        }
        fraction
    }

    /// Distinct values of the bar matched.
    fn estimate_cardinality(&self, bar_values: f64) -> f64 {
        let mut points = self.cardinality_point as f64;
        if (points > 0.0 && points >= bar_values) || self.cardinality_ranges == 0 {
            return points;
        }

        if self.entire {
            points = points.max(bar_values);
        }
        let remaining = (bar_values - points).max(0.0);
        points + remaining / 2.0
    }
}

#[cfg(test)]
mod tests {
    use relmeta_types::scalar::ScalarValue;

    use super::*;

    fn bar(start: i32, value_count: u64) -> HistogramBar {
        HistogramBar {
            start: ScalarValue::Int32(start),
            value_count,
        }
    }

    /// Bars starting at 0, 10, 20, 30 with two distinct values each.
    fn small() -> ColumnHistogram {
        ColumnHistogram::try_new(8, 10, 10, vec![bar(0, 2), bar(10, 2), bar(20, 2), bar(30, 2)])
            .unwrap()
    }

    fn seq(interval: Interval) -> IntervalSequence {
        IntervalSequence::single(interval)
    }

    #[test]
    fn no_predicate() {
        let got = small().estimate(None).unwrap();
        assert_eq!(
            ColumnStatistics {
                selectivity: 1.0,
                cardinality: 8.0
            },
            got
        );
    }

    #[test]
    fn point_in_one_bar() {
        let got = small()
            .estimate(Some(&seq(Interval::point(ScalarValue::Int32(15)))))
            .unwrap();
        assert_eq!(0.125, got.selectivity);
        assert_eq!(1.0, got.cardinality);
    }

    #[test]
    fn open_ended_range() {
        let got = small()
            .estimate(Some(&seq(Interval::ge(ScalarValue::Int32(20)))))
            .unwrap();
        assert_eq!(0.625, got.selectivity);
        assert_eq!(5.0, got.cardinality);
    }

    #[test]
    fn range_below_first_bar() {
        let got = small()
            .estimate(Some(&seq(Interval::lt(ScalarValue::Int32(0)))))
            .unwrap();
        assert_eq!(0.0, got.selectivity);
        assert_eq!(0.0, got.cardinality);
    }

    #[test]
    fn incomparable_predicate_unknown() {
        let got = small().estimate(Some(&seq(Interval::point("abc".into()))));
        assert_eq!(None, got);
    }

    #[test]
    fn validation() {
        assert!(ColumnHistogram::try_new(8, 10, 10, vec![]).is_err());
        assert!(ColumnHistogram::try_new(8, 10, 11, vec![bar(0, 2)]).is_err());
        assert!(ColumnHistogram::try_new(8, 10, 0, vec![bar(0, 2)]).is_err());
        assert!(ColumnHistogram::try_new(8, 10, 10, vec![bar(10, 2), bar(0, 2)]).is_err());
        assert!(ColumnHistogram::try_new(8, 10, 10, vec![bar(0, 2), bar(0, 2)]).is_err());
        assert!(ColumnHistogram::try_new(3, 10, 10, vec![bar(0, 2), bar(10, 2)]).is_err());
        assert!(ColumnHistogram::try_new(
            4,
            10,
            10,
            vec![bar(0, 2), HistogramBar {
                start: "a".into(),
                value_count: 2
            }]
        )
        .is_err());
    }

    #[test]
    fn deserialize_validates() {
        let empty = r#"{"distinct_values":1,"rows_per_bar":1,"rows_last_bar":1,"bars":[]}"#;
        let err = serde_json::from_str::<ColumnHistogram>(empty).unwrap_err();
        assert!(err.to_string().contains("at least one bar"), "{err}");

        let unsorted = r#"{"distinct_values":4,"rows_per_bar":1,"rows_last_bar":1,
            "bars":[{"start":{"Int32":5},"value_count":2},{"start":{"Int32":1},"value_count":2}]}"#;
        assert!(serde_json::from_str::<ColumnHistogram>(unsorted).is_err());
    }

    #[test]
    fn sampled_rows() {
        let hist = ColumnHistogram::try_new(8, 10, 5, vec![bar(0, 2), bar(10, 2)]).unwrap();
        assert_eq!(15, hist.sampled_rows());
    }
}

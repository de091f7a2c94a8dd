pub mod builder;
pub mod histogram;

use std::collections::BTreeMap;
use std::fmt::Debug;

use histogram::ColumnHistogram;
use indexmap::IndexMap;
use relmeta_error::{RelmetaError, Result, ResultExt};
use serde::{Deserialize, Serialize};

use crate::sarg::sequence::IntervalSequence;

pub mod assumptions {
    //! Assumptions when we don't have complete statistics available to us.

    /// Row count to use for tables that have never been analyzed.
    pub const DEFAULT_ROWCOUNT: f64 = 1.0;
    /// Selectivity with '='.
    pub const EQUALITY_SELECTIVITY: f64 = 0.15;
    /// Selectivity of a sargable predicate on a column without a histogram.
    pub const SARGABLE_SELECTIVITY: f64 = 0.1;
    /// Selectivity with other comparison operators like '<', '>', '!=' etc.
    pub const COMPARISON_SELECTIVITY: f64 = 0.5;
    /// Selectivity of 'IS NOT NULL'.
    pub const IS_NOT_NULL_SELECTIVITY: f64 = 0.9;
    /// Default selectivity to use if none of the above apply.
    pub const DEFAULT_SELECTIVITY: f64 = 0.25;
    /// Fraction of input rows produced by a grouped aggregate when the
    /// distinct count of the group columns is unknown.
    pub const AGGREGATE_ROWCOUNT_FACTOR: f64 = 0.1;
    /// Selectivity of a semijoin per key column when nothing else is known.
    pub const SEMIJOIN_KEY_SELECTIVITY: f64 = 0.1;
    /// Fraction of rows kept by a duplicate eliminating union.
    pub const UNION_DISTINCT_FACTOR: f64 = 0.5;
}

/// Selectivity and cardinality of a single column after applying a
/// predicate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnStatistics {
    /// Fraction of rows matching the predicate.
    pub selectivity: f64,
    /// Number of distinct values among the matching rows.
    pub cardinality: f64,
}

/// Statistics for a single table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableStatistics {
    /// Number of rows, None if the table was never analyzed.
    pub row_count: Option<f64>,
    /// Histograms keyed by stored column ordinal.
    #[serde(default)]
    pub histograms: BTreeMap<usize, ColumnHistogram>,
}

impl TableStatistics {
    pub fn with_row_count(row_count: f64) -> Self {
        TableStatistics {
            row_count: Some(row_count),
            histograms: BTreeMap::new(),
        }
    }

    pub fn histogram(&self, ordinal: usize) -> Option<&ColumnHistogram> {
        self.histograms.get(&ordinal)
    }

    /// Get statistics for a column after applying an optional predicate.
    ///
    /// Returns None if there's no histogram for the column.
    pub fn column_statistics(
        &self,
        ordinal: usize,
        predicate: Option<&IntervalSequence>,
    ) -> Option<ColumnStatistics> {
        self.histograms.get(&ordinal)?.estimate(predicate)
    }

    fn validate(&self, table: &str) -> Result<()> {
        if let Some(row_count) = self.row_count {
            if row_count.is_nan() || row_count < 0.0 {
                return Err(RelmetaError::new(format!(
                    "Row count for table '{table}' must be non-negative, got {row_count}"
                )));
            }
        }
        for hist in self.histograms.values() {
            hist.validate()?;
        }
        Ok(())
    }
}

/// Source of table statistics for one planning session.
pub trait StatisticsSource: Debug + Sync + Send {
    /// Get statistics for a table by name.
    fn table_statistics(&self, table: &str) -> Option<&TableStatistics>;
}

/// Statistics source without any statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyStatistics;

impl StatisticsSource for EmptyStatistics {
    fn table_statistics(&self, _table: &str) -> Option<&TableStatistics> {
        None
    }
}

/// Immutable set of table statistics, usually produced by
/// `StatisticsBuilder` or deserialized from JSON handed over by a
/// statistics collector.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    tables: IndexMap<String, TableStatistics>,
}

impl StatisticsSnapshot {
    pub fn new(tables: impl IntoIterator<Item = (String, TableStatistics)>) -> Self {
        StatisticsSnapshot {
            tables: tables.into_iter().collect(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: StatisticsSnapshot =
            serde_json::from_str(json).context("failed to deserialize statistics snapshot")?;
        for (table, stats) in &snapshot.tables {
            stats.validate(table)?;
        }
        Ok(snapshot)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("failed to serialize statistics snapshot")
    }

    pub fn tables(&self) -> impl Iterator<Item = (&str, &TableStatistics)> {
        self.tables.iter().map(|(name, stats)| (name.as_str(), stats))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl StatisticsSource for StatisticsSnapshot {
    fn table_statistics(&self, table: &str) -> Option<&TableStatistics> {
        self.tables.get(table)
    }
}

#[cfg(test)]
mod tests {
    use histogram::HistogramBar;
    use relmeta_types::scalar::ScalarValue;

    use super::*;
    use crate::sarg::interval::Interval;

    fn snapshot() -> StatisticsSnapshot {
        let hist = ColumnHistogram::try_new(
            4,
            2,
            1,
            vec![
                HistogramBar {
                    start: ScalarValue::Int32(1),
                    value_count: 2,
                },
                HistogramBar {
                    start: ScalarValue::Int32(5),
                    value_count: 2,
                },
            ],
        )
        .unwrap();

        let mut stats = TableStatistics::with_row_count(3.0);
        stats.histograms.insert(0, hist);
        StatisticsSnapshot::new([("T".to_string(), stats)])
    }

    #[test]
    fn column_statistics_without_histogram() {
        let snapshot = snapshot();
        let stats = snapshot.table_statistics("T").unwrap();
        assert_eq!(None, stats.column_statistics(1, None));
        assert_eq!(
            Some(ColumnStatistics {
                selectivity: 1.0,
                cardinality: 4.0
            }),
            stats.column_statistics(0, None)
        );
        assert!(stats
            .column_statistics(
                0,
                Some(&IntervalSequence::single(Interval::point(
                    ScalarValue::Int32(6)
                )))
            )
            .is_some());
    }

    #[test]
    fn json_round_trip() {
        let snapshot = snapshot();
        let json = snapshot.to_json().unwrap();
        let got = StatisticsSnapshot::from_json(&json).unwrap();
        similar_asserts::assert_eq!(snapshot, got);
    }

    #[test]
    fn json_rejects_invalid_histogram() {
        let json = r#"{"tables":{"T":{"row_count":3.0,"histograms":{"0":{
            "distinct_values":1,"rows_per_bar":2,"rows_last_bar":1,
            "bars":[{"start":{"Int32":1},"value_count":2}]}}}}}"#;
        assert!(StatisticsSnapshot::from_json(json).is_err());

        let json = r#"{"tables":{"T":{"row_count":-1.0}}}"#;
        assert!(StatisticsSnapshot::from_json(json).is_err());

        assert!(StatisticsSnapshot::from_json("not json").is_err());
    }

    #[test]
    fn empty_source() {
        assert_eq!(None, EmptyStatistics.table_statistics("T"));
    }
}

use indexmap::IndexMap;
use relmeta_error::{not_implemented, OptionExt, RelmetaError, Result};
use relmeta_types::datatype::DataType;
use relmeta_types::scalar::ScalarValue;
use tracing::debug;

use super::histogram::{ColumnHistogram, HistogramBar};
use super::{StatisticsSnapshot, TableStatistics};
use crate::logical::table::TableDescriptor;

/// Maximum number of bars in a generated histogram.
pub const DEFAULT_HISTOGRAM_BAR_COUNT: u64 = 100;

/// How bar starting values are generated from the value digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueDistribution {
    /// Two digit values, `"00", "01", ... "99"` for decimal digits.
    #[default]
    Adjacent,
    /// Two digit values followed by the first digit, `"000", "010", ...
    /// "990"` for decimal digits.
    Spread,
}

/// Assembles a statistics snapshot for a planning session.
///
/// Statistics normally come from an external collector. This builder also
/// generates synthetic evenly filled histograms for tables that have a row
/// count, which is how test fixtures and benchmarks describe data they never
/// actually load.
#[derive(Debug, Default)]
pub struct StatisticsBuilder {
    tables: IndexMap<String, TableStatistics>,
}

impl StatisticsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_table_row_count(&mut self, table: &str, row_count: f64) -> Result<&mut Self> {
        if row_count.is_nan() || row_count < 0.0 {
            return Err(RelmetaError::new(format!(
                "Row count for table '{table}' must be non-negative, got {row_count}"
            )));
        }
        self.tables.entry(table.to_string()).or_default().row_count = Some(row_count);
        Ok(self)
    }

    /// Insert a histogram built elsewhere.
    pub fn insert_histogram(
        &mut self,
        table: &TableDescriptor,
        ordinal: usize,
        histogram: ColumnHistogram,
    ) -> Result<&mut Self> {
        let field = table.columns.get(ordinal).ok_or_else(|| {
            RelmetaError::new(format!(
                "Table '{}' has no column with ordinal {ordinal}",
                table.name
            ))
        })?;
        if let Some(bar) = histogram
            .bars()
            .iter()
            .find(|bar| !bar.start.is_comparable_to(&field.datatype))
        {
            return Err(RelmetaError::new(format!(
                "Histogram value {} is not comparable to column '{}' of type {}",
                bar.start, field.name, field.datatype
            )));
        }

        self.tables
            .entry(table.name.clone())
            .or_default()
            .histograms
            .insert(ordinal, histogram);
        Ok(self)
    }

    /// Generate an evenly filled histogram for a column.
    ///
    /// The sample holds `sample_percent` of the table's rows, split across at
    /// most 100 bars. `sample_distinct_values` are spread evenly across the
    /// bars. Bar starting values are two character strings drawn from
    /// `value_digits` (first character major), parsed as the column's type.
    ///
    /// The table's row count must have been set first.
    #[allow(clippy::too_many_arguments)]
    pub fn create_column_histogram(
        &mut self,
        table: &TableDescriptor,
        column: &str,
        distinct_values: u64,
        sample_percent: u64,
        sample_distinct_values: u64,
        distribution: ValueDistribution,
        value_digits: &str,
    ) -> Result<&mut Self> {
        let ordinal = table.column_position(column).ok_or_else(|| {
            RelmetaError::new(format!(
                "Table '{}' has no column named '{column}'",
                table.name
            ))
        })?;
        let datatype = &table.columns[ordinal].datatype;
        if matches!(datatype, DataType::Null | DataType::Boolean) {
            not_implemented!("generated histograms for {datatype} columns");
        }

        let row_count = self
            .tables
            .get(&table.name)
            .and_then(|stats| stats.row_count)
            .required("table row count before creating a histogram")?
            as u64;

        if sample_percent == 0 || sample_percent > 100 {
            return Err(RelmetaError::new(format!(
                "Sample percentage must be between 1 and 100, got {sample_percent}"
            )));
        }
        // Never more than the row count, so it fits back into a u64.
        let sample_rows = (u128::from(row_count) * u128::from(sample_percent) / 100) as u64;

        if distinct_values > row_count {
            return Err(RelmetaError::new(format!(
                "Column '{column}' cannot have {distinct_values} distinct values in {row_count} rows"
            )));
        }
        if sample_distinct_values > distinct_values {
            return Err(RelmetaError::new(format!(
                "Sample of column '{column}' cannot have more distinct values ({sample_distinct_values}) than the column ({distinct_values})"
            )));
        }
        if sample_distinct_values > sample_rows {
            return Err(RelmetaError::new(format!(
                "Sample of column '{column}' cannot have {sample_distinct_values} distinct values in {sample_rows} rows"
            )));
        }
        if sample_rows == 0 {
            return Err(RelmetaError::new(format!(
                "Sample of table '{}' contains no rows",
                table.name
            )));
        }

        let (bar_count, rows_per_bar, rows_last_bar) = bar_layout(sample_rows);

        let value_counts = value_counts(bar_count, sample_distinct_values);
        let digits: Vec<char> = value_digits.chars().collect();
        let values = bar_values(bar_count, &digits, distribution)?;

        let bars = values
            .iter()
            .zip(value_counts)
            .map(|(value, value_count)| {
                Ok(HistogramBar {
                    start: ScalarValue::parse_as(datatype, value)?,
                    value_count,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let histogram = ColumnHistogram::try_new(distinct_values, rows_per_bar, rows_last_bar, bars)?;
        debug!(
            table = %table.name,
            column,
            bar_count,
            rows_per_bar,
            rows_last_bar,
            "created column histogram"
        );

        self.insert_histogram(table, ordinal, histogram)
    }

    pub fn build(self) -> StatisticsSnapshot {
        StatisticsSnapshot::new(self.tables)
    }
}

/// Compute the number of bars, rows per bar and rows in the last bar for a
/// sample.
fn bar_layout(sample_rows: u64) -> (u64, u64, u64) {
    if sample_rows <= DEFAULT_HISTOGRAM_BAR_COUNT {
        return (sample_rows, 1, 1);
    }

    let rows_per_bar = sample_rows.div_ceil(DEFAULT_HISTOGRAM_BAR_COUNT);
    // Rounding rows per bar up may leave too few rows for the last bars,
    // shrink the bar count so the last bar is never empty.
    let bar_count = sample_rows.div_ceil(rows_per_bar);
    if bar_count != DEFAULT_HISTOGRAM_BAR_COUNT {
        debug!(
            sample_rows,
            bar_count, "reduced histogram bar count to keep last bar non-empty"
        );
    }
    let rows_last_bar = sample_rows - (bar_count - 1) * rows_per_bar;

    (bar_count, rows_per_bar, rows_last_bar)
}

/// Spread distinct values evenly across bars. The last bar takes whatever
/// remains.
fn value_counts(bar_count: u64, distinct_values: u64) -> Vec<u64> {
    let per_bar = distinct_values as f64 / bar_count as f64;
    let mut remaining = distinct_values;

    (0..bar_count)
        .map(|idx| {
            let current = if idx == bar_count - 1 {
                remaining
            } else {
                let start = (per_bar * idx as f64).ceil() as u64;
                let end = (per_bar * (idx + 1) as f64).ceil() as u64;
                (end - start).min(remaining)
            };
            remaining -= current;
            current
        })
        .collect()
}

fn bar_values(
    bar_count: u64,
    digits: &[char],
    distribution: ValueDistribution,
) -> Result<Vec<String>> {
    let digit_count = digits.len() as u64;
    if digit_count == 0 || bar_count > digit_count * digit_count {
        return Err(RelmetaError::new(format!(
            "Cannot generate {bar_count} bar values from {digit_count} digits"
        )));
    }

    let iterations = bar_count / digit_count;
    let residual = bar_count % digit_count;

    let mut values = Vec::with_capacity(bar_count as usize);
    for (major_idx, major) in digits.iter().enumerate() {
        let current = iterations + u64::from((major_idx as u64) < residual);
        for minor in &digits[..current as usize] {
            let mut value = String::with_capacity(3);
            value.push(*major);
            value.push(*minor);
            if distribution == ValueDistribution::Spread {
                value.push(digits[0]);
            }
            values.push(value);
        }
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use relmeta_types::datatype::DataType;
    use relmeta_types::field::Field;

    use super::*;
    use crate::statistics::StatisticsSource;

    fn emps() -> TableDescriptor {
        TableDescriptor::new(
            "EMPS",
            [
                Field::new("DEPTNO", DataType::Int32, true),
                Field::new("NAME", DataType::Utf8, true),
            ],
        )
    }

    #[test]
    fn layout() {
        assert_eq!((50, 1, 1), bar_layout(50));
        assert_eq!((100, 10, 5), bar_layout(995));
        assert_eq!((75, 2, 2), bar_layout(150));
        assert_eq!((100, 1, 1), bar_layout(100));
    }

    #[test]
    fn value_counts_alternate() {
        let counts = value_counts(100, 150);
        assert_eq!(&[2, 1, 2, 1], &counts[0..4]);
        assert_eq!(150, counts.iter().sum::<u64>());

        let counts = value_counts(4, 2);
        assert_eq!(2, counts.iter().sum::<u64>());
    }

    #[test]
    fn values_spread() {
        let digits: Vec<char> = "0123456789".chars().collect();
        let values = bar_values(12, &digits, ValueDistribution::Spread).unwrap();
        assert_eq!(
            vec!["000", "010", "100", "110", "200", "300", "400", "500", "600", "700", "800", "900"],
            values
        );

        assert!(bar_values(101, &digits, ValueDistribution::Adjacent).is_err());
    }

    #[test]
    fn deptno_histogram() {
        let table = emps();
        let mut builder = StatisticsBuilder::new();
        builder.set_table_row_count("EMPS", 99500.0).unwrap();
        builder
            .create_column_histogram(&table, "DEPTNO", 150, 1, 150, ValueDistribution::Spread, "0123456789")
            .unwrap();
        let snapshot = builder.build();

        let hist = snapshot
            .table_statistics("EMPS")
            .unwrap()
            .histogram(0)
            .unwrap();
        assert_eq!(100, hist.bars().len());
        assert_eq!(10, hist.rows_per_bar());
        assert_eq!(5, hist.rows_last_bar());
        assert_eq!(150, hist.distinct_values());
        assert_eq!(ScalarValue::Int32(0), hist.bars()[0].start);
        assert_eq!(ScalarValue::Int32(990), hist.bars()[99].start);
    }

    #[test]
    fn invalid_requests() {
        let table = emps();
        let mut builder = StatisticsBuilder::new();

        // Missing row count.
        assert!(builder
            .create_column_histogram(&table, "DEPTNO", 10, 1, 10, ValueDistribution::Adjacent, "0123456789")
            .is_err());

        builder.set_table_row_count("EMPS", 1000.0).unwrap();

        // Unknown column.
        assert!(builder
            .create_column_histogram(&table, "AGE", 10, 1, 10, ValueDistribution::Adjacent, "0123456789")
            .is_err());
        // More distinct values than rows.
        assert!(builder
            .create_column_histogram(&table, "DEPTNO", 1001, 1, 10, ValueDistribution::Adjacent, "0123456789")
            .is_err());
        // Sample larger than column.
        assert!(builder
            .create_column_histogram(&table, "DEPTNO", 10, 1, 11, ValueDistribution::Adjacent, "0123456789")
            .is_err());
        // Digits not parseable as ints.
        assert!(builder
            .create_column_histogram(&table, "DEPTNO", 10, 1, 10, ValueDistribution::Adjacent, "ABCDEFGHIJ")
            .is_err());

        assert!(builder.set_table_row_count("EMPS", -1.0).is_err());
    }

    #[test]
    fn full_sample_of_huge_table() {
        let table = emps();
        let mut builder = StatisticsBuilder::new();
        builder.set_table_row_count("EMPS", 1e18).unwrap();
        builder
            .create_column_histogram(&table, "DEPTNO", 150, 100, 150, ValueDistribution::Spread, "0123456789")
            .unwrap();

        let stats = builder.build();
        let hist = stats.table_statistics("EMPS").unwrap().histogram(0).unwrap();
        assert_eq!(100, hist.bars().len());
        assert_eq!(10_000_000_000_000_000, hist.rows_per_bar());
        assert_eq!(1_000_000_000_000_000_000, hist.sampled_rows());
    }

    #[test]
    fn generated_histogram_for_boolean_column() {
        let table = TableDescriptor::new("FLAGS", [Field::new("F", DataType::Boolean, true)]);
        let mut builder = StatisticsBuilder::new();
        builder.set_table_row_count("FLAGS", 100.0).unwrap();

        let err = builder
            .create_column_histogram(&table, "F", 2, 100, 2, ValueDistribution::Adjacent, "01")
            .unwrap_err();
        assert!(err.get_msg().starts_with("Not yet implemented"), "{err}");
    }

    #[test]
    fn insert_histogram_checks_type() {
        let table = emps();
        let hist = ColumnHistogram::try_new(
            1,
            1,
            1,
            vec![HistogramBar {
                start: ScalarValue::Int32(4),
                value_count: 1,
            }],
        )
        .unwrap();

        let mut builder = StatisticsBuilder::new();
        assert!(builder.insert_histogram(&table, 1, hist.clone()).is_err());
        assert!(builder.insert_histogram(&table, 2, hist.clone()).is_err());
        builder.insert_histogram(&table, 0, hist).unwrap();
    }
}

//! Fixtures and assertions for testing estimates.
//!
//! Note these aren't placed behind an `cfg[(test)]` annotation since they
//! should be usable outside of the crate.

use std::sync::Arc;

use relmeta_types::datatype::DataType;
use relmeta_types::field::Field;
use relmeta_types::scalar::OwnedScalarValue;

use crate::expr::arith_expr::ArithOperator;
use crate::expr::comparison_expr::ComparisonOperator;
use crate::expr::Expression;
use crate::logical::logical_filter::LogicalFilter;
use crate::logical::logical_join::LogicalJoin;
use crate::logical::logical_project::LogicalProject;
use crate::logical::logical_scan::LogicalScan;
use crate::logical::logical_semijoin::{LogicalSemiJoin, SemiJoinKind};
use crate::logical::operator::{JoinType, LogicalOperator, PlanRef};
use crate::logical::table::TableDescriptor;
use crate::statistics::builder::{StatisticsBuilder, ValueDistribution};
use crate::statistics::StatisticsSnapshot;

/// Rows in the analyzed EMPS table.
pub const EMPS_ROWS: f64 = 99500.0;
/// Rows in the analyzed DEPTS table.
pub const DEPTS_ROWS: f64 = 150.0;
/// Rows in SALES.EMPS, which only has a row count.
pub const SALES_EMPS_ROWS: f64 = 100.0;

/// Tolerance used by `assert_approx_eq`.
pub const EPSILON: f64 = 1e-5;

/// Asserts two estimates are equal within `EPSILON`, relative to the
/// magnitude of the expected value for values larger than 1.
#[track_caller]
pub fn assert_approx_eq(expected: f64, got: f64) {
    assert_within(expected, got, EPSILON);
}

/// Asserts two estimates are equal within `tolerance`, relative to the
/// magnitude of the expected value for values larger than 1.
#[track_caller]
pub fn assert_within(expected: f64, got: f64, tolerance: f64) {
    let allowed = tolerance * expected.abs().max(1.0);
    if (expected - got).abs() > allowed {
        panic!("Estimates differ, expected {expected}, got {got}");
    }
}

/// Analyzed table `EMPS(DEPTNO int, NAME varchar, AGE int)`.
pub fn emps_table() -> Arc<TableDescriptor> {
    Arc::new(TableDescriptor::new(
        "EMPS",
        [
            Field::new("DEPTNO", DataType::Int32, true),
            Field::new("NAME", DataType::Utf8, true),
            Field::new("AGE", DataType::Int32, true),
        ],
    ))
}

/// Analyzed table `DEPTS(DEPTNO int, DNAME varchar)`.
pub fn depts_table() -> Arc<TableDescriptor> {
    Arc::new(TableDescriptor::new(
        "DEPTS",
        [
            Field::new("DEPTNO", DataType::Int32, true),
            Field::new("DNAME", DataType::Utf8, true),
        ],
    ))
}

/// `SALES.EMPS(EMPID int primary key, NAME varchar, DEPTNO int)`, only has a
/// row count.
pub fn sales_emps_table() -> Arc<TableDescriptor> {
    Arc::new(
        TableDescriptor::new(
            "SALES.EMPS",
            [
                Field::new("EMPID", DataType::Int32, false),
                Field::new("NAME", DataType::Utf8, true),
                Field::new("DEPTNO", DataType::Int32, true),
            ],
        )
        .with_unique_key([0])
        .unwrap(),
    )
}

/// Statistics for EMPS, DEPTS and SALES.EMPS.
///
/// EMPS is described by a 1% sample of 995 rows split across 100 bars. DEPTNO
/// is low cardinality with bars alternating between 2 and 1 distinct values,
/// NAME is high cardinality with only 990 of its 90000 values sampled. AGE
/// has no histogram. DEPTS is fully sampled.
pub fn test_statistics() -> StatisticsSnapshot {
    let emps = emps_table();
    let depts = depts_table();

    let mut builder = StatisticsBuilder::new();
    builder.set_table_row_count(&emps.name, EMPS_ROWS).unwrap();
    builder
        .create_column_histogram(&emps, "DEPTNO", 150, 1, 150, ValueDistribution::Spread, DIGITS)
        .unwrap();
    builder
        .create_column_histogram(&emps, "NAME", 90000, 1, 990, ValueDistribution::Adjacent, LETTERS)
        .unwrap();

    builder.set_table_row_count(&depts.name, DEPTS_ROWS).unwrap();
    builder
        .create_column_histogram(&depts, "DEPTNO", 150, 100, 150, ValueDistribution::Spread, DIGITS)
        .unwrap();
    builder
        .create_column_histogram(&depts, "DNAME", 150, 100, 150, ValueDistribution::Adjacent, LETTERS)
        .unwrap();

    builder
        .set_table_row_count(&sales_emps_table().name, SALES_EMPS_ROWS)
        .unwrap();

    builder.build()
}

const DIGITS: &str = "0123456789";
const LETTERS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";

pub fn scan(table: &Arc<TableDescriptor>) -> PlanRef {
    LogicalOperator::scan(LogicalScan::new(table.clone()))
}

/// Scan with a filter on stored ordinals pushed in.
pub fn filtered_scan(table: &Arc<TableDescriptor>, filter: Expression) -> PlanRef {
    LogicalOperator::scan(LogicalScan::new(table.clone()).with_filter(filter).unwrap())
}

pub fn projected_scan(
    table: &Arc<TableDescriptor>,
    projection: impl IntoIterator<Item = usize>,
) -> PlanRef {
    LogicalOperator::scan(
        LogicalScan::new(table.clone())
            .with_projection(projection)
            .unwrap(),
    )
}

pub fn filter(input: PlanRef, filter: Expression) -> PlanRef {
    LogicalOperator::filter(LogicalFilter { filter }, input)
}

pub fn project(input: PlanRef, projections: Vec<Expression>) -> PlanRef {
    LogicalOperator::project(LogicalProject { projections }, input)
}

pub fn inner_join(left: PlanRef, right: PlanRef, condition: Option<Expression>) -> PlanRef {
    LogicalOperator::join(
        LogicalJoin {
            join_type: JoinType::Inner,
            condition,
        },
        left,
        right,
    )
}

pub fn semi_join(left: PlanRef, right: PlanRef, left_keys: Vec<usize>, right_keys: Vec<usize>) -> PlanRef {
    LogicalOperator::semi_join(
        LogicalSemiJoin {
            kind: SemiJoinKind::Semi,
            left_keys,
            right_keys,
        },
        left,
        right,
    )
}

pub fn compare(op: ComparisonOperator, column: usize, value: impl Into<OwnedScalarValue>) -> Expression {
    Expression::compare(op, Expression::column(column), Expression::literal(value))
}

/// `#column = value`
pub fn eq(column: usize, value: impl Into<OwnedScalarValue>) -> Expression {
    compare(ComparisonOperator::Eq, column, value)
}

/// `#column < value`
pub fn lt(column: usize, value: impl Into<OwnedScalarValue>) -> Expression {
    compare(ComparisonOperator::Lt, column, value)
}

/// `#left = #right`
pub fn columns_eq(left: usize, right: usize) -> Expression {
    Expression::compare(
        ComparisonOperator::Eq,
        Expression::column(left),
        Expression::column(right),
    )
}

pub fn upper(input: Expression) -> Expression {
    Expression::scalar_function("upper", vec![input], DataType::Utf8)
}

pub fn times(left: Expression, right: Expression) -> Expression {
    Expression::arith(ArithOperator::Mul, left, right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistics::StatisticsSource;

    #[test]
    fn approx_eq_relative() {
        assert_approx_eq(99500.0, 99500.5);
        assert_approx_eq(0.0, 0.000001);
    }

    #[test]
    #[should_panic]
    fn approx_eq_differs() {
        assert_approx_eq(0.15, 0.1);
    }

    #[test]
    fn statistics_fixture() {
        let stats = test_statistics();
        assert_eq!(3, stats.len());

        let emps = stats.table_statistics("EMPS").unwrap();
        assert_eq!(Some(EMPS_ROWS), emps.row_count);
        assert!(emps.histogram(0).is_some());
        assert!(emps.histogram(1).is_some());
        assert!(emps.histogram(2).is_none());

        let sales = stats.table_statistics("SALES.EMPS").unwrap();
        assert!(sales.histograms.is_empty());
    }
}

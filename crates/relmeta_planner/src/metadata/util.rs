//! Helpers shared by the estimation rules.

use tracing::{debug, trace};

use crate::cost::saturating_mul;
use crate::expr::comparison_expr::{ComparisonExpr, ComparisonOperator};
use crate::expr::is_expr::IsOperator;
use crate::expr::split::{conjuncts, split_conjunction};
use crate::expr::Expression;
use crate::logical::logical_scan::LogicalScan;
use crate::metadata::MetadataQuery;
use crate::sarg::analyzer::SargAnalyzer;
use crate::statistics::assumptions;

/// Expected number of distinct values when `selected` values are drawn at
/// random from a domain of `domain` distinct values.
///
/// Non-decreasing in `selected`, never more than either argument, and close
/// to `selected` when `selected` is much smaller than `domain`.
pub fn num_distinct_vals(domain: f64, selected: f64) -> f64 {
    if domain <= 0.0 || selected <= 0.0 {
        return 0.0;
    }
    let estimate = (1.0 - (-selected / domain).exp()) * domain;
    estimate.min(domain).min(selected).max(0.0)
}

/// Multiply a sequence of non-negative numbers, saturating instead of
/// overflowing to infinity.
pub fn saturating_product(values: impl IntoIterator<Item = f64>) -> f64 {
    values.into_iter().fold(1.0, saturating_mul)
}

/// Default selectivity of a predicate when nothing is known about the data.
///
/// Each top level conjunct contributes a fixed factor.
pub fn guess_selectivity(predicate: Option<&Expression>) -> f64 {
    let (regular, artificial) = guess_selectivity_parts(predicate);
    regular * artificial
}

/// Selectivity carried only by artificial selectivity markers in the
/// predicate.
pub fn guess_artificial_selectivity(predicate: Option<&Expression>) -> f64 {
    guess_selectivity_parts(predicate).1
}

fn guess_selectivity_parts(predicate: Option<&Expression>) -> (f64, f64) {
    let predicate = match predicate {
        Some(pred) if !pred.is_always_true() => pred,
        _ => return (1.0, 1.0),
    };

    let mut conjuncts = Vec::new();
    split_conjunction(predicate.clone(), &mut conjuncts);

    let mut sel = 1.0;
    let mut artificial = 1.0;
    for conjunct in &conjuncts {
        match conjunct {
            Expression::Is(is) if is.op == IsOperator::IsNotNull => {
                sel *= assumptions::IS_NOT_NULL_SELECTIVITY
            }
            Expression::Selectivity(marker) => artificial *= marker.selectivity,
            Expression::Comparison(cmp) if cmp.op == ComparisonOperator::Eq => {
                sel *= assumptions::EQUALITY_SELECTIVITY
            }
            Expression::Comparison(_) => sel *= assumptions::COMPARISON_SELECTIVITY,
            _ => sel *= assumptions::DEFAULT_SELECTIVITY,
        }
    }

    (sel, artificial)
}

/// Split a predicate on the output of an aggregate into the conjuncts that
/// only reference group columns, rewritten in terms of the aggregate's input,
/// and everything else.
pub fn split_aggregate_predicate(
    group_columns: &[usize],
    predicate: &Expression,
) -> (Option<Expression>, Option<Expression>) {
    let mut pushable = Vec::new();
    let mut not_pushable = Vec::new();
    for conjunct in conjuncts(predicate) {
        let mut pushed = conjunct.clone();
        match pushed.remap_columns(&mut |col| group_columns.get(col).copied()) {
            Ok(()) => pushable.push(pushed),
            Err(_) => not_pushable.push(conjunct),
        }
    }
    (
        Expression::and_all(pushable),
        Expression::and_all(not_pushable),
    )
}

/// Equality conditions between the two inputs of a join.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EquiJoinColumns {
    /// Left columns participating in equalities, sorted.
    pub left: Vec<usize>,
    /// Right columns participating in equalities, relative to the right
    /// input, sorted.
    pub right: Vec<usize>,
    /// Everything that isn't an equality between the two sides.
    pub residual: Option<Expression>,
}

impl EquiJoinColumns {
    /// Split a join condition referencing the concatenated input columns.
    pub fn split(condition: Option<&Expression>, left_len: usize) -> Self {
        let mut equi = EquiJoinColumns::default();
        let condition = match condition {
            Some(cond) => cond,
            None => return equi,
        };

        let mut conjuncts = Vec::new();
        split_conjunction(condition.clone(), &mut conjuncts);

        let mut residual = Vec::new();
        for conjunct in conjuncts {
            match Self::try_equality(&conjunct, left_len) {
                Some((left, right)) => {
                    equi.left.push(left);
                    equi.right.push(right);
                }
                None => residual.push(conjunct),
            }
        }

        equi.left.sort_unstable();
        equi.left.dedup();
        equi.right.sort_unstable();
        equi.right.dedup();
        equi.residual = Expression::and_all(residual);
        equi
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Returns the (left, right) columns if the expression is an equality
    /// between a bare left column and a bare right column.
    fn try_equality(expr: &Expression, left_len: usize) -> Option<(usize, usize)> {
        match expr {
            Expression::Comparison(ComparisonExpr {
                left,
                right,
                op: ComparisonOperator::Eq,
            }) => {
                let a = left.as_column()?;
                let b = right.as_column()?;
                match (a < left_len, b < left_len) {
                    (true, false) => Some((a, b - left_len)),
                    (false, true) => Some((b, a - left_len)),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

/// Rewrite a predicate on the scan's output positions to reference stored
/// ordinals instead.
pub fn scan_predicate_to_stored(scan: &LogicalScan, predicate: &Expression) -> Option<Expression> {
    let mut stored = predicate.clone();
    match stored.remap_columns(&mut |col| scan.stored_ordinal(col)) {
        Ok(()) => Some(stored),
        Err(e) => {
            trace!(%e, "predicate does not map onto scan");
            None
        }
    }
}

/// Selectivity of a predicate (on stored ordinals) applied to a table scan.
///
/// Sargable conjuncts are evaluated against column histograms, falling back
/// to a fixed selectivity for columns without one. With `sargable_only`, the
/// residual conjuncts only contribute their artificial selectivity markers,
/// which is how access cost is computed: the residual is evaluated on rows
/// that are read anyway.
///
/// Never returns less than the selectivity of a single row.
pub fn row_scan_selectivity(
    mq: &MetadataQuery,
    scan: &LogicalScan,
    predicate: Option<&Expression>,
    sargable_only: bool,
) -> f64 {
    let predicate = match predicate {
        Some(pred) if !pred.is_always_true() => pred,
        _ => return 1.0,
    };

    let stats = mq.statistics_source().table_statistics(&scan.table.name);
    if stats.is_none() && !sargable_only {
        debug!(table = %scan.table.name, %predicate, "no statistics for table, guessing selectivity");
        return guess_selectivity(Some(predicate));
    }

    let schema = scan.table.full_schema();
    let analysis = SargAnalyzer::new(&schema).analyze_all(predicate);

    let mut selectivity = 1.0;
    for (column, sequence) in &analysis.bindings {
        let col_stats = stats.and_then(|s| s.column_statistics(*column, Some(sequence)));
        match col_stats {
            Some(col_stats) => selectivity *= col_stats.selectivity,
            None => {
                debug!(table = %scan.table.name, column, "no histogram for sargable column");
                selectivity *= assumptions::SARGABLE_SELECTIVITY;
            }
        }
    }

    selectivity *= if sargable_only {
        guess_artificial_selectivity(analysis.residual.as_ref())
    } else {
        guess_selectivity(analysis.residual.as_ref())
    };

    if let Some(row_count) = stats.and_then(|s| s.row_count) {
        selectivity = selectivity.max(1.0 / row_count.max(1.0));
    }

    selectivity.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eq(left: Expression, right: Expression) -> Expression {
        Expression::compare(ComparisonOperator::Eq, left, right)
    }

    #[test]
    fn num_distinct_vals_bounds() {
        assert_eq!(0.0, num_distinct_vals(0.0, 10.0));
        assert_eq!(0.0, num_distinct_vals(10.0, 0.0));

        // Small selections out of a large domain are nearly all distinct.
        let got = num_distinct_vals(1_000_000.0, 10.0);
        assert!((got - 10.0).abs() < 1e-3, "got {got}");

        // Large selections saturate at the domain.
        let got = num_distinct_vals(150.0, 99500.0);
        assert!((got - 150.0).abs() < 1e-9, "got {got}");

        let got = num_distinct_vals(1.0, 1.0);
        assert!((got - (1.0 - (-1.0f64).exp())).abs() < 1e-12);

        assert!(num_distinct_vals(100.0, 50.0) <= num_distinct_vals(100.0, 60.0));
    }

    #[test]
    fn product_saturates() {
        assert_eq!(6.0, saturating_product([1.0, 2.0, 3.0]));
        assert_eq!(1.0, saturating_product([]));
        assert_eq!(f64::MAX, saturating_product([f64::MAX, 10.0, 10.0]));
    }

    #[test]
    fn guesses() {
        assert_eq!(1.0, guess_selectivity(None));
        assert_eq!(1.0, guess_selectivity(Some(&Expression::literal(true))));

        let pred = Expression::and_all([
            eq(Expression::column(0), Expression::literal(1)),
            Expression::compare(
                ComparisonOperator::Lt,
                Expression::column(1),
                Expression::literal(1),
            ),
            Expression::is(IsOperator::IsNotNull, Expression::column(2)),
            Expression::scalar_function(
                "like",
                vec![Expression::column(3)],
                relmeta_types::datatype::DataType::Boolean,
            ),
            Expression::selectivity(0.2),
        ])
        .unwrap();

        let expected_regular = 0.15 * 0.5 * 0.9 * 0.25;
        assert!((guess_selectivity(Some(&pred)) - expected_regular * 0.2).abs() < 1e-12);
        assert!((guess_artificial_selectivity(Some(&pred)) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn split_equi_join() {
        // #0 = #3 AND #4 = #1 AND #0 > #4 AND #1 = #2 (left only)
        let cond = Expression::and_all([
            eq(Expression::column(0), Expression::column(3)),
            eq(Expression::column(4), Expression::column(1)),
            Expression::compare(
                ComparisonOperator::Gt,
                Expression::column(0),
                Expression::column(4),
            ),
            eq(Expression::column(1), Expression::column(2)),
        ])
        .unwrap();

        let equi = EquiJoinColumns::split(Some(&cond), 3);
        assert_eq!(vec![0, 1], equi.left);
        assert_eq!(vec![0, 1], equi.right);
        assert_eq!(
            "(#0 > #4 AND #1 = #2)",
            equi.residual.unwrap().to_string()
        );

        let none = EquiJoinColumns::split(None, 3);
        assert!(none.is_empty());
        assert_eq!(None, none.residual);
    }
}

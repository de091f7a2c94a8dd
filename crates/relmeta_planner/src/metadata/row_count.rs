use tracing::debug;

use super::util::{guess_selectivity, row_scan_selectivity, saturating_product, EquiJoinColumns};
use super::MetadataQuery;
use crate::expr::Expression;
use crate::logical::logical_join::LogicalJoin;
use crate::logical::logical_semijoin::SemiJoinKind;
use crate::logical::operator::{LogicalOperator, Node, PlanRef, SetOpKind};
use crate::statistics::assumptions;

/// Built-in row count rules.
pub(crate) fn row_count(mq: &MetadataQuery, node: &PlanRef) -> Option<f64> {
    match node.as_ref() {
        LogicalOperator::Scan(scan) => {
            let scan = scan.as_ref();
            let table_rows = table_row_count(mq, &scan.table.name);
            let selectivity = row_scan_selectivity(mq, scan, scan.filter.as_ref(), false);
            Some(table_rows * selectivity)
        }
        LogicalOperator::Filter(filter) => {
            let child = filter.get_one_child_exact().ok()?;
            let rows = mq.row_count(child)?;
            let selectivity = mq
                .selectivity(child, Some(&filter.as_ref().filter))
                .unwrap_or_else(|| guess_selectivity(Some(&filter.as_ref().filter)));
            Some(rows * selectivity)
        }
        LogicalOperator::Project(n) => mq.row_count(n.get_one_child_exact().ok()?),
        LogicalOperator::Order(n) => mq.row_count(n.get_one_child_exact().ok()?),
        LogicalOperator::Aggregate(agg) => {
            let child = agg.get_one_child_exact().ok()?;
            let groups = &agg.as_ref().group_columns;
            if groups.is_empty() {
                return Some(1.0);
            }
            let child_rows = mq.row_count(child)?;
            match mq.distinct_row_count(child, groups, None) {
                Some(distinct) => Some(distinct.min(child_rows)),
                None => {
                    debug!(%node, "unknown group distinct count, assuming fixed reduction");
                    Some(child_rows * assumptions::AGGREGATE_ROWCOUNT_FACTOR)
                }
            }
        }
        LogicalOperator::SetOp(setop) => {
            let children = setop.get_nary_children(2).ok()?;
            let counts = children
                .iter()
                .map(|c| mq.row_count(c))
                .collect::<Option<Vec<_>>>()?;

            let rows = match setop.as_ref().kind {
                SetOpKind::Union => {
                    let sum: f64 = counts.iter().sum();
                    if setop.as_ref().all {
                        sum
                    } else {
                        sum * assumptions::UNION_DISTINCT_FACTOR
                    }
                }
                SetOpKind::Intersect => counts.iter().copied().fold(f64::INFINITY, f64::min),
                SetOpKind::Except => {
                    // Assume every other input removes half of its rows from
                    // the first input.
                    let removed: f64 = counts[1..].iter().map(|c| c * 0.5).sum();
                    (counts[0] - removed).max(0.0)
                }
            };
            Some(rows.min(f64::MAX))
        }
        LogicalOperator::Join(join) => join_row_count(mq, join, join.as_ref().condition.as_ref()),
        LogicalOperator::SemiJoin(semi) => {
            let (left, _) = semi.get_two_children_exact().ok()?;
            let rows = mq.row_count(left)?;
            let marker = semijoin_marker(mq, node)?;
            let selectivity = mq
                .selectivity(left, Some(&marker))
                .unwrap_or_else(|| guess_selectivity(Some(&marker)));
            Some(rows * selectivity)
        }
        LogicalOperator::Extension(_) => None,
    }
}

/// Row count of a table, falling back to a default for tables that were
/// never analyzed.
pub(crate) fn table_row_count(mq: &MetadataQuery, table: &str) -> f64 {
    match mq
        .statistics_source()
        .table_statistics(table)
        .and_then(|s| s.row_count)
    {
        Some(rows) => rows,
        None => {
            debug!(table, "no row count for table, using default");
            assumptions::DEFAULT_ROWCOUNT
        }
    }
}

/// Artificial selectivity predicate describing the filtering effect of a
/// semijoin on its left input.
pub(crate) fn semijoin_marker(mq: &MetadataQuery, node: &PlanRef) -> Option<Expression> {
    match node.as_ref() {
        LogicalOperator::SemiJoin(semi) => {
            let (_, right) = semi.get_two_children_exact().ok()?;
            let selectivity = mq.semijoin_selectivity(right, &semi.as_ref().right_keys);
            let selectivity = match semi.as_ref().kind {
                SemiJoinKind::Semi => selectivity,
                SemiJoinKind::Anti => 1.0 - selectivity,
            };
            Some(Expression::selectivity(selectivity.clamp(0.0, 1.0)))
        }
        _ => None,
    }
}

/// Estimate the rows produced by a join given a condition on the
/// concatenated input columns.
///
/// With distinct counts for the equi-join columns of both sides, the rows are
/// `left * right / max(left distinct, right distinct)`. Without, the side
/// whose join columns are unique (or that was the smaller table before
/// filtering) is treated as a dimension table joined on its key, producing
/// one row per row of the other side.
pub(crate) fn join_row_count(
    mq: &MetadataQuery,
    join: &Node<LogicalJoin>,
    condition: Option<&Expression>,
) -> Option<f64> {
    let (left, right) = join.get_two_children_exact().ok()?;
    let left_rows = mq.row_count(left)?;
    let right_rows = mq.row_count(right)?;
    let left_len = left.output_len()?;

    let equi = EquiJoinColumns::split(condition, left_len);
    let left_distinct = mq.distinct_row_count(left, &equi.left, None);
    let right_distinct = mq.distinct_row_count(right, &equi.right, None);

    let mut rows = match (left_distinct, right_distinct) {
        (Some(l), Some(r)) => {
            let groups = l.max(r).max(1.0);
            saturating_product([left_rows, right_rows, 1.0 / groups])
                * guess_selectivity(equi.residual.as_ref())
        }
        _ if !equi.is_empty() => {
            let rows = match dimension_on_left(mq, left, right, &equi) {
                Some(true) => right_rows,
                Some(false) => left_rows,
                None => saturating_product([left_rows, right_rows, guess_selectivity(condition)]),
            };
            rows * guess_selectivity(equi.residual.as_ref())
        }
        _ => saturating_product([left_rows, right_rows, guess_selectivity(condition)]),
    };

    let join_type = join.as_ref().join_type;
    if join_type.preserves_left() {
        rows = rows.max(left_rows);
    }
    if join_type.preserves_right() {
        rows = rows.max(right_rows);
    }

    Some(rows)
}

/// Decide which side of an equi-join is the dimension table.
///
/// Returns None if it cannot be decided.
fn dimension_on_left(
    mq: &MetadataQuery,
    left: &PlanRef,
    right: &PlanRef,
    equi: &EquiJoinColumns,
) -> Option<bool> {
    if mq.are_columns_unique(left, &equi.left) == Some(true) {
        return Some(true);
    }
    if mq.are_columns_unique(right, &equi.right) == Some(true) {
        return Some(false);
    }

    let left_percent = mq.percentage_original_rows(left)?;
    let right_percent = mq.percentage_original_rows(right)?;
    if left_percent <= 0.0 || right_percent <= 0.0 {
        return None;
    }

    // Compare the sizes of the inputs before any filtering.
    let left_original = mq.row_count(left)? / left_percent;
    let right_original = mq.row_count(right)? / right_percent;
    Some(left_original < right_original)
}

use tracing::trace;

use super::row_count::{semijoin_marker, table_row_count};
use super::util::{
    guess_selectivity, num_distinct_vals, row_scan_selectivity, saturating_product,
    scan_predicate_to_stored, split_aggregate_predicate,
};
use super::MetadataQuery;
use crate::cost::saturating_add;
use crate::expr::split::{conjuncts, union_conjuncts};
use crate::expr::Expression;
use crate::logical::logical_join::LogicalJoin;
use crate::logical::logical_scan::LogicalScan;
use crate::logical::operator::{LogicalOperator, Node, PlanRef, SetOpKind};
use crate::sarg::analyzer::{SargAnalysis, SargAnalyzer};

/// Built-in distinct row count rules.
///
/// `group_key` is sorted, deduplicated and never empty.
pub(crate) fn distinct_row_count(
    mq: &MetadataQuery,
    node: &PlanRef,
    group_key: &[usize],
    predicate: Option<&Expression>,
) -> Option<f64> {
    let predicate = predicate.filter(|p| !p.is_always_true());

    match node.as_ref() {
        LogicalOperator::Scan(scan) => scan_distinct(mq, node, scan.as_ref(), group_key, predicate),
        LogicalOperator::Filter(filter) => {
            let child = filter.get_one_child_exact().ok()?;
            let combined = union_conjuncts(predicate, Some(&filter.as_ref().filter));
            mq.distinct_row_count(child, group_key, combined.as_ref())
        }
        LogicalOperator::Order(n) => {
            mq.distinct_row_count(n.get_one_child_exact().ok()?, group_key, predicate)
        }
        LogicalOperator::SemiJoin(semi) => {
            let (left, _) = semi.get_two_children_exact().ok()?;
            let marker = semijoin_marker(mq, node)?;
            let combined = match predicate {
                Some(pred) => Expression::and(pred.clone(), marker),
                None => marker,
            };
            mq.distinct_row_count(left, group_key, Some(&combined))
        }
        LogicalOperator::Aggregate(agg) => {
            let child = agg.get_one_child_exact().ok()?;
            let agg = agg.as_ref();
            let groups = &agg.group_columns;

            // Group outputs map to the grouped input column, aggregate
            // outputs to the columns they aggregate.
            let mut child_key = Vec::new();
            for &col in group_key {
                match groups.get(col) {
                    Some(&input) => child_key.push(input),
                    None => child_key.extend(&agg.aggregates.get(col - groups.len())?.inputs),
                }
            }

            let (pushable, not_pushable) = match predicate {
                Some(pred) => split_aggregate_predicate(groups, pred),
                None => (None, None),
            };
            let distinct = mq.distinct_row_count(child, &child_key, pushable.as_ref())?;
            Some(distinct * guess_selectivity(not_pushable.as_ref()))
        }
        LogicalOperator::SetOp(setop) => match setop.as_ref().kind {
            SetOpKind::Union => {
                let mut total = 0.0;
                for child in setop.get_nary_children(2).ok()? {
                    let distinct = mq.distinct_row_count(child, group_key, predicate)?;
                    total = saturating_add(total, distinct);
                }
                Some(total)
            }
            SetOpKind::Intersect | SetOpKind::Except => {
                if mq.are_columns_unique(node, group_key) == Some(true) {
                    let rows = mq.row_count(node)?;
                    Some(rows * mq.selectivity(node, predicate)?)
                } else {
                    None
                }
            }
        },
        LogicalOperator::Join(join) => join_distinct(mq, node, join, group_key, predicate),
        LogicalOperator::Project(project) => {
            let child = project.get_one_child_exact().ok()?;
            let projections = &project.as_ref().projections;

            let mut base = Vec::new();
            let mut derived = Vec::new();
            for &col in group_key {
                let expr = projections.get(col)?;
                match expr.as_column() {
                    Some(input) => base.push(input),
                    None => derived.push(expr),
                }
            }

            let pushed = match predicate {
                Some(pred) => Some(pred.substitute_columns(projections).ok()?),
                None => None,
            };
            let distinct = mq.distinct_row_count(child, &base, pushed.as_ref())?;
            if derived.is_empty() {
                return Some(distinct);
            }

            let mut product = distinct;
            for expr in derived {
                product = saturating_product([product, cardinality_of_expr(mq, child, expr)?]);
            }
            Some(num_distinct_vals(product, mq.row_count(node)?))
        }
        LogicalOperator::Extension(_) => None,
    }
}

/// Number of distinct values an expression over the columns of `input`
/// produces.
pub(crate) fn cardinality_of_expr(
    mq: &MetadataQuery,
    input: &PlanRef,
    expr: &Expression,
) -> Option<f64> {
    match expr {
        Expression::Column(col) => mq.distinct_row_count(input, &[col.column], None),
        Expression::Literal(_) | Expression::Selectivity(_) => Some(1.0),
        other => {
            let mut product = 1.0;
            for child in other.children() {
                product = saturating_product([product, cardinality_of_expr(mq, input, child)?]);
            }
            Some(num_distinct_vals(product, mq.row_count(input)?))
        }
    }
}

fn scan_distinct(
    mq: &MetadataQuery,
    node: &PlanRef,
    scan: &LogicalScan,
    group_key: &[usize],
    predicate: Option<&Expression>,
) -> Option<f64> {
    let stored_key = group_key
        .iter()
        .map(|&col| scan.stored_ordinal(col))
        .collect::<Option<Vec<_>>>()?;
    let stored_pred = match predicate {
        Some(pred) => Some(scan_predicate_to_stored(scan, pred)?),
        None => None,
    };
    let combined = union_conjuncts(stored_pred.as_ref(), scan.filter.as_ref());

    let table_rows = table_row_count(mq, &scan.table.name);
    let selected = table_rows * row_scan_selectivity(mq, scan, combined.as_ref(), false);

    if mq.are_columns_unique(node, group_key) == Some(true) {
        return Some(selected);
    }

    let stats = mq.statistics_source().table_statistics(&scan.table.name)?;
    let schema = scan.table.full_schema();
    let analysis = match &combined {
        Some(pred) => SargAnalyzer::new(&schema).analyze_all(pred),
        None => SargAnalysis::default(),
    };

    // Columns are assumed independent.
    let mut naive = 1.0;
    for col in stored_key {
        let col_stats = stats.column_statistics(col, analysis.bindings.get(&col))?;
        naive = saturating_product([naive, col_stats.cardinality]);
    }
    naive *= guess_selectivity(analysis.residual.as_ref());
    trace!(table = %scan.table.name, naive, selected, "scan distinct estimate");

    Some(num_distinct_vals(naive.min(selected), selected))
}

fn join_distinct(
    mq: &MetadataQuery,
    node: &PlanRef,
    join: &Node<LogicalJoin>,
    group_key: &[usize],
    predicate: Option<&Expression>,
) -> Option<f64> {
    let (left, right) = join.get_two_children_exact().ok()?;
    let left_len = left.output_len()?;
    let join_type = join.as_ref().join_type;

    let (left_key, right_key): (Vec<usize>, Vec<usize>) =
        group_key.iter().copied().partition(|&col| col < left_len);
    let right_key: Vec<usize> = right_key.into_iter().map(|col| col - left_len).collect();

    // Conjuncts on a single side can only be pushed to that side if it
    // doesn't generate nulls.
    let mut left_preds = Vec::new();
    let mut right_preds = Vec::new();
    if let Some(pred) = predicate {
        for conjunct in conjuncts(pred) {
            let refs = conjunct.column_refs();
            if refs.iter().all(|&col| col < left_len) {
                if !join_type.generates_nulls_on_left() {
                    left_preds.push(conjunct);
                }
            } else if refs.iter().all(|&col| col >= left_len) {
                if !join_type.generates_nulls_on_right() {
                    let mut shifted = conjunct;
                    shifted.shift_columns(-(left_len as isize)).ok()?;
                    right_preds.push(shifted);
                }
            }
        }
    }

    let left_pred = Expression::and_all(left_preds);
    let right_pred = Expression::and_all(right_preds);
    let left_distinct = mq.distinct_row_count(left, &left_key, left_pred.as_ref())?;
    let right_distinct = mq.distinct_row_count(right, &right_key, right_pred.as_ref())?;

    Some(num_distinct_vals(
        saturating_product([left_distinct, right_distinct]),
        mq.row_count(node)?,
    ))
}

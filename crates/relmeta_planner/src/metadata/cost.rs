use tracing::trace;

use super::row_count::{semijoin_marker, table_row_count};
use super::util::{row_scan_selectivity, saturating_product, scan_predicate_to_stored, EquiJoinColumns};
use super::MetadataQuery;
use crate::cost::{saturating_add, Cost};
use crate::expr::split::union_conjuncts;
use crate::expr::Expression;
use crate::logical::logical_scan::LogicalScan;
use crate::logical::operator::{LogicalOperator, PlanRef, SetOpKind};

/// Built-in rules for the cost of a single operator.
///
/// Costs are expressed in rows processed. CPU and IO components are left at
/// zero by the built-in rules, providers may fill them in.
pub(crate) fn non_cumulative_cost(mq: &MetadataQuery, node: &PlanRef) -> Option<Cost> {
    let model = mq.cost_model();

    let rows = match node.as_ref() {
        LogicalOperator::Scan(scan) => scan_access_cost(mq, scan.as_ref(), scan.as_ref().filter.as_ref()),
        LogicalOperator::Filter(_) | LogicalOperator::Project(_) => 0.0,
        LogicalOperator::Order(_) => mq.row_count(node)?,
        LogicalOperator::Aggregate(agg) => {
            let input_rows = mq.row_count(agg.get_one_child_exact().ok()?)?;
            let output_rows = mq.row_count(node)?;
            let fixed = model.aggregate_fixed_cost;
            let output = saturating_product([model.aggregate_output_factor, output_rows]);
            let input = saturating_product([model.aggregate_input_factor, input_rows]);
            saturating_add(fixed, saturating_add(output, input))
        }
        LogicalOperator::SetOp(setop) => match setop.as_ref().kind {
            SetOpKind::Union => 0.0,
            SetOpKind::Intersect | SetOpKind::Except => mq.row_count(node)?,
        },
        LogicalOperator::Join(join) => {
            let (left, right) = join.get_two_children_exact().ok()?;
            let left_rows = mq.row_count(left)?;
            let right_rows = mq.row_count(right)?;
            let equi = EquiJoinColumns::split(join.as_ref().condition.as_ref(), left.output_len()?);

            if equi.is_empty() {
                // Every pair of input rows is compared.
                saturating_product([model.nested_loop_join_factor, left_rows, right_rows])
            } else {
                // Build on one side, probe with the other. Scaled down when
                // the join produces fewer rows than its larger input.
                let larger = left_rows.max(right_rows);
                if larger <= 0.0 {
                    0.0
                } else {
                    let join_rows = mq.row_count(node)?;
                    let factor = (join_rows / larger).min(1.0);
                    saturating_product([model.hash_join_factor, larger, factor])
                }
            }
        }
        LogicalOperator::SemiJoin(_) => {
            saturating_product([model.semijoin_overhead_factor, mq.row_count(node)?])
        }
        LogicalOperator::Extension(_) => return None,
    };

    Some(Cost::from_rows(rows))
}

/// Geometric mean of the table's rows and the rows the scan produces.
///
/// Only the sargable part of the predicate (on stored ordinals) counts, the
/// residual is evaluated on rows that are read anyway.
fn scan_access_cost(mq: &MetadataQuery, scan: &LogicalScan, predicate: Option<&Expression>) -> f64 {
    let table_rows = table_row_count(mq, &scan.table.name);
    let selectivity = row_scan_selectivity(mq, scan, predicate, true);
    saturating_product([table_rows, table_rows, selectivity]).sqrt()
}

/// Cost of the node plus the cumulative cost of each input.
///
/// Conditions applied by filters, projections and semijoins directly above a
/// scan are folded into the scan's access cost.
///
/// Unknown if the cost of the node or of any input is unknown.
pub(crate) fn cumulative_cost(mq: &MetadataQuery, node: &PlanRef) -> Option<Cost> {
    let cost = cost_with_filters(mq, node, None)?;
    trace!(%node, %cost, "cumulative cost");
    Some(cost)
}

/// Cumulative cost of the node with `predicate` (on its output columns)
/// applied somewhere above it.
fn cost_with_filters(mq: &MetadataQuery, node: &PlanRef, predicate: Option<Expression>) -> Option<Cost> {
    match node.as_ref() {
        LogicalOperator::Scan(scan) if predicate.is_some() => {
            let scan = scan.as_ref();
            let pushed = predicate.and_then(|pred| scan_predicate_to_stored(scan, &pred));
            let combined = union_conjuncts(pushed.as_ref(), scan.filter.as_ref());
            Some(Cost::from_rows(scan_access_cost(mq, scan, combined.as_ref())))
        }
        LogicalOperator::Filter(filter) => {
            let child = filter.get_one_child_exact().ok()?;
            let combined = union_conjuncts(predicate.as_ref(), Some(&filter.as_ref().filter));
            Some(mq.non_cumulative_cost(node)? + cost_with_filters(mq, child, combined)?)
        }
        LogicalOperator::Project(project) if predicate.is_some() => {
            let child = project.get_one_child_exact().ok()?;
            let pushed = predicate.and_then(|pred| pred.substitute_columns(&project.as_ref().projections).ok());
            Some(mq.non_cumulative_cost(node)? + cost_with_filters(mq, child, pushed)?)
        }
        LogicalOperator::SemiJoin(semi) => {
            // The semijoin lets the left scan skip rows. The right input is
            // costed on its own.
            let (left, right) = semi.get_two_children_exact().ok()?;
            let marker = semijoin_marker(mq, node)?;
            let combined = union_conjuncts(predicate.as_ref(), Some(&marker));
            let left = cost_with_filters(mq, left, combined)?;
            Some(mq.non_cumulative_cost(node)? + left + mq.cumulative_cost(right)?)
        }
        _ => {
            let mut cost = mq.non_cumulative_cost(node)?;
            for child in node.children() {
                cost += mq.cumulative_cost(child)?;
            }
            Some(cost)
        }
    }
}

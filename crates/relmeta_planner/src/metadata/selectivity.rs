use super::row_count::{join_row_count, semijoin_marker};
use super::util::{
    guess_selectivity, row_scan_selectivity, scan_predicate_to_stored, split_aggregate_predicate,
};
use super::MetadataQuery;
use crate::cost::saturating_add;
use crate::expr::split::{minus_conjuncts, union_conjuncts};
use crate::expr::Expression;
use crate::logical::operator::{LogicalOperator, PlanRef, SetOpKind};

/// Built-in selectivity rules.
pub(crate) fn selectivity(
    mq: &MetadataQuery,
    node: &PlanRef,
    predicate: Option<&Expression>,
) -> Option<f64> {
    let predicate = predicate.filter(|p| !p.is_always_true());

    match node.as_ref() {
        LogicalOperator::Scan(scan) => {
            let scan = scan.as_ref();
            let stored = match predicate {
                Some(pred) => Some(scan_predicate_to_stored(scan, pred)?),
                None => None,
            };
            // Conjuncts already applied by the scan's own filter don't
            // reduce its output any further.
            let pred = match (stored, &scan.filter) {
                (Some(pred), Some(filter)) => minus_conjuncts(&pred, filter),
                (Some(pred), None) => Some(pred),
                (None, filter) => filter.clone(),
            };
            Some(row_scan_selectivity(mq, scan, pred.as_ref(), false))
        }
        LogicalOperator::Filter(filter) => {
            let child = filter.get_one_child_exact().ok()?;
            let condition = &filter.as_ref().filter;
            match predicate {
                Some(pred) => match minus_conjuncts(pred, condition) {
                    Some(remaining) => mq.selectivity(child, Some(&remaining)),
                    None => Some(1.0),
                },
                None => mq.selectivity(child, Some(condition)),
            }
        }
        LogicalOperator::Project(project) => {
            let child = project.get_one_child_exact().ok()?;
            match predicate {
                Some(pred) => {
                    let pushed = pred.substitute_columns(&project.as_ref().projections).ok()?;
                    mq.selectivity(child, Some(&pushed))
                }
                None => mq.selectivity(child, None),
            }
        }
        LogicalOperator::Order(order) => mq.selectivity(order.get_one_child_exact().ok()?, predicate),
        LogicalOperator::Aggregate(agg) => {
            let child = agg.get_one_child_exact().ok()?;
            // Conjuncts on group columns can be evaluated on the input.
            let (pushable, not_pushable) = match predicate {
                Some(pred) => split_aggregate_predicate(&agg.as_ref().group_columns, pred),
                None => (None, None),
            };

            let child_selectivity = match (pushable, predicate) {
                (Some(pushed), _) => mq.selectivity(child, Some(&pushed))?,
                (None, None) => mq.selectivity(child, None)?,
                (None, Some(_)) => 1.0,
            };
            Some(child_selectivity * guess_selectivity(not_pushable.as_ref()))
        }
        LogicalOperator::SetOp(setop) => {
            let predicate = match predicate {
                Some(pred) => pred,
                None => return Some(1.0),
            };
            match setop.as_ref().kind {
                SetOpKind::Union => {
                    // Weigh each input's selectivity by its row count.
                    let mut total_rows = 0.0;
                    let mut selected_rows = 0.0;
                    for child in setop.get_nary_children(2).ok()? {
                        let rows = mq.row_count(child)?;
                        let selectivity = mq.selectivity(child, Some(predicate))?;
                        total_rows = saturating_add(total_rows, rows);
                        selected_rows = saturating_add(selected_rows, rows * selectivity);
                    }
                    if total_rows <= 0.0 {
                        return Some(guess_selectivity(Some(predicate)));
                    }
                    Some((selected_rows / total_rows).min(1.0))
                }
                SetOpKind::Intersect | SetOpKind::Except => {
                    Some(guess_selectivity(Some(predicate)))
                }
            }
        }
        LogicalOperator::Join(join) => {
            let predicate = match predicate {
                Some(pred) => pred,
                None => return Some(1.0),
            };
            let combined = union_conjuncts(Some(predicate), join.as_ref().condition.as_ref());
            let rows = mq.row_count(node)?.max(1.0);
            let selected = join_row_count(mq, join, combined.as_ref())?;
            Some((selected / rows).min(1.0))
        }
        LogicalOperator::SemiJoin(semi) => {
            let (left, _) = semi.get_two_children_exact().ok()?;
            let marker = semijoin_marker(mq, node)?;
            let combined = match predicate {
                Some(pred) => Expression::and(marker, pred.clone()),
                None => marker,
            };
            mq.selectivity(left, Some(&combined))
        }
        LogicalOperator::Extension(_) => None,
    }
}

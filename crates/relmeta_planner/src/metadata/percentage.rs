use super::util::row_scan_selectivity;
use super::MetadataQuery;
use crate::cost::saturating_add;
use crate::logical::operator::{LogicalOperator, PlanRef, SetOpKind};

/// Built-in rules for the fraction of rows left after single table
/// filtering.
pub(crate) fn percentage_original_rows(mq: &MetadataQuery, node: &PlanRef) -> Option<f64> {
    match node.as_ref() {
        LogicalOperator::Scan(scan) => {
            let scan = scan.as_ref();
            match &scan.filter {
                Some(filter) => Some(row_scan_selectivity(mq, scan, Some(filter), false)),
                None => Some(1.0),
            }
        }
        LogicalOperator::Filter(filter) => {
            let child = filter.get_one_child_exact().ok()?;
            let child_percentage = mq.percentage_original_rows(child)?;
            let child_rows = mq.row_count(child)?;
            if child_rows <= 0.0 {
                return Some(child_percentage);
            }
            let rows = mq.row_count(node)?;
            Some((child_percentage * rows / child_rows).min(1.0))
        }
        LogicalOperator::Project(n) => mq.percentage_original_rows(n.get_one_child_exact().ok()?),
        LogicalOperator::Order(n) => mq.percentage_original_rows(n.get_one_child_exact().ok()?),
        LogicalOperator::Aggregate(n) => {
            mq.percentage_original_rows(n.get_one_child_exact().ok()?)
        }
        LogicalOperator::SetOp(setop) => match setop.as_ref().kind {
            SetOpKind::Union => {
                // Sum of rows over the sum of each input's original rows.
                let mut rows = 0.0;
                let mut original = 0.0;
                for child in setop.get_nary_children(2).ok()? {
                    let child_rows = mq.row_count(child)?;
                    let percentage = mq.percentage_original_rows(child)?;
                    rows = saturating_add(rows, child_rows);
                    if percentage > 0.0 {
                        original = saturating_add(original, child_rows / percentage);
                    }
                }
                if original <= 0.0 {
                    return Some(1.0);
                }
                Some((rows / original).min(1.0))
            }
            SetOpKind::Intersect | SetOpKind::Except => None,
        },
        LogicalOperator::Join(join) => {
            let (left, right) = join.get_two_children_exact().ok()?;
            let left = mq.percentage_original_rows(left)?;
            let right = mq.percentage_original_rows(right)?;
            Some(left * right)
        }
        LogicalOperator::SemiJoin(semi) => {
            let (left, _) = semi.get_two_children_exact().ok()?;
            let left_percentage = mq.percentage_original_rows(left)?;
            let left_rows = mq.row_count(left)?;
            if left_rows <= 0.0 {
                return Some(left_percentage);
            }
            let rows = mq.row_count(node)?;
            Some((left_percentage * rows / left_rows).min(1.0))
        }
        LogicalOperator::Extension(_) => None,
    }
}

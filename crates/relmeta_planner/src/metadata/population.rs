use super::distinct::cardinality_of_expr;
use super::row_count::table_row_count;
use super::util::{num_distinct_vals, saturating_product};
use super::MetadataQuery;
use crate::cost::saturating_add;
use crate::logical::operator::{LogicalOperator, PlanRef, SetOpKind};

/// Built-in population size rules.
///
/// Like the distinct row count but ignoring every filter in the subtree.
/// `group_key` is sorted, deduplicated and never empty.
pub(crate) fn population_size(
    mq: &MetadataQuery,
    node: &PlanRef,
    group_key: &[usize],
) -> Option<f64> {
    match node.as_ref() {
        LogicalOperator::Scan(scan) => {
            let scan = scan.as_ref();
            let table_rows = table_row_count(mq, &scan.table.name);
            if mq.are_columns_unique(node, group_key) == Some(true) {
                return Some(table_rows);
            }

            let stats = mq.statistics_source().table_statistics(&scan.table.name)?;
            let mut product = 1.0;
            for &col in group_key {
                let histogram = stats.histogram(scan.stored_ordinal(col)?)?;
                product = saturating_product([product, histogram.distinct_values() as f64]);
            }
            Some(num_distinct_vals(product, table_rows))
        }
        LogicalOperator::Filter(n) => mq.population_size(n.get_one_child_exact().ok()?, group_key),
        LogicalOperator::Order(n) => mq.population_size(n.get_one_child_exact().ok()?, group_key),
        LogicalOperator::SemiJoin(n) => {
            mq.population_size(n.get_two_children_exact().ok()?.0, group_key)
        }
        LogicalOperator::SetOp(setop) => match setop.as_ref().kind {
            SetOpKind::Union => {
                let mut total = 0.0;
                for child in setop.get_nary_children(2).ok()? {
                    total = saturating_add(total, mq.population_size(child, group_key)?);
                }
                Some(total)
            }
            SetOpKind::Intersect | SetOpKind::Except => None,
        },
        LogicalOperator::Aggregate(agg) => {
            let child = agg.get_one_child_exact().ok()?;
            let agg = agg.as_ref();
            let groups = &agg.group_columns;

            let mut child_key = Vec::new();
            for &col in group_key {
                match groups.get(col) {
                    Some(&input) => child_key.push(input),
                    None => child_key.extend(&agg.aggregates.get(col - groups.len())?.inputs),
                }
            }
            mq.population_size(child, &child_key)
        }
        LogicalOperator::Join(join) => {
            let (left, right) = join.get_two_children_exact().ok()?;
            let left_len = left.output_len()?;

            let (left_key, right_key): (Vec<usize>, Vec<usize>) =
                group_key.iter().copied().partition(|&col| col < left_len);
            let right_key: Vec<usize> = right_key.into_iter().map(|col| col - left_len).collect();

            let left_size = mq.population_size(left, &left_key)?;
            let right_size = mq.population_size(right, &right_key)?;
            Some(num_distinct_vals(
                saturating_product([left_size, right_size]),
                mq.row_count(node)?,
            ))
        }
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

            let size = mq.population_size(child, &base)?;
            if derived.is_empty() {
                return Some(size);
            }

            let mut product = size;
            for expr in derived {
                product = saturating_product([product, cardinality_of_expr(mq, child, expr)?]);
            }
            Some(num_distinct_vals(product, mq.row_count(node)?))
        }
        LogicalOperator::Extension(_) => None,
    }
}

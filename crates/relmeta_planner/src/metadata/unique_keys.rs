use std::collections::BTreeSet;
use std::fmt;

use fmtutil::IntoDisplayableSlice;

use super::util::EquiJoinColumns;
use super::MetadataQuery;
use crate::logical::operator::{LogicalOperator, PlanRef, SetOpKind};

/// A set of output columns whose values are unique across all rows.
///
/// The empty key means the node produces at most one row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct UniqueKey(BTreeSet<usize>);

impl UniqueKey {
    pub fn new(columns: impl IntoIterator<Item = usize>) -> Self {
        UniqueKey(columns.into_iter().collect())
    }

    pub fn columns(&self) -> &BTreeSet<usize> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check if every column of the key is in `columns`, meaning `columns`
    /// is unique as well.
    pub fn is_covered_by(&self, columns: &[usize]) -> bool {
        self.0.iter().all(|col| columns.contains(col))
    }

    /// Map every column of the key, returning None if any column has no
    /// mapping.
    fn try_map(&self, mut func: impl FnMut(usize) -> Option<usize>) -> Option<UniqueKey> {
        self.0
            .iter()
            .map(|&col| func(col))
            .collect::<Option<BTreeSet<_>>>()
            .map(UniqueKey)
    }
}

impl fmt::Display for UniqueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cols: Vec<_> = self.0.iter().collect();
        write!(f, "{}", cols.display_as_set())
    }
}

/// Remove keys that are supersets of some other key.
pub fn minimize(keys: BTreeSet<UniqueKey>) -> BTreeSet<UniqueKey> {
    keys.iter()
        .filter(|key| {
            !keys
                .iter()
                .any(|other| other != *key && other.0.is_subset(&key.0))
        })
        .cloned()
        .collect()
}

/// Built-in unique key rules.
pub(crate) fn unique_keys(mq: &MetadataQuery, node: &PlanRef) -> Option<BTreeSet<UniqueKey>> {
    match node.as_ref() {
        LogicalOperator::Scan(scan) => {
            let scan = scan.as_ref();
            let mut keys: BTreeSet<UniqueKey> = scan
                .table
                .unique_keys
                .iter()
                .filter_map(|key| {
                    key.iter()
                        .map(|&ord| scan.output_position(ord))
                        .collect::<Option<BTreeSet<_>>>()
                        .map(UniqueKey)
                })
                .collect();
            if let Some(pos) = scan
                .table
                .row_id_ordinal()
                .and_then(|ord| scan.output_position(ord))
            {
                keys.insert(UniqueKey::new([pos]));
            }
            Some(keys)
        }
        LogicalOperator::Filter(n) => mq.unique_keys(n.get_one_child_exact().ok()?),
        LogicalOperator::Order(n) => mq.unique_keys(n.get_one_child_exact().ok()?),
        LogicalOperator::SemiJoin(n) => mq.unique_keys(n.get_two_children_exact().ok()?.0),
        LogicalOperator::Project(project) => {
            // A key survives only if all of its columns are projected as
            // bare references.
            let child_keys = mq.unique_keys(project.get_one_child_exact().ok()?)?;
            Some(
                child_keys
                    .iter()
                    .filter_map(|key| key.try_map(|col| project.as_ref().bare_column_position(col)))
                    .collect(),
            )
        }
        LogicalOperator::Aggregate(agg) => {
            let groups = agg.as_ref().group_count();
            Some([UniqueKey::new(0..groups)].into())
        }
        LogicalOperator::SetOp(setop) => {
            let first = setop.get_nary_children(2).ok()?.first()?;
            let setop = setop.as_ref();
            match (setop.kind, setop.all) {
                (SetOpKind::Union, true) => Some(BTreeSet::new()),
                (SetOpKind::Union, false) => {
                    Some([UniqueKey::new(0..node.output_len()?)].into())
                }
                (SetOpKind::Intersect | SetOpKind::Except, true) => mq.unique_keys(first),
                (SetOpKind::Intersect | SetOpKind::Except, false) => {
                    // Rows only come from the first input.
                    let mut keys = mq.unique_keys(first).unwrap_or_default();
                    keys.insert(UniqueKey::new(0..node.output_len()?));
                    Some(keys)
                }
            }
        }
        LogicalOperator::Join(join) => {
            let (left, right) = join.get_two_children_exact().ok()?;
            let left_len = left.output_len()?;
            let left_keys = mq.unique_keys(left);
            let right_keys = mq.unique_keys(right);
            if left_keys.is_none() && right_keys.is_none() {
                return None;
            }

            let join_type = join.as_ref().join_type;
            let equi = EquiJoinColumns::split(join.as_ref().condition.as_ref(), left_len);
            let right_unique = !equi.is_empty()
                && mq.are_columns_unique(right, &equi.right) == Some(true);
            let left_unique =
                !equi.is_empty() && mq.are_columns_unique(left, &equi.left) == Some(true);

            let mut keys = BTreeSet::new();
            let left_keys = left_keys.unwrap_or_default();
            let right_keys: BTreeSet<UniqueKey> = right_keys
                .unwrap_or_default()
                .iter()
                .filter_map(|key| key.try_map(|col| Some(col + left_len)))
                .collect();

            // Each left row matches at most one right row.
            if right_unique && !join_type.generates_nulls_on_left() {
                keys.extend(left_keys.iter().cloned());
            }
            if left_unique && !join_type.generates_nulls_on_right() {
                keys.extend(right_keys.iter().cloned());
            }
            if !join_type.preserves_left() && !join_type.preserves_right() {
                for l in &left_keys {
                    for r in &right_keys {
                        keys.insert(UniqueKey(l.0.union(&r.0).copied().collect()));
                    }
                }
            }

            // Row ids are never joined on, keys built from them are useless
            // above a join.
            keys.retain(|key| {
                !key.0.iter().any(|&col| {
                    mq.column_origins(node, col)
                        .is_some_and(|origins| origins.iter().any(|o| o.is_row_id()))
                })
            });

            Some(keys)
        }
        LogicalOperator::Extension(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimize_supersets() {
        let keys: BTreeSet<_> = [
            UniqueKey::new([0, 1]),
            UniqueKey::new([0]),
            UniqueKey::new([2, 3]),
            UniqueKey::new([1, 2, 3]),
        ]
        .into();

        let expected: BTreeSet<_> = [UniqueKey::new([0]), UniqueKey::new([2, 3])].into();
        assert_eq!(expected, minimize(keys));
    }

    #[test]
    fn empty_key_covers_everything() {
        let keys: BTreeSet<_> = [UniqueKey::default(), UniqueKey::new([1])].into();
        let minimized = minimize(keys);
        assert_eq!(1, minimized.len());
        assert!(minimized.iter().all(|k| k.is_empty()));
        assert!(UniqueKey::default().is_covered_by(&[]));
    }

    #[test]
    fn covered_by() {
        let key = UniqueKey::new([2, 3]);
        assert!(key.is_covered_by(&[1, 2, 3]));
        assert!(!key.is_covered_by(&[2]));
        assert_eq!("{2, 3}", key.to_string());
    }
}

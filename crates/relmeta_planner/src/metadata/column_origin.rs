use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::MetadataQuery;
use crate::logical::operator::{LogicalOperator, PlanRef};
use crate::logical::table::TableDescriptor;

/// A stored table column an output column's values come from.
///
/// Origins are compared by table name, stored ordinal and whether the values
/// are derived.
#[derive(Debug, Clone)]
pub struct ColumnOrigin {
    pub table: Arc<TableDescriptor>,
    /// Stored ordinal of the column.
    pub column: usize,
    /// Whether values are computed from the column rather than copied.
    pub derived: bool,
}

impl ColumnOrigin {
    pub fn new(table: Arc<TableDescriptor>, column: usize, derived: bool) -> Self {
        ColumnOrigin {
            table,
            column,
            derived,
        }
    }

    pub fn is_row_id(&self) -> bool {
        self.table.is_row_id(self.column)
    }

    fn as_derived(&self) -> Self {
        ColumnOrigin {
            derived: true,
            ..self.clone()
        }
    }

    fn sort_key(&self) -> (&str, usize, bool) {
        (&self.table.name, self.column, self.derived)
    }
}

impl PartialEq for ColumnOrigin {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key() == other.sort_key()
    }
}

impl Eq for ColumnOrigin {}

impl PartialOrd for ColumnOrigin {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ColumnOrigin {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl Hash for ColumnOrigin {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.sort_key().hash(state)
    }
}

impl fmt::Display for ColumnOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .table
            .field(self.column)
            .map(|field| field.name)
            .unwrap_or_else(|| format!("#{}", self.column));
        write!(f, "{}.{}", self.table.name, name)?;
        if self.derived {
            write!(f, " (derived)")?;
        }
        Ok(())
    }
}

/// Built-in column lineage rules.
pub(crate) fn column_origins(
    mq: &MetadataQuery,
    node: &PlanRef,
    column: usize,
) -> Option<BTreeSet<ColumnOrigin>> {
    match node.as_ref() {
        LogicalOperator::Scan(scan) => {
            let scan = scan.as_ref();
            let stored = scan.stored_ordinal(column)?;
            Some([ColumnOrigin::new(scan.table.clone(), stored, false)].into())
        }
        LogicalOperator::Filter(n) => mq.column_origins(n.get_one_child_exact().ok()?, column),
        LogicalOperator::Order(n) => mq.column_origins(n.get_one_child_exact().ok()?, column),
        LogicalOperator::SemiJoin(n) => {
            mq.column_origins(n.get_two_children_exact().ok()?.0, column)
        }
        LogicalOperator::Project(project) => {
            let child = project.get_one_child_exact().ok()?;
            let expr = project.as_ref().projections.get(column)?;
            if let Some(input) = expr.as_column() {
                return mq.column_origins(child, input);
            }

            // Computed expressions derive from every column they read.
            let mut origins = BTreeSet::new();
            for input in expr.column_refs() {
                let input_origins = mq.column_origins(child, input)?;
                origins.extend(input_origins.iter().map(ColumnOrigin::as_derived));
            }
            Some(origins)
        }
        LogicalOperator::Join(join) => {
            let (left, right) = join.get_two_children_exact().ok()?;
            let left_len = left.output_len()?;
            if column < left_len {
                mq.column_origins(left, column)
            } else {
                mq.column_origins(right, column - left_len)
            }
        }
        LogicalOperator::Aggregate(_) | LogicalOperator::SetOp(_) => None,
        LogicalOperator::Extension(_) => None,
    }
}

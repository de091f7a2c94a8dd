use std::fmt;
use std::sync::Arc;

use relmeta_error::{RelmetaError, Result};
use relmeta_types::field::Schema;

use super::logical_aggregate::LogicalAggregate;
use super::logical_extension::{ExtensionOperator, LogicalExtension};
use super::logical_filter::LogicalFilter;
use super::logical_join::LogicalJoin;
use super::logical_order::LogicalOrder;
use super::logical_project::LogicalProject;
use super::logical_scan::LogicalScan;
use super::logical_semijoin::LogicalSemiJoin;
use super::logical_setop::LogicalSetop;

/// Shared reference to a node in the plan.
///
/// Plans are DAGs, the same subtree may be referenced by multiple parents.
/// Identity of a node for memoization purposes is the address of the
/// allocation behind this `Arc`.
pub type PlanRef = Arc<LogicalOperator>;

/// Wrapper around nodes in the logical plan holding the node's inputs.
#[derive(Debug, Clone)]
pub struct Node<N> {
    /// Node specific logic.
    pub node: N,
    /// Inputs to this node.
    pub children: Vec<PlanRef>,
}

impl<N> Node<N> {
    pub fn new(node: N, children: impl IntoIterator<Item = PlanRef>) -> Self {
        Node {
            node,
            children: children.into_iter().collect(),
        }
    }

    pub fn into_inner(self) -> N {
        self.node
    }

    pub fn get_one_child_exact(&self) -> Result<&PlanRef> {
        if self.children.len() != 1 {
            return Err(RelmetaError::new(format!(
                "Expected 1 child to operator, have {}",
                self.children.len()
            )));
        }
        Ok(&self.children[0])
    }

    pub fn get_two_children_exact(&self) -> Result<(&PlanRef, &PlanRef)> {
        if self.children.len() != 2 {
            return Err(RelmetaError::new(format!(
                "Expected 2 children to operator, have {}",
                self.children.len()
            )));
        }
        Ok((&self.children[0], &self.children[1]))
    }

    pub fn get_nary_children(&self, min: usize) -> Result<&[PlanRef]> {
        if self.children.len() < min {
            return Err(RelmetaError::new(format!(
                "Expected at least {min} children to operator, have {}",
                self.children.len()
            )));
        }
        Ok(&self.children)
    }
}

impl<N> AsRef<N> for Node<N> {
    fn as_ref(&self) -> &N {
        &self.node
    }
}

impl<N> AsMut<N> for Node<N> {
    fn as_mut(&mut self) -> &mut N {
        &mut self.node
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetOpKind {
    Union,
    Except,
    Intersect,
}

impl fmt::Display for SetOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Union => write!(f, "UNION"),
            Self::Except => write!(f, "EXCEPT"),
            Self::Intersect => write!(f, "INTERSECT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinType {
    /// Whether rows from the left side are always produced.
    pub const fn preserves_left(&self) -> bool {
        matches!(self, Self::Left | Self::Full)
    }

    /// Whether rows from the right side are always produced.
    pub const fn preserves_right(&self) -> bool {
        matches!(self, Self::Right | Self::Full)
    }

    /// Whether the left side may produce null-extended rows.
    pub const fn generates_nulls_on_left(&self) -> bool {
        self.preserves_right()
    }

    /// Whether the right side may produce null-extended rows.
    pub const fn generates_nulls_on_right(&self) -> bool {
        self.preserves_left()
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inner => write!(f, "INNER"),
            Self::Left => write!(f, "LEFT"),
            Self::Right => write!(f, "RIGHT"),
            Self::Full => write!(f, "FULL"),
        }
    }
}

/// Stable token identifying the kind of an operator.
///
/// Metadata providers are registered against these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    Scan,
    Filter,
    Project,
    Order,
    Aggregate,
    SetOp(SetOpKind),
    Join,
    SemiJoin,
    Extension(&'static str),
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scan => write!(f, "Scan"),
            Self::Filter => write!(f, "Filter"),
            Self::Project => write!(f, "Project"),
            Self::Order => write!(f, "Order"),
            Self::Aggregate => write!(f, "Aggregate"),
            Self::SetOp(kind) => write!(f, "SetOp({kind})"),
            Self::Join => write!(f, "Join"),
            Self::SemiJoin => write!(f, "SemiJoin"),
            Self::Extension(name) => write!(f, "Extension({name})"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum LogicalOperator {
    Scan(Node<LogicalScan>),
    Filter(Node<LogicalFilter>),
    Project(Node<LogicalProject>),
    Order(Node<LogicalOrder>),
    Aggregate(Node<LogicalAggregate>),
    SetOp(Node<LogicalSetop>),
    Join(Node<LogicalJoin>),
    SemiJoin(Node<LogicalSemiJoin>),
    Extension(Node<LogicalExtension>),
}

impl LogicalOperator {
    pub fn scan(scan: LogicalScan) -> PlanRef {
        Arc::new(Self::Scan(Node::new(scan, [])))
    }

    pub fn filter(filter: LogicalFilter, input: PlanRef) -> PlanRef {
        Arc::new(Self::Filter(Node::new(filter, [input])))
    }

    pub fn project(project: LogicalProject, input: PlanRef) -> PlanRef {
        Arc::new(Self::Project(Node::new(project, [input])))
    }

    pub fn order(order: LogicalOrder, input: PlanRef) -> PlanRef {
        Arc::new(Self::Order(Node::new(order, [input])))
    }

    pub fn aggregate(agg: LogicalAggregate, input: PlanRef) -> PlanRef {
        Arc::new(Self::Aggregate(Node::new(agg, [input])))
    }

    pub fn setop(setop: LogicalSetop, inputs: impl IntoIterator<Item = PlanRef>) -> PlanRef {
        Arc::new(Self::SetOp(Node::new(setop, inputs)))
    }

    pub fn join(join: LogicalJoin, left: PlanRef, right: PlanRef) -> PlanRef {
        Arc::new(Self::Join(Node::new(join, [left, right])))
    }

    pub fn semi_join(semi: LogicalSemiJoin, left: PlanRef, right: PlanRef) -> PlanRef {
        Arc::new(Self::SemiJoin(Node::new(semi, [left, right])))
    }

    pub fn extension(
        op: Box<dyn ExtensionOperator>,
        inputs: impl IntoIterator<Item = PlanRef>,
    ) -> PlanRef {
        Arc::new(Self::Extension(Node::new(LogicalExtension { op }, inputs)))
    }

    pub fn kind(&self) -> OperatorKind {
        match self {
            Self::Scan(_) => OperatorKind::Scan,
            Self::Filter(_) => OperatorKind::Filter,
            Self::Project(_) => OperatorKind::Project,
            Self::Order(_) => OperatorKind::Order,
            Self::Aggregate(_) => OperatorKind::Aggregate,
            Self::SetOp(n) => OperatorKind::SetOp(n.node.kind),
            Self::Join(_) => OperatorKind::Join,
            Self::SemiJoin(_) => OperatorKind::SemiJoin,
            Self::Extension(n) => OperatorKind::Extension(n.node.op.name()),
        }
    }

    pub fn children(&self) -> &[PlanRef] {
        match self {
            Self::Scan(n) => &n.children,
            Self::Filter(n) => &n.children,
            Self::Project(n) => &n.children,
            Self::Order(n) => &n.children,
            Self::Aggregate(n) => &n.children,
            Self::SetOp(n) => &n.children,
            Self::Join(n) => &n.children,
            Self::SemiJoin(n) => &n.children,
            Self::Extension(n) => &n.children,
        }
    }

    /// Get the output schema of the operator.
    pub fn output_schema(&self) -> Result<Schema> {
        match self {
            Self::Scan(n) => n.as_ref().output_schema(),
            Self::Filter(n) => n.get_one_child_exact()?.output_schema(),
            Self::Order(n) => n.get_one_child_exact()?.output_schema(),
            Self::Project(n) => {
                let input = n.get_one_child_exact()?.output_schema()?;
                n.as_ref().output_schema(&input)
            }
            Self::Aggregate(n) => {
                let input = n.get_one_child_exact()?.output_schema()?;
                n.as_ref().output_schema(&input)
            }
            Self::SetOp(n) => {
                let children = n.get_nary_children(2)?;
                let first = children[0].output_schema()?;
                for child in &children[1..] {
                    let schema = child.output_schema()?;
                    if schema.len() != first.len() {
                        return Err(RelmetaError::new(format!(
                            "Set operation inputs have different column counts: {} and {}",
                            first.len(),
                            schema.len()
                        )));
                    }
                }
                Ok(first)
            }
            Self::Join(n) => {
                let (left, right) = n.get_two_children_exact()?;
                let mut left = left.output_schema()?;
                let mut right = right.output_schema()?;
                let join_type = n.as_ref().join_type;
                if join_type.generates_nulls_on_left() {
                    left.fields.iter_mut().for_each(|f| f.nullable = true);
                }
                if join_type.generates_nulls_on_right() {
                    right.fields.iter_mut().for_each(|f| f.nullable = true);
                }
                Ok(left.merge(right))
            }
            Self::SemiJoin(n) => n.get_two_children_exact()?.0.output_schema(),
            Self::Extension(n) => {
                let children = n
                    .children
                    .iter()
                    .map(|c| c.output_schema())
                    .collect::<Result<Vec<_>>>()?;
                n.as_ref().op.output_schema(&children)
            }
        }
    }

    /// Number of output columns, None if the schema cannot be computed.
    pub fn output_len(&self) -> Option<usize> {
        match self {
            Self::Scan(n) => Some(n.as_ref().output_len()),
            Self::Project(n) => Some(n.as_ref().projections.len()),
            Self::Aggregate(n) => {
                Some(n.as_ref().group_columns.len() + n.as_ref().aggregates.len())
            }
            Self::Filter(_) | Self::Order(_) | Self::SetOp(_) => {
                self.children().first().and_then(|c| c.output_len())
            }
            Self::SemiJoin(n) => n.children.first().and_then(|c| c.output_len()),
            Self::Join(n) => {
                let (left, right) = n.get_two_children_exact().ok()?;
                Some(left.output_len()? + right.output_len()?)
            }
            Self::Extension(_) => self.output_schema().ok().map(|s| s.len()),
        }
    }

    /// Format this operator and its inputs as an indented tree.
    pub fn format_tree(&self) -> String {
        fn inner(op: &LogicalOperator, depth: usize, buf: &mut String) {
            buf.push_str(&"  ".repeat(depth));
            buf.push_str(&op.to_string());
            buf.push('\n');
            for child in op.children() {
                inner(child, depth + 1, buf);
            }
        }

        let mut buf = String::new();
        inner(self, 0, &mut buf);
        buf
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scan(n) => write!(f, "{}", n.node),
            Self::Filter(n) => write!(f, "{}", n.node),
            Self::Project(n) => write!(f, "{}", n.node),
            Self::Order(n) => write!(f, "{}", n.node),
            Self::Aggregate(n) => write!(f, "{}", n.node),
            Self::SetOp(n) => write!(f, "{}", n.node),
            Self::Join(n) => write!(f, "{}", n.node),
            Self::SemiJoin(n) => write!(f, "{}", n.node),
            Self::Extension(n) => write!(f, "{}", n.node.op.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use relmeta_types::datatype::DataType;
    use relmeta_types::field::Field;

    use super::*;
    use crate::expr::comparison_expr::ComparisonOperator;
    use crate::expr::Expression;
    use crate::logical::table::TableDescriptor;

    fn scan(name: &str) -> PlanRef {
        let table = TableDescriptor::new(
            name,
            [
                Field::new("id", DataType::Int64, false),
                Field::new("v", DataType::Utf8, false),
            ],
        );
        LogicalOperator::scan(LogicalScan::new(Arc::new(table)))
    }

    #[test]
    fn left_join_schema_nullable_right() {
        let join = LogicalOperator::join(
            LogicalJoin {
                join_type: JoinType::Left,
                condition: Some(Expression::compare(
                    ComparisonOperator::Eq,
                    Expression::column(0),
                    Expression::column(2),
                )),
            },
            scan("a"),
            scan("b"),
        );

        let schema = join.output_schema().unwrap();
        let nullable: Vec<_> = schema.fields.iter().map(|f| f.nullable).collect();
        assert_eq!(vec![false, false, true, true], nullable);
        assert_eq!(Some(4), join.output_len());
        assert_eq!(OperatorKind::Join, join.kind());
    }

    #[test]
    fn setop_requires_two_inputs() {
        let setop = LogicalOperator::setop(
            LogicalSetop {
                kind: SetOpKind::Union,
                all: true,
            },
            [scan("a")],
        );
        assert!(setop.output_schema().is_err());
        assert_eq!(OperatorKind::SetOp(SetOpKind::Union), setop.kind());
    }

    #[test]
    fn format_tree_indents_children() {
        let filter = LogicalOperator::filter(
            LogicalFilter {
                filter: Expression::compare(
                    ComparisonOperator::Gt,
                    Expression::column(0),
                    Expression::literal(4_i64),
                ),
            },
            scan("a"),
        );
        assert_eq!("Filter(#0 > 4)\n  Scan(a)\n", filter.format_tree());
    }
}

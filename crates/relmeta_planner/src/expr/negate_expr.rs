use std::fmt;

use super::Expression;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NegateOperator {
    /// Boolean negation.
    Not,
    /// Numeric negation.
    Negate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NegateExpr {
    pub op: NegateOperator,
    pub expr: Box<Expression>,
}

impl fmt::Display for NegateExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            NegateOperator::Not => write!(f, "NOT {}", self.expr),
            NegateOperator::Negate => write!(f, "-{}", self.expr),
        }
    }
}

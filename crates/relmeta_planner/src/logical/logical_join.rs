use std::fmt;

use super::operator::JoinType;
use crate::expr::Expression;

/// Join of exactly two inputs.
///
/// The condition references the concatenation of the left and right columns,
/// so right column `i` is addressed as `left_len + i`. A missing condition is
/// a cross join.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalJoin {
    pub join_type: JoinType,
    pub condition: Option<Expression>,
}

impl fmt::Display for LogicalJoin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.condition {
            Some(cond) => write!(f, "Join({}, {})", self.join_type, cond),
            None => write!(f, "Join({})", self.join_type),
        }
    }
}

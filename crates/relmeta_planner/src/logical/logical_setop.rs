use std::fmt;

use super::operator::SetOpKind;

/// Set operation over two or more inputs with identical row types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalSetop {
    pub kind: SetOpKind,
    pub all: bool,
}

impl fmt::Display for LogicalSetop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind, if self.all { " ALL" } else { "" })
    }
}

use std::fmt;

/// Reference to a column in the input of an operator.
///
/// For operators with multiple inputs (joins), the index is into the
/// concatenation of all input columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnExpr {
    pub column: usize,
}

impl fmt::Display for ColumnExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.column)
    }
}

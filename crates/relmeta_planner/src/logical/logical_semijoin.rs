use std::fmt;

use fmtutil::IntoDisplayableSlice;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemiJoinKind {
    /// Keep left rows with at least one match on the right.
    Semi,
    /// Keep left rows without any match on the right.
    Anti,
}

impl fmt::Display for SemiJoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Semi => write!(f, "SEMI"),
            Self::Anti => write!(f, "ANTI"),
        }
    }
}

/// Filters the left input by the keys present in the right input.
///
/// Only produces left columns. Keys are equi-join columns, `left_keys[i]`
/// matched against `right_keys[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalSemiJoin {
    pub kind: SemiJoinKind,
    pub left_keys: Vec<usize>,
    pub right_keys: Vec<usize>,
}

impl fmt::Display for LogicalSemiJoin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SemiJoin({}, left={}, right={})",
            self.kind,
            self.left_keys.display_with_brackets(),
            self.right_keys.display_with_brackets()
        )
    }
}

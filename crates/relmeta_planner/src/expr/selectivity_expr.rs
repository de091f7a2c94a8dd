use std::fmt;

/// A costing-only conjunct carrying a precomputed selectivity.
///
/// Used to push the filtering effect of a semijoin down into the input it
/// reduces. Never sargable, never executed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectivityExpr {
    pub selectivity: f64,
}

impl fmt::Display for SelectivityExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECTIVITY({})", self.selectivity)
    }
}

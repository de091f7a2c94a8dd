//! Search arguments: predicates compiled to ranges of column values.

pub mod analyzer;
pub mod interval;
pub mod sequence;

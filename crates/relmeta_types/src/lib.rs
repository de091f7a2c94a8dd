//! Logical types and typed scalar values for predicates and statistics.
pub mod datatype;
pub mod field;
pub mod parse;
pub mod scalar;

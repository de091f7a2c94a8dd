//! Relational metadata and cost estimation for a cost-based planner.
//!
//! Plans are built from `logical` operators over tables described by
//! `TableDescriptor`s. Statistics for those tables are supplied through a
//! `StatisticsSource` and every estimate is requested through a
//! `MetadataQuery`.

pub mod config;
pub mod cost;
pub mod expr;
pub mod logical;
pub mod metadata;
pub mod sarg;
pub mod statistics;
pub mod testutil;

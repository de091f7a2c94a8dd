pub mod logical_aggregate;
pub mod logical_extension;
pub mod logical_filter;
pub mod logical_join;
pub mod logical_order;
pub mod logical_project;
pub mod logical_scan;
pub mod logical_semijoin;
pub mod logical_setop;
pub mod operator;
pub mod table;

pub mod cell;
pub mod column_spec;
pub mod completeness;
pub mod merge;
pub mod occurrence;
pub mod reshape;

//! Reason classification and the summary views built on normalized records.
//!
//! Every query here is a pure function of the records it is given: the
//! same input always yields the same [`types::AggregationView`].

pub mod aggregate;
pub mod analyzer;
pub mod bucket;
pub mod classify;
pub mod types;
pub mod utility;
pub mod weekly;

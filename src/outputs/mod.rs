//! Output generation for discovery runs.
//!
//! - [`json`]: writes the merged [`DiscoveryReport`](crate::models::DiscoveryReport)
//!   for downstream consumers (summarization, storage)

pub mod json;

//! Page observation: the port the discovery loop reads pages through.
//!
//! A [`SnapshotFetcher`] owns one browsing session. The discovery loop asks
//! it to perform an optional [`NavigationAction`] and hand back the page's
//! text; how the page gets rendered is entirely up to the implementation.
//!
//! # Implementations
//!
//! | Fetcher | Module | Notes |
//! |---------|--------|-------|
//! | HTTP + HTML | [`http`] | Static pages; clicks follow `href`s, scrolls re-read the document |
//!
//! Failures are ordinary values here. An `Err` or a snapshot with
//! `success: false` is treated by the loop as an empty observation.

use crate::models::{NavigationAction, Snapshot};
use std::error::Error;

pub mod http;

pub use http::HttpSnapshotFetcher;

/// Observe a page after optionally acting on it.
pub trait SnapshotFetcher {
    /// Perform `action` (none on the first observation) and return the page text.
    ///
    /// With `reuse_session` the current page state is continued (required for
    /// scroll continuity); otherwise `url` is loaded fresh.
    async fn observe(
        &mut self,
        url: &str,
        action: Option<&NavigationAction>,
        reuse_session: bool,
    ) -> Result<Snapshot, Box<dyn Error>>;
}

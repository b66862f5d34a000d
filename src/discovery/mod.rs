//! Exploratory discovery of dated items on listing pages.
//!
//! # Submodules
//!
//! - [`voter`]: resolves one publication date per item from weighted hints
//! - [`outliers`]: drops items whose date is implausible for their batch
//! - [`differ`]: feeds only newly appended lines on same-page scrolls
//! - [`controller`]: the per-URL observe/extract/decide loop
//!
//! Several listing URLs are explored concurrently by [`discover_all`]; each
//! loop owns its own fetcher and state, and results are merged only after
//! every loop has finished.

pub mod controller;
pub mod differ;
pub mod outliers;
pub mod voter;

use crate::config::DiscoveryConfig;
use crate::extract::CandidateExtractor;
use crate::models::{DiscoveryOutcome, DiscoveryRequest, ResolvedArticle};
use crate::scrapers::SnapshotFetcher;
use chrono::NaiveDate;
use controller::NavigationController;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use std::cmp::Reverse;
use tracing::{info, instrument};

/// Run one discovery loop per request, at most `config.concurrency` at a time.
///
/// `make_fetcher` is called once per request so no browsing session is ever
/// shared. Outcomes come back in request order.
#[instrument(level = "info", skip_all, fields(requests = requests.len()))]
pub async fn discover_all<F, E, M>(
    requests: Vec<DiscoveryRequest>,
    make_fetcher: M,
    extractor: &E,
    config: &DiscoveryConfig,
    today: NaiveDate,
) -> Vec<DiscoveryOutcome>
where
    F: SnapshotFetcher,
    E: CandidateExtractor,
    M: Fn(&DiscoveryRequest) -> F,
{
    let outcomes: Vec<DiscoveryOutcome> = stream::iter(requests)
        .map(|request| {
            let fetcher = make_fetcher(&request);
            async move {
                let mut controller = NavigationController::new(fetcher, extractor, config, today);
                controller.run(&request).await
            }
        })
        .buffered(config.concurrency.max(1))
        .collect()
        .await;

    info!(
        sources = outcomes.len(),
        collected = outcomes.iter().map(|o| o.collected.len()).sum::<usize>(),
        "All discovery runs finished"
    );
    outcomes
}

/// Merge collected items across runs: first occurrence of a URL wins, newest first.
pub fn merge_outcomes(outcomes: &[DiscoveryOutcome]) -> Vec<ResolvedArticle> {
    let mut merged: Vec<ResolvedArticle> = outcomes
        .iter()
        .flat_map(|o| o.collected.iter().cloned())
        .unique_by(|a| a.url.clone())
        .collect();
    merged.sort_by_key(|a| Reverse(a.publication_date));
    merged
}

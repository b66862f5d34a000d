//! The discovery loop.
//!
//! One [`NavigationController`] explores one listing URL. Each iteration
//! observes the page (after the pending action), extracts candidates from
//! the full text or the scroll delta, votes a date for each, drops date
//! outliers, keeps what falls inside the window, and then either stops for a
//! named [`StopReason`] or picks the next action.
//!
//! Collaborator failures never escape: a failed fetch or a malformed
//! extraction is an empty observation, which feeds the same fallback path as
//! a page that simply had nothing new.

use super::differ::IncrementalDiffer;
use super::outliers::{OutlierBounds, filter_outliers};
use super::voter::resolve;
use crate::config::DiscoveryConfig;
use crate::extract::CandidateExtractor;
use crate::models::{
    ArticleCandidate, DateCandidate, DateSource, DiscoveryOutcome, DiscoveryRequest, ExtractionResult,
    NavigationAction, ResolvedArticle, StopReason,
};
use crate::scrapers::SnapshotFetcher;
use crate::utils::{truncate_chars, url_path_date};
use chrono::{Duration, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};
use url::Url;

static HREF_SELECTOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\[\s*href\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\]\s]+))\s*\]"#).expect("static regex")
});

/// Mutable bookkeeping of a single run.
#[derive(Debug, Default)]
pub struct DiscoveryState {
    /// URLs accepted into `collected`.
    pub seen_urls: HashSet<String>,
    /// `(page url, selector)` of every click handed to the fetcher.
    pub visited_actions: HashSet<(String, String)>,
    pub collected: Vec<ResolvedArticle>,
    pub all_articles: Vec<ResolvedArticle>,
    /// Fallback pages in a row that added no URL; any proposed action resets it.
    pub consecutive_zero_batches: u32,
    all_urls: HashSet<String>,
}

impl DiscoveryState {
    /// Append a batch to `all_articles` and accept the in-window, date-confirmed
    /// items not collected before. Returns how many were accepted.
    fn record_batch(&mut self, batch: Vec<ResolvedArticle>, request: &DiscoveryRequest, threshold: u32) -> usize {
        let mut accepted = 0;
        for article in batch {
            self.all_urls.insert(article.url.clone());
            let in_window = article
                .confirmed_date(threshold)
                .is_some_and(|d| d >= request.start_date && d <= request.end_date);
            if in_window && self.seen_urls.insert(article.url.clone()) {
                self.collected.push(article.clone());
                accepted += 1;
            }
            self.all_articles.push(article);
        }
        accepted
    }
}

/// Drives the observe/extract/decide loop for one listing URL.
///
/// The fetcher, and with it the browsing session, belongs to this controller;
/// the extractor is stateless and may be shared between controllers.
pub struct NavigationController<'a, F, E> {
    fetcher: F,
    extractor: &'a E,
    config: &'a DiscoveryConfig,
    today: NaiveDate,
}

impl<'a, F, E> NavigationController<'a, F, E>
where
    F: SnapshotFetcher,
    E: CandidateExtractor,
{
    /// `today` caps the outlier filter's upper bound.
    pub fn new(fetcher: F, extractor: &'a E, config: &'a DiscoveryConfig, today: NaiveDate) -> Self {
        Self {
            fetcher,
            extractor,
            config,
            today,
        }
    }

    /// Explore `request.url` until a stop condition fires.
    ///
    /// Always returns; partial results are valid results.
    #[instrument(level = "info", skip_all, fields(url = %request.url, start = %request.start_date, end = %request.end_date))]
    pub async fn run(&mut self, request: &DiscoveryRequest) -> DiscoveryOutcome {
        let threshold = self.config.consensus_threshold;
        let cutoff = Duration::try_days(self.config.date_threshold_margin_days)
            .and_then(|margin| request.start_date.checked_sub_signed(margin))
            .unwrap_or(NaiveDate::MIN);

        let mut state = DiscoveryState::default();
        let mut differ = IncrementalDiffer::new();
        let mut current_url = request.url.clone();
        let mut pending: Option<NavigationAction> = None;
        let mut fresh_session = true;
        let mut pages = 0usize;

        let stop_reason = loop {
            if let Some(NavigationAction::Click { selector }) = &pending {
                if state.visited_actions.contains(&(current_url.clone(), selector.clone())) {
                    break StopReason::ActionAlreadyVisited;
                }
            }
            if pages >= self.config.max_pages {
                break StopReason::MaxPages;
            }
            pages += 1;

            let same_page_scroll = matches!(pending, Some(NavigationAction::Scroll));
            let observed = self.observe(&current_url, pending.as_ref(), !fresh_session).await;
            if let Some(NavigationAction::Click { selector }) = &pending {
                state.visited_actions.insert((current_url.clone(), selector.clone()));
            }

            let extraction = match observed {
                Some((resolved_url, text)) => {
                    if !resolved_url.is_empty() {
                        current_url = resolved_url;
                    }
                    let input = differ.prepare(&current_url, &text, same_page_scroll);
                    self.extract(&input).await
                }
                None => ExtractionResult::default(),
            };

            let batch = self.resolve_batch(extraction.articles, &current_url);
            let batch_size = batch.len();
            let has_new_urls = batch.iter().any(|a| !state.all_urls.contains(&a.url));
            let all_already_collected =
                !batch.is_empty() && batch.iter().all(|a| state.seen_urls.contains(&a.url));
            let oldest_confirmed = batch.iter().filter_map(|a| a.confirmed_date(threshold)).min();

            let accepted = state.record_batch(batch, request, threshold);
            info!(
                page = pages,
                url = %current_url,
                batch = batch_size,
                accepted,
                collected = state.collected.len(),
                oldest = ?oldest_confirmed,
                "Processed page"
            );

            if oldest_confirmed.is_some_and(|d| d <= cutoff) {
                break StopReason::DateThreshold;
            }
            if all_already_collected {
                break StopReason::DuplicateContent;
            }
            if pages >= self.config.max_pages {
                break StopReason::MaxPages;
            }

            if extraction.next_action.is_some() {
                state.consecutive_zero_batches = 0;
            }
            match extraction.next_action {
                Some(NavigationAction::Click { selector }) => match direct_link(&current_url, &selector) {
                    Some(target) => {
                        if !state.visited_actions.insert((current_url.clone(), selector.clone())) {
                            break StopReason::ActionAlreadyVisited;
                        }
                        debug!(%selector, %target, "Click resolves to a direct link");
                        current_url = target;
                        pending = None;
                        fresh_session = true;
                    }
                    None => {
                        pending = Some(NavigationAction::Click { selector });
                        fresh_session = false;
                    }
                },
                Some(NavigationAction::Scroll) => {
                    pending = Some(NavigationAction::Scroll);
                    fresh_session = false;
                }
                None => {
                    if has_new_urls {
                        state.consecutive_zero_batches = 0;
                    } else {
                        state.consecutive_zero_batches += 1;
                        if state.consecutive_zero_batches >= self.config.zero_batch_limit {
                            break StopReason::ExhaustedContent;
                        }
                    }
                    if !self.config.fallback_scroll {
                        break StopReason::NoNavigation;
                    }
                    pending = Some(NavigationAction::Scroll);
                    fresh_session = false;
                }
            }
        };

        info!(
            %stop_reason,
            pages,
            collected = state.collected.len(),
            seen = state.all_articles.len(),
            "Discovery stopped"
        );

        DiscoveryOutcome {
            url: request.url.clone(),
            stop_reason,
            pages_visited: pages,
            collected: state.collected,
            all_articles: state.all_articles,
        }
    }

    /// Fetch a snapshot; `None` stands for an unsuccessful observation.
    async fn observe(
        &mut self,
        url: &str,
        action: Option<&NavigationAction>,
        reuse_session: bool,
    ) -> Option<(String, String)> {
        match self.fetcher.observe(url, action, reuse_session).await {
            Ok(snapshot) if snapshot.success => Some((snapshot.resolved_url, snapshot.text)),
            Ok(_) => {
                warn!(%url, action = ?action, "Fetch unsuccessful; treating as empty page");
                None
            }
            Err(e) => {
                warn!(%url, action = ?action, error = %e, "Fetch failed; treating as empty page");
                None
            }
        }
    }

    /// Run the extractor; failures and empty input yield an empty result.
    async fn extract(&self, input: &str) -> ExtractionResult {
        let input = truncate_chars(input, self.config.max_extract_chars);
        if input.trim().is_empty() {
            debug!("No new text to extract from");
            return ExtractionResult::default();
        }
        match self.extractor.extract(input).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Extraction failed; treating as empty page");
                ExtractionResult::default()
            }
        }
    }

    /// Vote a date for every candidate and drop the batch's date outliers.
    fn resolve_batch(&self, candidates: Vec<ArticleCandidate>, page_url: &str) -> Vec<ResolvedArticle> {
        let weights = &self.config.source_weights;
        let threshold = self.config.consensus_threshold;

        let resolved: Vec<ResolvedArticle> = candidates
            .into_iter()
            .map(|mut candidate| {
                candidate.url = absolutize(page_url, &candidate.url);
                if self.config.infer_url_dates {
                    add_url_path_candidate(&mut candidate);
                }
                resolve(candidate, weights, threshold)
            })
            .collect();

        let bounds = OutlierBounds {
            low_percentile: self.config.outlier_low_percentile,
            high_percentile: self.config.outlier_high_percentile,
            margin_days: self.config.outlier_margin_days,
        };
        let (inliers, outliers) = filter_outliers(resolved, &bounds, self.today);
        if !outliers.is_empty() {
            info!(count = outliers.len(), "Dropped date outliers");
        }
        inliers
    }
}

/// Add a `url-path` hint when the URL encodes a date and no such hint exists.
fn add_url_path_candidate(candidate: &mut ArticleCandidate) {
    if candidate.date_candidates.iter().any(|d| d.source == DateSource::UrlPath) {
        return;
    }
    if let Some(date) = url_path_date(&candidate.url) {
        candidate
            .date_candidates
            .push(DateCandidate::new(date.to_string(), DateSource::UrlPath));
    }
}

/// Resolve a possibly relative item URL against the page it was found on.
fn absolutize(page_url: &str, url: &str) -> String {
    let url = url.trim();
    Url::parse(page_url)
        .and_then(|base| base.join(url))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.to_string())
}

/// The navigation target encoded in a selector like `a[href="/page/2"]`.
///
/// Only exact `href=` matches count; fragments and `javascript:` links do not.
pub fn direct_link(current_url: &str, selector: &str) -> Option<String> {
    let caps = HREF_SELECTOR.captures(selector)?;
    let href = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3))?.as_str().trim();
    if href.is_empty() || href.starts_with('#') || href.to_ascii_lowercase().starts_with("javascript:") {
        return None;
    }
    let target = Url::parse(current_url).ok()?.join(href).ok()?;
    matches!(target.scheme(), "http" | "https").then(|| target.to_string())
}

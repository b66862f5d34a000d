//! Data models for listing discovery.
//!
//! This module defines the structures that flow through a discovery run:
//! - [`DateCandidate`] and [`ArticleCandidate`]: raw extractor output
//! - [`ResolvedArticle`]: a candidate after date consensus voting
//! - [`NavigationAction`]: the browser-side step to take before the next observation
//! - [`Snapshot`] and [`ExtractionResult`]: what the two collaborators hand back
//! - [`DiscoveryOutcome`] and [`DiscoveryReport`]: per-URL and merged run output
//!
//! Serialized names follow the JSON the extractor is prompted to produce,
//! so enum variants use kebab-case and accept snake_case aliases.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Provenance of a single piece of date evidence.
///
/// Declaration order doubles as the tie-break order when two sources carry
/// the same configured weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateSource {
    /// A machine-readable attribute on the item itself, e.g. `<time datetime>`.
    #[serde(alias = "explicit_attribute")]
    ExplicitAttribute,
    /// JSON-LD, microdata or OpenGraph publication fields.
    #[serde(alias = "structured_metadata")]
    StructuredMetadata,
    /// A date encoded in the item's URL path.
    #[serde(alias = "url_path")]
    UrlPath,
    /// Free text printed next to the item's title.
    #[serde(alias = "near_title_text")]
    NearTitleText,
    /// Page-level metadata that may not belong to this item.
    #[serde(alias = "generic_metadata")]
    GenericMetadata,
}

impl fmt::Display for DateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DateSource::ExplicitAttribute => "explicit-attribute",
            DateSource::StructuredMetadata => "structured-metadata",
            DateSource::UrlPath => "url-path",
            DateSource::NearTitleText => "near-title-text",
            DateSource::GenericMetadata => "generic-metadata",
        };
        f.write_str(s)
    }
}

/// One piece of evidence for an item's publication date.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DateCandidate {
    /// The date as found on the page; normalized during voting.
    pub date: String,
    pub source: DateSource,
}

impl DateCandidate {
    pub fn new(date: impl Into<String>, source: DateSource) -> Self {
        Self {
            date: date.into(),
            source,
        }
    }
}

/// A raw item as emitted by the extractor, before consensus.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ArticleCandidate {
    #[serde(default)]
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub date_candidates: Vec<DateCandidate>,
}

/// An [`ArticleCandidate`] after date consensus voting.
///
/// `publication_date` is only present when the winning score met the
/// consensus threshold; items without it are never date-confirmed.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ResolvedArticle {
    pub title: String,
    pub url: String,
    pub date_candidates: Vec<DateCandidate>,
    pub publication_date: Option<NaiveDate>,
    pub date_score: Option<u32>,
    pub date_source: Option<DateSource>,
}

impl ResolvedArticle {
    /// Build an unresolved article carrying the candidate's evidence.
    pub fn unresolved(candidate: ArticleCandidate) -> Self {
        Self {
            title: candidate.title,
            url: candidate.url,
            date_candidates: candidate.date_candidates,
            publication_date: None,
            date_score: None,
            date_source: None,
        }
    }

    /// The publication date if it is confirmed at `threshold`.
    pub fn confirmed_date(&self, threshold: u32) -> Option<NaiveDate> {
        match (self.publication_date, self.date_score) {
            (Some(date), Some(score)) if score >= threshold => Some(date),
            _ => None,
        }
    }
}

/// A browser-side operation performed before the next observation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NavigationAction {
    /// Scroll to the bottom and wait for the page to grow.
    Scroll,
    /// Click the element matched by `selector` and wait.
    Click { selector: String },
}

impl fmt::Display for NavigationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavigationAction::Scroll => f.write_str("scroll"),
            NavigationAction::Click { selector } => write!(f, "click({selector})"),
        }
    }
}

/// Text observed after performing an action on a rendered page.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Snapshot {
    pub success: bool,
    pub text: String,
    /// The page URL after the action; empty when unknown.
    pub resolved_url: String,
}

impl Snapshot {
    pub fn failed(url: &str) -> Self {
        Self {
            success: false,
            text: String::new(),
            resolved_url: url.to_string(),
        }
    }
}

/// Output of one extractor call.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ExtractionResult {
    #[serde(default)]
    pub articles: Vec<ArticleCandidate>,
    /// Unrecognized action shapes read as no action.
    #[serde(default, deserialize_with = "lenient_action")]
    pub next_action: Option<NavigationAction>,
    #[serde(default)]
    pub issues: Vec<String>,
}

fn lenient_action<'de, D>(deserializer: D) -> Result<Option<NavigationAction>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// The named condition that ended a discovery run. Not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    ActionAlreadyVisited,
    DateThreshold,
    DuplicateContent,
    MaxPages,
    ExhaustedContent,
    NoNavigation,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::ActionAlreadyVisited => "action_already_visited",
            StopReason::DateThreshold => "date_threshold",
            StopReason::DuplicateContent => "duplicate_content",
            StopReason::MaxPages => "max_pages",
            StopReason::ExhaustedContent => "exhausted_content",
            StopReason::NoNavigation => "no_navigation",
        };
        f.write_str(s)
    }
}

/// Input for one discovery run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryRequest {
    pub url: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Result of one discovery run over a single listing URL.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryOutcome {
    pub url: String,
    pub stop_reason: StopReason,
    pub pages_visited: usize,
    /// Date-confirmed items inside the window, in discovery order.
    pub collected: Vec<ResolvedArticle>,
    /// Every inlier item seen, regardless of window.
    pub all_articles: Vec<ResolvedArticle>,
}

/// Per-source line of a [`DiscoveryReport`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceSummary {
    pub url: String,
    pub stop_reason: StopReason,
    pub pages_visited: usize,
    pub collected: usize,
    pub seen: usize,
}

impl From<&DiscoveryOutcome> for SourceSummary {
    fn from(outcome: &DiscoveryOutcome) -> Self {
        Self {
            url: outcome.url.clone(),
            stop_reason: outcome.stop_reason,
            pages_visited: outcome.pages_visited,
            collected: outcome.collected.len(),
            seen: outcome.all_articles.len(),
        }
    }
}

/// Merged output of a multi-URL discovery, written by [`crate::outputs::json`].
#[derive(Debug, Deserialize, Serialize)]
pub struct DiscoveryReport {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub sources: Vec<SourceSummary>,
    pub articles: Vec<ResolvedArticle>,
}

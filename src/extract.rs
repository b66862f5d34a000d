//! Candidate extraction: the port that turns page text into raw items.
//!
//! The extractor is stateless per call. Given a snapshot (or a scroll delta)
//! it returns article candidates with their date hints and, optionally, the
//! navigation step it believes leads to more items.
//!
//! [`LlmCandidateExtractor`] implements it with a chat model prompted to
//! answer in this JSON shape:
//!
//! ```json
//! {
//!   "articles": [
//!     {"title": "…", "url": "https://…",
//!      "date_candidates": [{"date": "2025-01-20", "source": "explicit-attribute"}]}
//!   ],
//!   "next_action": {"type": "click", "selector": "a.next"},
//!   "issues": []
//! }
//! ```

use crate::api::ask_with_backoff;
use crate::models::ExtractionResult;
use crate::utils::{looks_truncated, truncate_for_log};
use awful_aj::{config::AwfulJadeConfig, template::ChatTemplate};
use itertools::Itertools;
use std::error::Error;
use tracing::{debug, instrument, warn};

/// Extract raw candidates from page text.
pub trait CandidateExtractor {
    async fn extract(&self, text: &str) -> Result<ExtractionResult, Box<dyn Error>>;
}

/// Chat-model backed [`CandidateExtractor`].
#[derive(Debug)]
pub struct LlmCandidateExtractor {
    config: AwfulJadeConfig,
    template: ChatTemplate,
    retries: usize,
}

impl LlmCandidateExtractor {
    pub fn new(config: AwfulJadeConfig, template: ChatTemplate, retries: usize) -> Self {
        Self {
            config,
            template,
            retries,
        }
    }

    async fn ask(&self, text: &str) -> Result<String, Box<dyn Error>> {
        ask_with_backoff(&self.config, &self.template, text, self.retries).await
    }
}

impl CandidateExtractor for LlmCandidateExtractor {
    #[instrument(level = "info", skip_all, fields(bytes = text.len()))]
    async fn extract(&self, text: &str) -> Result<ExtractionResult, Box<dyn Error>> {
        let response = self.ask(text).await?;
        let parsed = match parse_extraction(&response) {
            Err(e) if looks_truncated(&e) => {
                warn!(error = %e, "EOF while parsing extraction; re-asking once");
                let retry = self.ask(text).await?;
                parse_extraction(&retry)
            }
            other => other,
        };

        match parsed {
            Ok(result) => {
                for issue in &result.issues {
                    debug!(%issue, "Extractor reported issue");
                }
                Ok(result)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    response_preview = %truncate_for_log(&response, 300),
                    "Model returned non-conforming JSON"
                );
                Err(e.into())
            }
        }
    }
}

/// Parse a model response into an [`ExtractionResult`].
///
/// Markdown code fences and chatter before the first `{` are tolerated.
/// Candidates without a URL are dropped and repeated URLs keep their first
/// occurrence.
pub fn parse_extraction(response: &str) -> Result<ExtractionResult, serde_json::Error> {
    let body = response.trim();
    let body = body.find('{').map_or(body, |start| &body[start..]);
    let body = body.trim_end().trim_end_matches("```").trim_end();

    let mut result: ExtractionResult = serde_json::from_str(body)?;
    result.articles = result
        .articles
        .into_iter()
        .filter(|a| !a.url.trim().is_empty())
        .unique_by(|a| a.url.clone())
        .collect();
    Ok(result)
}

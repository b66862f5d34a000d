//! Discovery tuning parameters.
//!
//! Source weights and the various thresholds are domain-tuning values, so
//! they live in a YAML file rather than in the algorithms. Every field has a
//! default, which lets a config file name only what it overrides:
//!
//! ```yaml
//! max_pages: 15
//! consensus_threshold: 4
//! source_weights:
//!   near-title-text: 3
//! ```

use crate::models::DateSource;
use awful_aj::config::AwfulJadeConfig;
use serde::{Deserialize, Serialize};
use std::error::Error;
use tracing::{info, instrument};

/// Reliability weight of each [`DateSource`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SourceWeights {
    pub explicit_attribute: u32,
    pub structured_metadata: u32,
    pub url_path: u32,
    pub near_title_text: u32,
    pub generic_metadata: u32,
}

impl Default for SourceWeights {
    fn default() -> Self {
        Self {
            explicit_attribute: 5,
            structured_metadata: 4,
            url_path: 3,
            near_title_text: 2,
            generic_metadata: 1,
        }
    }
}

impl SourceWeights {
    pub fn weight(&self, source: DateSource) -> u32 {
        match source {
            DateSource::ExplicitAttribute => self.explicit_attribute,
            DateSource::StructuredMetadata => self.structured_metadata,
            DateSource::UrlPath => self.url_path,
            DateSource::NearTitleText => self.near_title_text,
            DateSource::GenericMetadata => self.generic_metadata,
        }
    }
}

/// Parameters for one or more discovery runs.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Hard cap on observations per listing URL.
    pub max_pages: usize,
    /// Minimum consensus score for a date to count as confirmed.
    pub consensus_threshold: u32,
    pub source_weights: SourceWeights,
    pub outlier_low_percentile: f64,
    pub outlier_high_percentile: f64,
    /// Days added on either side of the percentile range.
    pub outlier_margin_days: i64,
    /// A batch whose oldest confirmed date is this many days before the
    /// window start ends the run.
    pub date_threshold_margin_days: i64,
    /// Consecutive batches without new URLs tolerated before giving up.
    pub zero_batch_limit: u32,
    /// Scroll when the extractor proposes no action.
    pub fallback_scroll: bool,
    /// Add a `url-path` candidate when an item URL encodes a date.
    pub infer_url_dates: bool,
    /// Extraction input is cut to this many characters.
    pub max_extract_chars: usize,
    /// Name of the chat template used by the LLM extractor.
    pub llm_template: String,
    pub llm_retries: usize,
    /// Listing URLs explored at the same time.
    pub concurrency: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_pages: 10,
            consensus_threshold: 3,
            source_weights: SourceWeights::default(),
            outlier_low_percentile: 5.0,
            outlier_high_percentile: 95.0,
            outlier_margin_days: 5,
            date_threshold_margin_days: 1,
            zero_batch_limit: 2,
            fallback_scroll: true,
            infer_url_dates: true,
            max_extract_chars: 60_000,
            llm_template: "listing_extractor".to_string(),
            llm_retries: 5,
            concurrency: 4,
        }
    }
}

/// Load a [`DiscoveryConfig`] from a YAML file, or defaults when no path is given.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid YAML for
/// this structure.
#[instrument(level = "info")]
pub async fn load_config(path: Option<&str>) -> Result<DiscoveryConfig, Box<dyn Error>> {
    let Some(path) = path else {
        info!("No discovery config given; using defaults");
        return Ok(DiscoveryConfig::default());
    };

    let raw = tokio::fs::read_to_string(path).await?;
    let config = parse_config(&raw)?;
    info!(
        max_pages = config.max_pages,
        consensus_threshold = config.consensus_threshold,
        "Loaded discovery config"
    );
    Ok(config)
}

/// Load the chat-model endpoint configuration used by the LLM extractor.
pub fn load_llm_config(path: &str) -> Result<AwfulJadeConfig, Box<dyn Error>> {
    awful_aj::config::load_config(path)
        .map_err(|e| -> Box<dyn Error> { format!("failed to load LLM config {path}: {e}").into() })
}

/// Parse YAML text into a [`DiscoveryConfig`]. An empty document yields defaults.
pub fn parse_config(raw: &str) -> Result<DiscoveryConfig, serde_yaml::Error> {
    if raw.trim().is_empty() {
        return Ok(DiscoveryConfig::default());
    }
    serde_yaml::from_str(raw)
}

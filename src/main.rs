//! # Dated Listing Discovery
//!
//! Explores web listing pages whose structure, pagination style and date
//! formatting are unknown in advance, and collects the items published
//! inside a caller-supplied date window.
//!
//! ## Usage
//!
//! ```sh
//! dated_listing_discovery -u https://example.com/blog -s 2025-01-16 -e 2025-01-20 -j ./json
//! ```
//!
//! ## Architecture
//!
//! 1. **Observe**: fetch the listing page, performing the pending scroll/click
//! 2. **Extract**: an LLM turns the page text (or the scroll delta) into candidates
//! 3. **Resolve**: date consensus voting, then batch outlier rejection
//! 4. **Decide**: keep in-window items, check stop conditions, pick the next action
//! 5. **Output**: merge all listings and write a JSON report

use awful_aj::{config_dir, template};
use chrono::{Local, Utc};
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod discovery;
mod extract;
mod models;
mod outputs;
mod scrapers;
mod utils;

use cli::Cli;
use discovery::{discover_all, merge_outcomes};
use extract::LlmCandidateExtractor;
use models::{DiscoveryReport, DiscoveryRequest, SourceSummary};
use outputs::json;
use scrapers::HttpSnapshotFetcher;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("dated_listing_discovery starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let today = Local::now().date_naive();
    let end_date = args.end_date.unwrap_or(today);
    if end_date < args.start_date {
        error!(start = %args.start_date, end = %end_date, "Window ends before it starts");
        return Err("end date is before start date".into());
    }

    if let Err(e) = ensure_writable_dir(&args.json_output_dir).await {
        error!(
            path = %args.json_output_dir,
            error = %e,
            "JSON output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Load configs & template ----
    let discovery_config = config::load_config(args.config.as_deref()).await?;

    let llm_config_path = match &args.llm_config {
        Some(path) => path.clone(),
        None => config_dir()?.join("config.yaml").to_string_lossy().to_string(),
    };
    let llm_config = config::load_llm_config(&llm_config_path)?;
    info!(path = %llm_config_path, "Loaded LLM configuration");

    let template = template::load_template(&discovery_config.llm_template).await?;
    info!(template = %discovery_config.llm_template, "Loaded template");

    let extractor = LlmCandidateExtractor::new(llm_config, template, discovery_config.llm_retries);
    let client = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .timeout(std::time::Duration::from_secs(30))
        .build()?;

    // ---- Discover ----
    let requests: Vec<DiscoveryRequest> = args
        .urls
        .iter()
        .map(|url| DiscoveryRequest {
            url: url.clone(),
            start_date: args.start_date,
            end_date,
        })
        .collect();
    info!(
        sources = requests.len(),
        start = %args.start_date,
        end = %end_date,
        concurrency = discovery_config.concurrency,
        "Starting discovery"
    );

    let outcomes = discover_all(
        requests,
        |_| HttpSnapshotFetcher::new(client.clone()),
        &extractor,
        &discovery_config,
        today,
    )
    .await;

    for outcome in &outcomes {
        if outcome.collected.is_empty() {
            warn!(url = %outcome.url, stop_reason = %outcome.stop_reason, "Listing produced no articles in window");
        }
    }

    let report = DiscoveryReport {
        start_date: args.start_date,
        end_date,
        generated_at: Utc::now(),
        sources: outcomes.iter().map(SourceSummary::from).collect(),
        articles: merge_outcomes(&outcomes),
    };

    // ---- Output ----
    match json::write_report(&report, &args.json_output_dir).await {
        Ok(path) => info!(path = %path.display(), "Report written"),
        Err(e) => {
            error!(error = %e, "Failed to write report");
            return Err(e);
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        articles = report.articles.len(),
        "Execution complete"
    );

    Ok(())
}

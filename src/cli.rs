//! Command-line interface definitions.
//!
//! All arguments can be provided via command-line flags, and the config
//! paths also via environment variables.

use chrono::NaiveDate;
use clap::Parser;

/// Collect the articles a set of listing pages published inside a date window.
///
/// # Examples
///
/// ```sh
/// # One listing, explicit window
/// dated_listing_discovery -u https://example.com/blog -s 2025-01-16 -e 2025-01-20 -j ./json
///
/// # Several listings, window ending today, tuned config
/// dated_listing_discovery -u https://a.example/news -u https://b.example/posts \
///     -s 2025-01-01 -j ./json -c discovery.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Listing page to explore (repeatable)
    #[arg(short, long = "url", required = true)]
    pub urls: Vec<String>,

    /// First day of the window (YYYY-MM-DD)
    #[arg(short, long)]
    pub start_date: NaiveDate,

    /// Last day of the window (YYYY-MM-DD); defaults to today
    #[arg(short, long)]
    pub end_date: Option<NaiveDate>,

    /// Output directory for the JSON report
    #[arg(short, long)]
    pub json_output_dir: String,

    /// Optional path to a discovery config (YAML)
    #[arg(short, long, env = "DISCOVERY_CONFIG")]
    pub config: Option<String>,

    /// Path to the LLM config.yaml; defaults to the awful_aj config directory
    #[arg(long, env = "LLM_CONFIG")]
    pub llm_config: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "dated_listing_discovery",
            "--url",
            "https://example.com/blog",
            "--url",
            "https://example.org/news",
            "--start-date",
            "2025-01-16",
            "--end-date",
            "2025-01-20",
            "--json-output-dir",
            "./json",
        ]);

        assert_eq!(cli.urls.len(), 2);
        assert_eq!(cli.start_date, NaiveDate::from_ymd_opt(2025, 1, 16).unwrap());
        assert_eq!(cli.end_date, NaiveDate::from_ymd_opt(2025, 1, 20));
        assert_eq!(cli.json_output_dir, "./json");
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from([
            "dated_listing_discovery",
            "-u",
            "https://example.com",
            "-s",
            "2025-02-01",
            "-j",
            "/tmp/json",
        ]);

        assert_eq!(cli.urls, vec!["https://example.com".to_string()]);
        assert_eq!(cli.end_date, None);
        assert_eq!(cli.json_output_dir, "/tmp/json");
    }

    #[test]
    fn test_cli_requires_url_and_start() {
        assert!(Cli::try_parse_from(["dated_listing_discovery", "-j", "x"]).is_err());
        assert!(Cli::try_parse_from(["dated_listing_discovery", "-u", "https://e.com", "-s", "not-a-date", "-j", "x"]).is_err());
    }
}

//! Command-line interface definitions for the Lampung news scraper.
//!
//! Every option is optional on the command line so that a YAML file passed
//! with `--config` can supply it instead; see [`crate::config`] for how the
//! two are merged.

use crate::models::UndatedPolicy;
use crate::scrapers::Portal;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Everything from the last week, five articles per portal, CSV in ./out
/// lampung_news --start-date 2024-03-01 --end-date 2024-03-07 --csv-output ./out
///
/// # Two portals only, Indonesian dates, JSON output as well
/// lampung_news -s "1 Maret 2024" -p detik,antara -n 10 -j ./json
///
/// # Through a remote headless browser
/// BROWSERLESS_URL=http://localhost:3000 lampung_news -c scrape.yaml
/// ```
#[derive(Parser, Debug, Default)]
#[command(author, version, about)]
pub struct Cli {
    /// Earliest publication date to keep (inclusive); ISO or natural language
    #[arg(short, long)]
    pub start_date: Option<String>,

    /// Latest publication date to keep (inclusive); ISO or natural language
    #[arg(short, long)]
    pub end_date: Option<String>,

    /// Maximum number of articles kept per portal
    #[arg(short = 'n', long)]
    pub max_articles: Option<usize>,

    /// Maximum number of listing pages visited per portal
    #[arg(long)]
    pub max_pages: Option<u32>,

    /// Portals to scrape, in order
    #[arg(short, long, value_enum, value_delimiter = ',')]
    pub portals: Option<Vec<Portal>>,

    /// Tag or search keyword used in listing URLs
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Path to the classifier model artifact
    #[arg(long, env = "MODEL_PATH")]
    pub model_path: Option<PathBuf>,

    /// Optional path to a YAML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output directory for the CSV tables
    #[arg(long)]
    pub csv_output: Option<String>,

    /// Output directory for the JSON file
    #[arg(short, long)]
    pub json_output: Option<String>,

    /// Base URL of a headless browser service exposing `/content`
    #[arg(long, env = "BROWSERLESS_URL")]
    pub render_endpoint: Option<String>,

    /// Token for the headless browser service
    #[arg(long, env = "BROWSERLESS_TOKEN", hide_env_values = true)]
    pub render_token: Option<String>,

    /// Navigation attempts per page
    #[arg(long)]
    pub retries: Option<usize>,

    /// What to do with articles that carry no date
    #[arg(long, value_enum)]
    pub undated: Option<UndatedPolicy>,

    /// Wall-clock budget per portal, in seconds
    #[arg(long)]
    pub run_budget_secs: Option<u64>,

    /// Run the remote browser with a visible window
    #[arg(long)]
    pub show_browser: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "lampung_news",
            "--start-date",
            "2024-03-01",
            "--end-date",
            "7 Maret 2024",
            "--csv-output",
            "./out",
        ]);

        assert_eq!(cli.start_date.as_deref(), Some("2024-03-01"));
        assert_eq!(cli.end_date.as_deref(), Some("7 Maret 2024"));
        assert_eq!(cli.csv_output.as_deref(), Some("./out"));
        assert!(cli.portals.is_none());
        assert!(!cli.show_browser);
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from([
            "lampung_news",
            "-s",
            "2024-03-01",
            "-n",
            "10",
            "-p",
            "detik,antara",
            "-j",
            "/tmp/json",
        ]);

        assert_eq!(cli.max_articles, Some(10));
        assert_eq!(cli.portals, Some(vec![Portal::Detik, Portal::Antara]));
        assert_eq!(cli.json_output.as_deref(), Some("/tmp/json"));
    }

    #[test]
    fn test_cli_undated_policy() {
        let cli = Cli::parse_from(["lampung_news", "--undated", "discard"]);
        assert_eq!(cli.undated, Some(UndatedPolicy::Discard));
    }

    #[test]
    fn test_cli_rejects_unknown_portal() {
        assert!(Cli::try_parse_from(["lampung_news", "-p", "kompas"]).is_err());
    }
}

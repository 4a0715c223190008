//! YAML configuration file and its merge with the command line.
//!
//! A config file may set anything the CLI can; values given on the command
//! line win. Unset values fall back to built-in defaults.
//!
//! ```yaml
//! portals: [detik, rmol, antara, lampost]
//! tag: lampung
//! start_date: 2024-03-01
//! end_date: "7 Maret 2024"
//! max_articles_per_source: 10
//! max_pages_per_source: 2
//! undated_policy: assume_today
//! model_path: model_berita.json
//! output:
//!   csv_dir: ./out
//!   json_dir: ./out/json
//! fetch:
//!   retries: 3
//!   retry_delay_secs: 2
//!   page_load_timeout_secs: 30
//!   render_endpoint: http://localhost:3000
//! ```

use crate::cli::Cli;
use crate::dates::{DateError, DateInput};
use crate::fetcher::{BrowserOptions, RetryPolicy};
use crate::models::{RunConfig, UndatedPolicy};
use crate::scrapers::Portal;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};

pub const DEFAULT_TAG: &str = "lampung";
pub const DEFAULT_MODEL_PATH: &str = "model_berita.json";
pub const DEFAULT_MAX_ARTICLES: usize = 5;
pub const DEFAULT_CSV_DIR: &str = ".";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid date in config file: {0}")]
    Date(#[from] DateError),
}

/// Contents of a config file; every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub portals: Option<Vec<Portal>>,
    pub tag: Option<String>,
    /// Left untyped so that strings, dates and `null` are all accepted and
    /// anything else is reported as a date type error.
    pub start_date: Option<serde_yaml::Value>,
    pub end_date: Option<serde_yaml::Value>,
    pub max_articles_per_source: Option<usize>,
    pub max_pages_per_source: Option<u32>,
    pub undated_policy: Option<UndatedPolicy>,
    pub run_budget_secs: Option<u64>,
    pub model_path: Option<PathBuf>,
    pub output: OutputSection,
    pub fetch: FetchSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSection {
    pub csv_dir: Option<String>,
    pub json_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchSection {
    pub retries: Option<usize>,
    pub retry_delay_secs: Option<u64>,
    pub page_load_timeout_secs: Option<u64>,
    pub script_timeout_secs: Option<u64>,
    pub listing_settle_ms: Option<u64>,
    pub article_settle_ms: Option<u64>,
    pub headless: Option<bool>,
    pub user_agent: Option<String>,
    pub render_endpoint: Option<String>,
    pub render_token: Option<String>,
}

impl FileConfig {
    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_yaml(&raw)?;
        info!("Loaded configuration");
        Ok(config)
    }
}

/// Fully resolved settings for one invocation.
#[derive(Debug)]
pub struct Settings {
    pub portals: Vec<Portal>,
    pub tag: String,
    /// Date bounds stay unnormalized; the pipeline validates them before
    /// any page is fetched.
    pub start_date: DateInput,
    pub end_date: DateInput,
    pub max_articles_per_source: usize,
    pub run: RunConfig,
    pub browser: BrowserOptions,
    pub retry: RetryPolicy,
    pub model_path: PathBuf,
    pub csv_dir: Option<String>,
    pub json_dir: Option<String>,
}

impl Settings {
    /// Merge `cli` over `file` over defaults.
    ///
    /// When neither output directory is given anywhere, CSV tables go to the
    /// working directory.
    pub fn resolve(cli: Cli, file: FileConfig) -> Result<Self, ConfigError> {
        let start_date = match (cli.start_date, file.start_date) {
            (Some(s), _) => DateInput::Text(s),
            (None, Some(v)) => DateInput::try_from(&v)?,
            (None, None) => DateInput::Absent,
        };
        let end_date = match (cli.end_date, file.end_date) {
            (Some(s), _) => DateInput::Text(s),
            (None, Some(v)) => DateInput::try_from(&v)?,
            (None, None) => DateInput::Absent,
        };

        let defaults = RunConfig::default();
        let fetch = file.fetch;
        let run = RunConfig {
            max_pages_per_source: cli
                .max_pages
                .or(file.max_pages_per_source)
                .unwrap_or(defaults.max_pages_per_source),
            undated_policy: cli
                .undated
                .or(file.undated_policy)
                .unwrap_or(defaults.undated_policy),
            listing_settle: fetch
                .listing_settle_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.listing_settle),
            article_settle: fetch
                .article_settle_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.article_settle),
            run_budget: cli
                .run_budget_secs
                .or(file.run_budget_secs)
                .map(Duration::from_secs),
            ..defaults
        };

        let browser_defaults = BrowserOptions::default();
        let browser = BrowserOptions {
            headless: !cli.show_browser && fetch.headless.unwrap_or(browser_defaults.headless),
            user_agent: fetch.user_agent.unwrap_or(browser_defaults.user_agent),
            page_load_timeout: fetch
                .page_load_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(browser_defaults.page_load_timeout),
            script_timeout: fetch
                .script_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(browser_defaults.script_timeout),
            render_endpoint: cli.render_endpoint.or(fetch.render_endpoint),
            render_token: cli.render_token.or(fetch.render_token),
            ..browser_defaults
        };

        let retry_defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            attempts: cli.retries.or(fetch.retries).unwrap_or(retry_defaults.attempts),
            delay: fetch
                .retry_delay_secs
                .map(Duration::from_secs)
                .unwrap_or(retry_defaults.delay),
        };

        let mut csv_dir = cli.csv_output.or(file.output.csv_dir);
        let json_dir = cli.json_output.or(file.output.json_dir);
        if csv_dir.is_none() && json_dir.is_none() {
            csv_dir = Some(DEFAULT_CSV_DIR.to_string());
        }

        Ok(Self {
            portals: cli
                .portals
                .or(file.portals)
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| Portal::ALL.to_vec()),
            tag: cli.tag.or(file.tag).unwrap_or_else(|| DEFAULT_TAG.to_string()),
            start_date,
            end_date,
            max_articles_per_source: cli
                .max_articles
                .or(file.max_articles_per_source)
                .unwrap_or(DEFAULT_MAX_ARTICLES),
            run,
            browser,
            retry,
            model_path: cli
                .model_path
                .or(file.model_path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
            csv_dir,
            json_dir,
        })
    }
}

//! # Lampung News
//!
//! Scrapes regional news about Lampung from several Indonesian portals,
//! normalizes every article to one record shape, filters by publication
//! date, merges and deduplicates across portals, and optionally labels each
//! article with a text classifier.
//!
//! ## Portals
//!
//! - detik.com tag pages
//! - RMOL Lampung search results
//! - Antara Lampung "Lampung Update"
//! - Lampung Post tag pages
//!
//! ## Usage
//!
//! ```sh
//! lampung_news --start-date 2024-03-01 --end-date 2024-03-07 -n 10 --csv-output ./out
//! ```
//!
//! ## Architecture
//!
//! 1. **Discovery**: walk each portal's listing pages for article links
//! 2. **Extraction**: load each article and pull title, date and body
//! 3. **Aggregation**: merge all portals and drop duplicate links
//! 4. **Classification**: label every article, or `-1` without a model
//! 5. **Output**: CSV tables and/or a JSON file

use chrono::Local;
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod aggregate;
mod classify;
mod cli;
mod config;
mod dates;
mod fetcher;
mod models;
mod outputs;
mod pipeline;
mod runner;
mod scrapers;
mod utils;

use cli::Cli;
use config::{FileConfig, Settings};
use fetcher::HttpBrowserFactory;
use outputs::{csv, json};
use pipeline::Pipeline;
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
    info!("lampung_news starting up");

    // Parse CLI, then layer it over the config file
    let args = Cli::parse();
    debug!(?args.config, ?args.csv_output, ?args.json_output, "Parsed CLI arguments");
    let file_config = match args.config {
        Some(ref path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let settings = Settings::resolve(args, file_config)?;
    info!(
        portals = ?settings.portals,
        tag = %settings.tag,
        max_articles = settings.max_articles_per_source,
        max_pages = settings.run.max_pages_per_source,
        "Resolved settings"
    );

    // Early check: output dirs are writable before any scraping happens
    for dir in [&settings.csv_dir, &settings.json_dir].into_iter().flatten() {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(path = %dir, error = %e, "Output directory is not writable (fix perms or choose a different path)");
            return Err(e);
        }
    }

    // ---- Build pipeline ----
    let sources = settings
        .portals
        .iter()
        .map(|portal| portal.extractor(&settings.tag))
        .collect();
    let factory = HttpBrowserFactory {
        options: settings.browser.clone(),
        retry: settings.retry,
    };
    let pipeline = Pipeline::new(sources, factory)
        .with_config(settings.run.clone())
        .with_classifier(classify::load_model(&settings.model_path));

    // ---- Scrape and classify ----
    let result = match pipeline
        .run(
            settings.start_date.clone(),
            settings.end_date.clone(),
            settings.max_articles_per_source,
        )
        .await
    {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "Invalid date bound; nothing was scraped");
            return Err(e.into());
        }
    };

    // ---- Outputs ----
    if let Some(ref dir) = settings.csv_dir {
        if let Err(e) = csv::write_tables(&result, dir).await {
            error!(path = %dir, error = %e, "Failed writing CSV tables");
        }
    }
    if let Some(ref dir) = settings.json_dir {
        if let Err(e) = json::write_result(&result, dir, Local::now().date_naive()).await {
            error!(path = %dir, error = %e, "Failed writing JSON file");
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        total = result.all.len(),
        target = result.target.len(),
        elapsed_secs = elapsed.as_secs_f64(),
        "Execution complete"
    );

    Ok(())
}

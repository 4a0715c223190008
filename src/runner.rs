//! Per-portal run loop.
//!
//! A run walks listing pages `1..=max_pages_per_source`, and for each page
//! walks its candidate links in discovery order until the article cap is
//! reached:
//!
//! ```text
//! PageLoop(page=1) -> ArticleLoop -> PageLoop(page+1) -> ... -> Done
//! ```
//!
//! Failures are isolated to the unit they happen in: a listing page that
//! will not load skips to the next page, an article that will not load or
//! parse skips to the next link. The fetch session is opened once per run
//! and released on every exit path.

use crate::fetcher::{FetchError, FetchSession, FetcherFactory, PageFetcher};
use crate::models::{ArticleRecord, LinkCandidate, RunConfig, UndatedPolicy};
use crate::scrapers::SourceExtractor;
use crate::utils::truncate_for_log;
use chrono::{Local, NaiveDate};
use futures::FutureExt;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to open fetch session: {0}")]
    Session(#[from] FetchError),
}

/// Why an article was not emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Skip {
    FetchFailed,
    NotAnArticle,
    Untitled,
    Undated,
    OutOfRange(NaiveDate),
    Panicked(String),
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Skip::FetchFailed => f.write_str("page could not be fetched"),
            Skip::NotAnArticle => f.write_str("page holds no article"),
            Skip::Untitled => f.write_str("no title"),
            Skip::Undated => f.write_str("no publication date"),
            Skip::OutOfRange(d) => write!(f, "date {d} outside requested range"),
            Skip::Panicked(reason) => write!(f, "extraction panicked: {reason}"),
        }
    }
}

/// Runs one [`SourceExtractor`] against the configured limits.
#[derive(Debug)]
pub struct SourceRunner<'a> {
    config: &'a RunConfig,
    today: NaiveDate,
}

impl<'a> SourceRunner<'a> {
    /// A runner whose "today" is the local date at construction time.
    pub fn new(config: &'a RunConfig) -> Self {
        Self {
            config,
            today: Local::now().date_naive(),
        }
    }

    /// Override the date stamped on undated articles.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Run `extractor` to completion and return its records in discovery order.
    ///
    /// Only failing to open a fetch session is an error; everything after
    /// that degrades to skipped pages or articles.
    #[instrument(level = "info", skip_all, fields(source = extractor.name()))]
    pub async fn run<F: FetcherFactory>(
        &self,
        extractor: &dyn SourceExtractor,
        factory: &F,
    ) -> Result<Vec<ArticleRecord>, RunnerError> {
        let started = Instant::now();
        let cap = self.config.max_articles_per_source;
        let mut session = factory.open()?;
        let mut records: Vec<ArticleRecord> = Vec::new();

        'pages: for page in 1..=self.config.max_pages_per_source {
            if records.len() >= cap || self.budget_spent(started) {
                break;
            }

            let listing_url = extractor.listing_url(page);
            info!(page, url = %listing_url, "Loading listing page");
            let Some(listing_html) = session.fetch(&listing_url).await else {
                warn!(page, url = %listing_url, "Listing page failed to load; moving to next page");
                continue;
            };
            sleep(self.config.listing_settle).await;

            let candidates = extractor.discover_links(&listing_html, &listing_url);
            info!(page, candidates = candidates.len(), "Discovered candidate links");

            for candidate in candidates {
                if records.len() >= cap {
                    break 'pages;
                }
                if self.budget_spent(started) {
                    warn!(elapsed = ?started.elapsed(), "Run budget spent; stopping early");
                    break 'pages;
                }

                let outcome = AssertUnwindSafe(self.process(extractor, &mut session, &candidate))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| Err(Skip::Panicked(panic_reason(&*panic))));
                match outcome {
                    Ok(record) => {
                        debug!(
                            link = %record.link,
                            date = %record.publication_date,
                            title = %truncate_for_log(&record.title, 80),
                            "Article accepted"
                        );
                        records.push(record);
                    }
                    Err(skip @ Skip::OutOfRange(_)) => {
                        debug!(link = %candidate.url, reason = %skip, "Article skipped");
                    }
                    Err(skip) => {
                        warn!(link = %candidate.url, reason = %skip, "Article skipped");
                    }
                }
            }
        }

        session.release();
        info!(
            count = records.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Source run finished"
        );
        Ok(records)
    }

    async fn process<T: PageFetcher>(
        &self,
        extractor: &dyn SourceExtractor,
        session: &mut FetchSession<T>,
        candidate: &LinkCandidate,
    ) -> Result<ArticleRecord, Skip> {
        let html = session.fetch(&candidate.url).await.ok_or(Skip::FetchFailed)?;
        sleep(self.config.article_settle).await;

        let fields = extractor.extract_article(&html).ok_or(Skip::NotAnArticle)?;

        let hint = candidate.title_hint.trim();
        let title = if hint.is_empty() { fields.title.trim() } else { hint };
        if title.is_empty() {
            return Err(Skip::Untitled);
        }

        let date = match (fields.date, self.config.undated_policy) {
            (Some(date), _) => date,
            (None, UndatedPolicy::AssumeToday) => self.today,
            (None, UndatedPolicy::Discard) => return Err(Skip::Undated),
        };
        if !self.config.in_range(date) {
            return Err(Skip::OutOfRange(date));
        }

        Ok(ArticleRecord::new(
            extractor.name(),
            title,
            &candidate.url,
            date,
            fields.body,
        ))
    }

    fn budget_spent(&self, started: Instant) -> bool {
        self.config
            .run_budget
            .is_some_and(|budget| started.elapsed() >= budget)
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_reason(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

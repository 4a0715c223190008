//! The scrape-and-classify entry point.
//!
//! ```ignore
//! let pipeline = Pipeline::new(Portal::ALL.map(|p| p.extractor("lampung")).into(), factory)
//!     .with_classifier(load_model(Path::new("model_berita.json")));
//! let result = pipeline.run("2024-03-01", None::<&str>, 10).await?;
//! ```

use crate::aggregate::aggregate;
use crate::classify::{Classifier, classify, split_target};
use crate::dates::{DateError, DateInput, normalize};
use crate::fetcher::FetcherFactory;
use crate::models::{RunConfig, ScrapeResult, TARGET_LABEL};
use crate::scrapers::SourceExtractor;
use chrono::NaiveDate;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Sources, fetcher and optional classifier for a scrape.
pub struct Pipeline<F: FetcherFactory> {
    sources: Vec<Box<dyn SourceExtractor>>,
    factory: F,
    classifier: Option<Box<dyn Classifier>>,
    base: RunConfig,
    today: Option<NaiveDate>,
}

impl<F: FetcherFactory> Pipeline<F> {
    pub fn new(sources: Vec<Box<dyn SourceExtractor>>, factory: F) -> Self {
        Self {
            sources,
            factory,
            classifier: None,
            base: RunConfig::default(),
            today: None,
        }
    }

    pub fn with_classifier(mut self, classifier: Option<Box<dyn Classifier>>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Page limits, pauses, undated policy and budget for every run. Date
    /// bounds and the article cap given to [`Pipeline::run`] replace the
    /// ones in `base`.
    pub fn with_config(mut self, base: RunConfig) -> Self {
        self.base = base;
        self
    }

    /// Fix the date stamped on undated articles.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Scrape every source, merge, classify and split out the target class.
    ///
    /// Only a malformed date bound is an error; it is reported before any
    /// page is fetched.
    #[instrument(level = "info", skip_all, fields(max_articles = max_articles_per_source))]
    pub async fn run(
        &self,
        start_date: impl Into<DateInput>,
        end_date: impl Into<DateInput>,
        max_articles_per_source: usize,
    ) -> Result<ScrapeResult, DateError> {
        let started = Instant::now();
        let config = RunConfig {
            start_date: normalize(start_date)?,
            end_date: normalize(end_date)?,
            max_articles_per_source,
            ..self.base.clone()
        };
        if let (Some(start), Some(end)) = (config.start_date, config.end_date) {
            if start > end {
                warn!(%start, %end, "Start date is after end date; nothing can match");
            }
        }
        info!(
            start = ?config.start_date,
            end = ?config.end_date,
            max_pages = config.max_pages_per_source,
            sources = self.sources.len(),
            "Starting scrape"
        );

        let mut all = aggregate(&self.sources, &self.factory, &config, self.today).await;
        if all.is_empty() {
            warn!("No articles from any source");
            return Ok(ScrapeResult::default());
        }

        classify(&mut all, self.classifier.as_deref());
        let target = split_target(&all, TARGET_LABEL);

        info!(
            total = all.len(),
            target = target.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Scrape complete"
        );
        Ok(ScrapeResult { all, target })
    }
}

//! Cross-source aggregation.
//!
//! Runs every configured portal one after another, isolates each run so a
//! failing portal contributes zero records instead of aborting the others,
//! then concatenates the outputs in configuration order and drops duplicate
//! links (first occurrence wins).

use crate::fetcher::FetcherFactory;
use crate::models::{ArticleRecord, RunConfig};
use crate::runner::{SourceRunner, panic_reason};
use crate::scrapers::SourceExtractor;
use chrono::NaiveDate;
use futures::FutureExt;
use itertools::Itertools;
use std::panic::AssertUnwindSafe;
use tracing::{error, info, instrument};

/// Run every source and merge the results into one deduplicated table.
///
/// `today` overrides the date stamped on undated articles; `None` uses the
/// local clock.
#[instrument(level = "info", skip_all, fields(sources = sources.len()))]
pub async fn aggregate<F: FetcherFactory>(
    sources: &[Box<dyn SourceExtractor>],
    factory: &F,
    config: &RunConfig,
    today: Option<NaiveDate>,
) -> Vec<ArticleRecord> {
    let mut per_source: Vec<Vec<ArticleRecord>> = Vec::with_capacity(sources.len());

    for source in sources {
        let mut runner = SourceRunner::new(config);
        if let Some(today) = today {
            runner = runner.with_today(today);
        }

        let outcome = AssertUnwindSafe(runner.run(source.as_ref(), factory))
            .catch_unwind()
            .await;
        let records = match outcome {
            Ok(Ok(records)) => records,
            Ok(Err(e)) => {
                error!(source = source.name(), error = %e, "Source run failed; treating source as empty");
                Vec::new()
            }
            Err(panic) => {
                let reason = panic_reason(&*panic);
                error!(source = source.name(), %reason, "Source run panicked; treating source as empty");
                Vec::new()
            }
        };
        info!(source = source.name(), count = records.len(), "Source collected");
        per_source.push(records);
    }

    merge(per_source)
}

/// Concatenate per-source tables in order and keep the first record per link.
pub fn merge(per_source: Vec<Vec<ArticleRecord>>) -> Vec<ArticleRecord> {
    let total: usize = per_source.iter().map(Vec::len).sum();
    let merged: Vec<ArticleRecord> = per_source
        .into_iter()
        .flatten()
        .unique_by(|r| r.link.clone())
        .collect();
    info!(
        total,
        unique = merged.len(),
        duplicates = total - merged.len(),
        "Merged source tables"
    );
    merged
}

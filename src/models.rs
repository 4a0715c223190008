//! Data models for scraped articles and run configuration.
//!
//! This module defines the core data structures used throughout the application:
//! - [`LinkCandidate`]: An article link discovered on a listing page
//! - [`ArticleFields`]: Raw fields pulled out of one article page
//! - [`ArticleRecord`]: The normalized output row shared by every portal
//! - [`RunConfig`]: Limits and date bounds for one invocation
//! - [`ScrapeResult`]: The two output tables (all rows, target-class rows)
//!
//! Records serialize with the column names of the original output table
//! (`judul`, `link`, `tanggal`, `isi`, `label`, `sumber`).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Label assigned to records the classifier did not (or could not) label.
pub const UNCLASSIFIED: i64 = -1;

/// Label value of the "economic" target class.
pub const TARGET_LABEL: i64 = 1;

/// An article link found on a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCandidate {
    /// Anchor text of the link; may be empty.
    pub title_hint: String,
    /// Absolute article URL.
    pub url: String,
}

/// Fields extracted from a single article page.
///
/// `date` is `None` when neither the machine-readable timestamp nor the
/// displayed date text could be parsed; the runner decides what to do then.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleFields {
    pub title: String,
    pub date: Option<NaiveDate>,
    pub body: String,
}

/// A normalized article row.
///
/// Every portal produces exactly this shape, so downstream consumers never
/// see per-portal schema variation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    /// Display title, trimmed and non-empty.
    #[serde(rename = "judul")]
    pub title: String,
    /// Absolute URL; the dedup key of the aggregated table.
    pub link: String,
    /// Publication date without time of day.
    #[serde(rename = "tanggal")]
    pub publication_date: NaiveDate,
    /// Space-joined paragraph text.
    #[serde(rename = "isi", default)]
    pub body: String,
    /// Classifier outcome, [`UNCLASSIFIED`] until labeled.
    #[serde(default = "unclassified")]
    pub label: i64,
    /// Portal that produced the record.
    #[serde(rename = "sumber", default)]
    pub source: String,
}

fn unclassified() -> i64 {
    UNCLASSIFIED
}

impl ArticleRecord {
    pub fn new(
        source: &str,
        title: &str,
        link: &str,
        publication_date: NaiveDate,
        body: String,
    ) -> Self {
        Self {
            title: title.trim().to_string(),
            link: link.to_string(),
            publication_date,
            body,
            label: UNCLASSIFIED,
            source: source.to_string(),
        }
    }
}

/// What to do with an article whose page carries no recognizable date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum UndatedPolicy {
    /// Stamp the article with the run's local date (best effort).
    #[default]
    AssumeToday,
    /// Drop the article.
    Discard,
}

/// Limits and date bounds for one invocation.
///
/// Owned by the caller and only ever borrowed by runners.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Inclusive lower bound; `None` means open-ended.
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper bound; `None` means open-ended.
    pub end_date: Option<NaiveDate>,
    pub max_pages_per_source: u32,
    pub max_articles_per_source: usize,
    pub undated_policy: UndatedPolicy,
    /// Pause after each listing page load.
    pub listing_settle: Duration,
    /// Pause after each article page load.
    pub article_settle: Duration,
    /// Wall-clock budget for a single source run.
    pub run_budget: Option<Duration>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            start_date: None,
            end_date: None,
            max_pages_per_source: 2,
            max_articles_per_source: 5,
            undated_policy: UndatedPolicy::AssumeToday,
            listing_settle: Duration::from_millis(1000),
            article_settle: Duration::from_millis(600),
            run_budget: None,
        }
    }
}

impl RunConfig {
    /// Whether `date` lies inside `[start_date, end_date]`; absent bounds are open.
    pub fn in_range(&self, date: NaiveDate) -> bool {
        if let Some(start) = self.start_date {
            if date < start {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if date > end {
                return false;
            }
        }
        true
    }
}

/// The two pipeline output tables.
#[derive(Debug, Default, Serialize)]
pub struct ScrapeResult {
    /// Every aggregated, deduplicated, labeled record.
    pub all: Vec<ArticleRecord>,
    /// Records whose label equals the target class.
    pub target: Vec<ArticleRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_record_new_trims_title_and_is_unclassified() {
        let rec = ArticleRecord::new(
            "detik",
            "  Harga cabai naik \n",
            "https://example.com/a",
            date(2024, 3, 12),
            String::new(),
        );
        assert_eq!(rec.title, "Harga cabai naik");
        assert_eq!(rec.label, UNCLASSIFIED);
        assert_eq!(rec.source, "detik");
    }

    #[test]
    fn test_record_serializes_with_table_column_names() {
        let rec = ArticleRecord::new(
            "antara",
            "Judul",
            "https://example.com/a",
            date(2024, 3, 12),
            "Isi berita".to_string(),
        );
        let json = serde_json::to_string(&rec).unwrap();
        assert!(json.contains("\"judul\":\"Judul\""));
        assert!(json.contains("\"tanggal\":\"2024-03-12\""));
        assert!(json.contains("\"isi\":\"Isi berita\""));
        assert!(json.contains("\"label\":-1"));
    }

    #[test]
    fn test_record_deserialize_fills_missing_columns() {
        let json = r#"{"judul":"A","link":"https://x.id/a","tanggal":"2024-01-02"}"#;
        let rec: ArticleRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.body, "");
        assert_eq!(rec.label, UNCLASSIFIED);
        assert_eq!(rec.source, "");
    }

    #[test]
    fn test_in_range_inclusive_bounds() {
        let cfg = RunConfig {
            start_date: Some(date(2024, 3, 1)),
            end_date: Some(date(2024, 3, 31)),
            ..RunConfig::default()
        };
        assert!(cfg.in_range(date(2024, 3, 1)));
        assert!(cfg.in_range(date(2024, 3, 31)));
        assert!(!cfg.in_range(date(2024, 2, 29)));
        assert!(!cfg.in_range(date(2024, 4, 1)));
    }

    #[test]
    fn test_in_range_open_ended() {
        let cfg = RunConfig {
            start_date: Some(date(2024, 3, 1)),
            ..RunConfig::default()
        };
        assert!(cfg.in_range(date(2030, 1, 1)));
        assert!(!cfg.in_range(date(2020, 1, 1)));
        assert!(RunConfig::default().in_range(date(1999, 1, 1)));
    }
}

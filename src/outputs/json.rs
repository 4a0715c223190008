//! JSON export of a scrape result.
//!
//! One file per run date:
//! ```text
//! json_output_dir/
//! └── 2024-03-12.json   # {"all": [...], "target": [...]}
//! ```
//! A later run on the same day overwrites the file.

use crate::models::ScrapeResult;
use chrono::NaiveDate;
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

/// Write `result` to `{json_output_dir}/{run_date}.json`.
#[instrument(level = "info", skip_all, fields(%json_output_dir, %run_date))]
pub async fn write_result(
    result: &ScrapeResult,
    json_output_dir: &str,
    run_date: NaiveDate,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(result)?;

    if let Err(e) = fs::create_dir_all(json_output_dir).await {
        error!(error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let path = PathBuf::from(json_output_dir).join(format!("{run_date}.json"));
    fs::write(&path, json).await?;
    info!(path = %path.display(), articles = result.all.len(), "Wrote JSON file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArticleRecord;

    #[tokio::test]
    async fn test_write_result_round_trips_both_tables() {
        let dir = std::env::temp_dir().join(format!("lampung_news_json_{}", std::process::id()));
        let date = NaiveDate::from_ymd_opt(2024, 3, 12).unwrap();
        let mut record = ArticleRecord::new("antara", "Inflasi", "https://a.id/1", date, "isi".into());
        record.label = 1;
        let result = ScrapeResult {
            all: vec![record.clone()],
            target: vec![record],
        };

        let path = write_result(&result, &dir.to_string_lossy(), date).await.unwrap();

        assert!(path.ends_with("2024-03-12.json"));
        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["all"][0]["judul"], "Inflasi");
        assert_eq!(value["target"][0]["label"], 1);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}

//! CSV export of the two result tables.
//!
//! Columns are `judul,link,tanggal,isi,label,sumber`, taken from the serde
//! names on [`ArticleRecord`]; fields holding a comma, a quote or a line
//! break are quoted with doubled inner quotes.

use crate::models::{ArticleRecord, ScrapeResult};
use ::csv::{Terminator, WriterBuilder};
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

pub const ALL_FILENAME: &str = "hasil_semua_portal.csv";
pub const TARGET_FILENAME: &str = "hasil_ekonomi.csv";

/// Written explicitly so an empty table still gets a header line.
const HEADER: [&str; 6] = ["judul", "link", "tanggal", "isi", "label", "sumber"];

/// Render `records` as CSV text with a header line.
pub fn to_csv_string(records: &[ArticleRecord]) -> Result<String, Box<dyn Error>> {
    let mut wtr = WriterBuilder::new()
        .has_headers(false)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    wtr.write_record(HEADER)?;
    for record in records {
        wtr.serialize(record)?;
    }
    let buf = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(buf)?)
}

/// Write the full table and the target table into `dir`.
///
/// Both files are always written, header-only when a table is empty.
#[instrument(level = "info", skip_all, fields(%dir))]
pub async fn write_tables(result: &ScrapeResult, dir: &str) -> Result<(PathBuf, PathBuf), Box<dyn Error>> {
    fs::create_dir_all(dir).await?;
    let all_path = Path::new(dir).join(ALL_FILENAME);
    let target_path = Path::new(dir).join(TARGET_FILENAME);

    fs::write(&all_path, to_csv_string(&result.all)?).await?;
    info!(path = %all_path.display(), rows = result.all.len(), "Wrote CSV");
    fs::write(&target_path, to_csv_string(&result.target)?).await?;
    info!(path = %target_path.display(), rows = result.target.len(), "Wrote CSV");

    Ok((all_path, target_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn rec(title: &str, body: &str, label: i64) -> ArticleRecord {
        let mut r = ArticleRecord::new(
            "detik",
            title,
            "https://www.detik.com/sumbagsel/berita/d-1/x",
            NaiveDate::from_ymd_opt(2024, 3, 12).unwrap(),
            body.to_string(),
        );
        r.label = label;
        r
    }

    #[test]
    fn test_header_only_for_empty_table() {
        assert_eq!(to_csv_string(&[]).unwrap(), "judul,link,tanggal,isi,label,sumber\n");
    }

    #[test]
    fn test_plain_row() {
        let csv = to_csv_string(&[rec("Harga cabai naik", "Isi berita.", 1)]).unwrap();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(
            lines[1],
            "Harga cabai naik,https://www.detik.com/sumbagsel/berita/d-1/x,2024-03-12,Isi berita.,1,detik"
        );
    }

    #[test]
    fn test_quotes_commas_and_newlines() {
        let csv = to_csv_string(&[rec("Kata \"pejabat\", kemarin", "baris satu\nbaris dua", -1)]).unwrap();
        assert!(csv.contains("\"Kata \"\"pejabat\"\", kemarin\""));
        assert!(csv.contains("\"baris satu\nbaris dua\""));
        assert!(csv.contains(",-1,detik\n"));
    }

    #[test]
    fn test_header_matches_record_field_names() {
        let records = vec![rec("Inflasi, turun", "isi \"kutipan\"", 1), rec("Banjir", "", -1)];
        let csv = to_csv_string(&records).unwrap();
        let parsed: Vec<ArticleRecord> = ::csv::Reader::from_reader(csv.as_bytes())
            .deserialize()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(parsed, records);
    }

    #[tokio::test]
    async fn test_write_tables_creates_both_files() {
        let dir = std::env::temp_dir().join(format!("lampung_news_csv_{}", std::process::id()));
        let dir_str = dir.to_string_lossy().to_string();
        let result = ScrapeResult {
            all: vec![rec("A", "ekonomi", 1), rec("B", "banjir", 0)],
            target: vec![rec("A", "ekonomi", 1)],
        };

        let (all, target) = write_tables(&result, &dir_str).await.unwrap();

        assert_eq!(std::fs::read_to_string(&all).unwrap().lines().count(), 3);
        assert_eq!(std::fs::read_to_string(&target).unwrap().lines().count(), 2);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}

//! Calendar-date normalization.
//!
//! Run bounds arrive as typed dates, date-times, free-form strings or raw YAML
//! values; article pages carry machine timestamps or human-readable dates in
//! English or Indonesian. Everything here collapses those into a
//! [`NaiveDate`]. All functions are pure: no clock, no I/O.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use thiserror::Error;

/// Formats accepted for run bounds, tried in order before the ISO and
/// natural-language fallbacks.
const BOUND_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y", "%Y-%m-%dT%H:%M:%S"];

/// Date-time layouts for `datetime` attributes that are not strict RFC 3339.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DateError {
    #[error("date format not supported: {0:?}")]
    Format(String),
    #[error("unsupported date type: {0}")]
    Type(String),
}

/// A date bound as supplied by a caller.
#[derive(Debug, Clone, PartialEq)]
pub enum DateInput {
    Absent,
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Zoned(DateTime<FixedOffset>),
    Text(String),
}

impl From<NaiveDate> for DateInput {
    fn from(d: NaiveDate) -> Self {
        DateInput::Date(d)
    }
}

impl From<NaiveDateTime> for DateInput {
    fn from(dt: NaiveDateTime) -> Self {
        DateInput::DateTime(dt)
    }
}

impl From<DateTime<FixedOffset>> for DateInput {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        DateInput::Zoned(dt)
    }
}

impl From<&str> for DateInput {
    fn from(s: &str) -> Self {
        DateInput::Text(s.to_string())
    }
}

impl From<String> for DateInput {
    fn from(s: String) -> Self {
        DateInput::Text(s)
    }
}

impl<T: Into<DateInput>> From<Option<T>> for DateInput {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(DateInput::Absent)
    }
}

impl TryFrom<&serde_yaml::Value> for DateInput {
    type Error = DateError;

    fn try_from(value: &serde_yaml::Value) -> Result<Self, Self::Error> {
        use serde_yaml::Value;
        match value {
            Value::Null => Ok(DateInput::Absent),
            Value::String(s) => Ok(DateInput::Text(s.clone())),
            Value::Tagged(tagged) => DateInput::try_from(&tagged.value),
            Value::Bool(_) => Err(DateError::Type("bool".into())),
            Value::Number(_) => Err(DateError::Type("number".into())),
            Value::Sequence(_) => Err(DateError::Type("sequence".into())),
            Value::Mapping(_) => Err(DateError::Type("mapping".into())),
        }
    }
}

/// Normalize a run bound to a calendar date.
///
/// `Absent` and blank strings mean "no bound". Strings are tried against
/// [`BOUND_FORMATS`], then ISO 8601 date-times, then [`parse_natural`].
pub fn normalize(input: impl Into<DateInput>) -> Result<Option<NaiveDate>, DateError> {
    match input.into() {
        DateInput::Absent => Ok(None),
        DateInput::Date(d) => Ok(Some(d)),
        DateInput::DateTime(dt) => Ok(Some(dt.date())),
        DateInput::Zoned(dt) => Ok(Some(dt.date_naive())),
        DateInput::Text(raw) => {
            let s = raw.trim();
            if s.is_empty() {
                return Ok(None);
            }
            for fmt in BOUND_FORMATS {
                if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
                    return Ok(Some(d));
                }
                if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                    return Ok(Some(dt.date()));
                }
            }
            parse_timestamp(s)
                .or_else(|| parse_natural(s))
                .map(Some)
                .ok_or_else(|| DateError::Format(s.to_string()))
        }
    }
}

/// Parse a machine-readable timestamp (e.g. a `<time datetime=..>` attribute)
/// and truncate it to its date.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in TIMESTAMP_FORMATS {
        if fmt.ends_with("%z") {
            if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
                return Some(dt.date_naive());
            }
        } else if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Parse displayed date text against an ordered list of `strftime` formats.
///
/// Indonesian month and weekday names are translated to English first and a
/// trailing Indonesian time-zone abbreviation is dropped, so a format such as
/// `"%A, %d %b %Y %H:%M"` matches `"Senin, 14 Okt 2024 10:00 WIB"`.
///
/// A leading weekday that disagrees with the date is ignored, not rejected.
pub fn parse_with_formats(raw: &str, formats: &[&str]) -> Option<NaiveDate> {
    let text = localize(raw);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    formats.iter().find_map(|fmt| {
        parse_one(text, fmt).or_else(|| {
            let fmt = strip_weekday_directive(fmt)?;
            let text = LEADING_WEEKDAY_RE.replace(text, "");
            parse_one(&text, fmt)
        })
    })
}

fn parse_one(text: &str, fmt: &str) -> Option<NaiveDate> {
    NaiveDateTime::parse_from_str(text, fmt)
        .map(|dt| dt.date())
        .or_else(|_| NaiveDate::parse_from_str(text, fmt))
        .ok()
}

fn strip_weekday_directive(fmt: &str) -> Option<&str> {
    let rest = fmt.strip_prefix("%A").or_else(|| fmt.strip_prefix("%a"))?;
    Some(rest.trim_start_matches(',').trim_start())
}

static LEADING_WEEKDAY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z']+,?\s*").unwrap());

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z']+").unwrap());
static TZ_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s*\b(WIB|WITA|WIT)\s*$").unwrap());

/// Translate Indonesian date words to English and drop a trailing time zone.
fn localize(raw: &str) -> String {
    let stripped = TZ_SUFFIX_RE.replace(raw.trim(), "");
    WORD_RE
        .replace_all(&stripped, |caps: &Captures| {
            let word = &caps[0];
            english_word(&word.to_lowercase())
                .map(str::to_string)
                .unwrap_or_else(|| word.to_string())
        })
        .into_owned()
}

fn english_word(lower: &str) -> Option<&'static str> {
    Some(match lower {
        "januari" => "January",
        "februari" | "pebruari" => "February",
        "maret" => "March",
        "mei" => "May",
        "juni" => "June",
        "juli" => "July",
        "agustus" => "August",
        "oktober" => "October",
        "nopember" => "November",
        "desember" => "December",
        "agu" | "agt" | "ags" => "Aug",
        "okt" => "Oct",
        "des" => "Dec",
        "senin" => "Monday",
        "selasa" => "Tuesday",
        "rabu" => "Wednesday",
        "kamis" => "Thursday",
        "jumat" | "jum'at" => "Friday",
        "sabtu" => "Saturday",
        "minggu" | "ahad" => "Sunday",
        _ => return None,
    })
}

/// Month number for an English or Indonesian month name or abbreviation.
fn month_number(word: &str) -> Option<u32> {
    let w = word.trim_end_matches('.').to_lowercase();
    Some(match w.as_str() {
        "jan" | "januari" | "january" => 1,
        "feb" | "februari" | "pebruari" | "february" => 2,
        "mar" | "maret" | "march" => 3,
        "apr" | "april" => 4,
        "mei" | "may" => 5,
        "jun" | "juni" | "june" => 6,
        "jul" | "juli" | "july" => 7,
        "agu" | "agt" | "ags" | "agustus" | "aug" | "august" => 8,
        "sep" | "sept" | "september" => 9,
        "okt" | "oktober" | "oct" | "october" => 10,
        "nov" | "nopember" | "november" => 11,
        "des" | "desember" | "dec" | "december" => 12,
        _ => return None,
    })
}

static DAY_MONTH_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})\s+([A-Za-z]+\.?),?\s+(\d{4})\b").unwrap());
static MONTH_DAY_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Za-z]+\.?)\s+(\d{1,2}),?\s+(\d{4})\b").unwrap());
static ISO_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})[-/](\d{1,2})[-/](\d{1,2})\b").unwrap());
static DMY_NUMERIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})[/.-](\d{1,2})[/.-](\d{4})\b").unwrap());

/// Natural-language date parse for free text such as `"12 March 2024"`,
/// `"Selasa, 12 Maret 2024 | 10:15 WIB"` or `"March 12, 2024"`.
///
/// Numeric `dd/mm/yyyy` is read day-first, the Indonesian convention.
pub fn parse_natural(raw: &str) -> Option<NaiveDate> {
    let text = raw.trim();

    let named = DAY_MONTH_YEAR_RE
        .captures_iter(text)
        .find_map(|c| ymd(&c[3], month_number(&c[2])?, &c[1]))
        .or_else(|| {
            MONTH_DAY_YEAR_RE
                .captures_iter(text)
                .find_map(|c| ymd(&c[3], month_number(&c[1])?, &c[2]))
        });
    if named.is_some() {
        return named;
    }

    ISO_DATE_RE
        .captures_iter(text)
        .find_map(|c| ymd(&c[1], c[2].parse().ok()?, &c[3]))
        .or_else(|| {
            DMY_NUMERIC_RE
                .captures_iter(text)
                .find_map(|c| ymd(&c[3], c[2].parse().ok()?, &c[1]))
        })
}

fn ymd(year: &str, month: u32, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month, day.parse().ok()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_normalize_absent_and_blank() {
        assert_eq!(normalize(DateInput::Absent), Ok(None));
        assert_eq!(normalize(None::<NaiveDate>), Ok(None));
        assert_eq!(normalize("   "), Ok(None));
    }

    #[test]
    fn test_normalize_typed_values() {
        let d = date(2024, 3, 12);
        assert_eq!(normalize(d), Ok(Some(d)));
        let dt = d.and_hms_opt(23, 59, 1).unwrap();
        assert_eq!(normalize(dt), Ok(Some(d)));
        let zoned = DateTime::parse_from_rfc3339("2024-03-12T08:00:00+07:00").unwrap();
        assert_eq!(normalize(zoned), Ok(Some(d)));
    }

    #[test]
    fn test_normalize_supported_string_formats() {
        let d = date(2024, 3, 12);
        assert_eq!(normalize("2024-03-12"), Ok(Some(d)));
        assert_eq!(normalize("2024/03/12"), Ok(Some(d)));
        assert_eq!(normalize("12-03-2024"), Ok(Some(d)));
        assert_eq!(normalize("2024-03-12T10:15:00"), Ok(Some(d)));
        assert_eq!(normalize(" 2024-03-12 "), Ok(Some(d)));
    }

    #[test]
    fn test_normalize_iso_fallbacks() {
        let d = date(2024, 3, 12);
        assert_eq!(normalize("2024-03-12T10:15:00+07:00"), Ok(Some(d)));
        assert_eq!(normalize("2024-03-12 10:15:00"), Ok(Some(d)));
        assert_eq!(normalize("2024-03-12T10:15:00.123456"), Ok(Some(d)));
    }

    #[test]
    fn test_normalize_natural_language_fallback() {
        let d = date(2024, 3, 12);
        assert_eq!(normalize("12 March 2024"), Ok(Some(d)));
        assert_eq!(normalize("12 Maret 2024"), Ok(Some(d)));
        assert_eq!(normalize("March 12, 2024"), Ok(Some(d)));
    }

    #[test]
    fn test_normalize_unsupported_string_is_format_error() {
        assert_eq!(
            normalize("kemarin sore"),
            Err(DateError::Format("kemarin sore".to_string()))
        );
        assert!(matches!(normalize("2024-13-45"), Err(DateError::Format(_))));
    }

    #[test]
    fn test_yaml_values_map_to_inputs() {
        let normalize_value =
            |v: &serde_yaml::Value| DateInput::try_from(v).and_then(normalize);
        let v: serde_yaml::Value = serde_yaml::from_str("2024-03-12").unwrap();
        assert_eq!(normalize_value(&v), Ok(Some(date(2024, 3, 12))));
        let null: serde_yaml::Value = serde_yaml::from_str("~").unwrap();
        assert_eq!(normalize_value(&null), Ok(None));
        let num: serde_yaml::Value = serde_yaml::from_str("20240312").unwrap();
        assert_eq!(normalize_value(&num), Err(DateError::Type("number".into())));
        let list: serde_yaml::Value = serde_yaml::from_str("[1, 2]").unwrap();
        assert!(matches!(normalize_value(&list), Err(DateError::Type(_))));
    }

    #[test]
    fn test_normalize_is_deterministic() {
        assert_eq!(normalize("12 Okt 2024"), normalize("12 Okt 2024"));
    }

    #[test]
    fn test_parse_timestamp_variants() {
        let d = date(2024, 10, 14);
        assert_eq!(parse_timestamp("2024-10-14T10:00:00+07:00"), Some(d));
        assert_eq!(parse_timestamp("2024-10-14T10:00:00Z"), Some(d));
        assert_eq!(parse_timestamp("2024-10-14T10:00:00+0700"), Some(d));
        assert_eq!(parse_timestamp("2024-10-14 10:00:00"), Some(d));
        assert_eq!(parse_timestamp("2024-10-14"), Some(d));
        assert_eq!(parse_timestamp("Senin, 14 Okt 2024"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn test_parse_with_formats_indonesian_text() {
        let formats = ["%A, %d %b %Y %H:%M", "%d %b %Y %H:%M", "%Y-%m-%d %H:%M"];
        let d = date(2024, 10, 14);
        assert_eq!(parse_with_formats("Senin, 14 Okt 2024 10:00 WIB", &formats), Some(d));
        assert_eq!(parse_with_formats("14 Okt 2024 10:00", &formats), Some(d));
        assert_eq!(parse_with_formats("2024-10-14 10:00", &formats), Some(d));
        assert_eq!(parse_with_formats("besok", &formats), None);
    }

    #[test]
    fn test_parse_with_formats_ignores_wrong_weekday() {
        let formats = ["%A, %d %b %Y %H:%M"];
        // 14 October 2024 was a Monday.
        assert_eq!(
            parse_with_formats("Selasa, 14 Okt 2024 10:00 WIB", &formats),
            Some(date(2024, 10, 14))
        );
        assert_eq!(
            parse_with_formats("Jum'at, 14 Okt 2024 10:00", &formats),
            Some(date(2024, 10, 14))
        );
        assert_eq!(parse_with_formats("Selasa, 99 Okt 2024 10:00", &formats), None);
    }

    #[test]
    fn test_parse_with_formats_full_month_names() {
        let formats = ["%d %B %Y"];
        assert_eq!(parse_with_formats("12 Maret 2024", &formats), Some(date(2024, 3, 12)));
        assert_eq!(parse_with_formats("6 Januari 2025", &formats), Some(date(2025, 1, 6)));
        assert_eq!(parse_with_formats("12 March 2024", &formats), Some(date(2024, 3, 12)));
    }

    #[test]
    fn test_parse_natural_embedded_in_text() {
        assert_eq!(
            parse_natural("Selasa, 12 Maret 2024 | 10:15 WIB"),
            Some(date(2024, 3, 12))
        );
        assert_eq!(parse_natural("Diposting 2024/03/12 oleh admin"), Some(date(2024, 3, 12)));
        assert_eq!(parse_natural("12/03/2024"), Some(date(2024, 3, 12)));
        assert_eq!(parse_natural("Jumat 31 Februari 2024"), None);
        assert_eq!(parse_natural("tanpa tanggal"), None);
    }
}

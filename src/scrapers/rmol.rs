//! RMOL Lampung site-search scraper.
//!
//! Listing pages come from the site search (`?s=lampung&page=N`). RMOL marks
//! up neither dates nor bylines consistently, so when there is no `<time>`
//! element the first text nodes of the page are scanned for something that
//! looks like a date.

use super::{SourceExtractor, article_fields, collect_links, first_time_tag_date};
use crate::dates::parse_with_formats;
use crate::models::{ArticleFields, LinkCandidate};
use chrono::NaiveDate;
use scraper::Html;
use tracing::debug;

const DATE_FORMATS: &[&str] = &["%d %B %Y", "%d %b %Y", "%Y-%m-%d"];

/// How many leading text nodes are searched for a displayed date.
const DATE_SCAN_NODES: usize = 50;

#[derive(Debug, Clone)]
pub struct Rmol {
    tag: String,
}

impl Rmol {
    pub fn new(tag: &str) -> Self {
        Self { tag: tag.to_string() }
    }
}

/// Scan the leading text nodes for a standalone date such as `12 Maret 2024`.
fn scan_text_date(document: &Html) -> Option<NaiveDate> {
    document
        .root_element()
        .text()
        .take(DATE_SCAN_NODES)
        .map(str::trim)
        .filter(|t| !t.is_empty() && t.contains("202"))
        .find_map(|t| parse_with_formats(t, DATE_FORMATS))
}

impl SourceExtractor for Rmol {
    fn name(&self) -> &'static str {
        "rmol"
    }

    fn listing_url(&self, page: u32) -> String {
        format!(
            "https://rmollampung.id/?s={}&page={}",
            urlencoding::encode(&self.tag),
            page
        )
    }

    fn discover_links(&self, listing_html: &str, listing_url: &str) -> Vec<LinkCandidate> {
        let document = Html::parse_document(listing_html);
        let links = collect_links(&document, listing_url, |href, text| {
            let plausible =
                href.contains("/202") || href.contains("/news/") || href.contains("rmollampung");
            plausible && !text.is_empty() && !text.to_lowercase().starts_with("read more")
        });
        debug!(count = links.len(), "Discovered rmol links");
        links
    }

    fn extract_article(&self, article_html: &str) -> Option<ArticleFields> {
        let document = Html::parse_document(article_html);
        let date = first_time_tag_date(&document).or_else(|| scan_text_date(&document));
        article_fields(&document, date)
    }
}

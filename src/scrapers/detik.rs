//! detikcom tag-page scraper.
//!
//! Listing pages are the portal's tag index sorted by time, e.g.
//! `https://www.detik.com/tag/lampung/?sortby=time&page=2`. Article links are
//! anything pointing into `/news/` or at a `detik.com` host; the listing page
//! is full of navigation links, so the rule is deliberately loose and the
//! runner discards pages that do not parse as articles.

use super::{SourceExtractor, article_fields, collect_links, first_text, first_time_tag_date};
use crate::dates::parse_with_formats;
use crate::models::{ArticleFields, LinkCandidate};
use scraper::Html;
use tracing::debug;

/// Displayed-date layouts, e.g. `Senin, 14 Okt 2024 10:00 WIB`.
const DATE_FORMATS: &[&str] = &["%A, %d %b %Y %H:%M", "%d %b %Y %H:%M", "%Y-%m-%d %H:%M"];

#[derive(Debug, Clone)]
pub struct Detik {
    tag: String,
}

impl Detik {
    pub fn new(tag: &str) -> Self {
        Self { tag: tag.to_string() }
    }
}

impl SourceExtractor for Detik {
    fn name(&self) -> &'static str {
        "detik"
    }

    fn listing_url(&self, page: u32) -> String {
        format!(
            "https://www.detik.com/tag/{}/?sortby=time&page={}",
            urlencoding::encode(&self.tag),
            page
        )
    }

    fn discover_links(&self, listing_html: &str, listing_url: &str) -> Vec<LinkCandidate> {
        let document = Html::parse_document(listing_html);
        let links = collect_links(&document, listing_url, |href, _| {
            href.contains("/news/") || href.contains("detik.com")
        });
        debug!(count = links.len(), "Discovered detik links");
        links
    }

    fn extract_article(&self, article_html: &str) -> Option<ArticleFields> {
        let document = Html::parse_document(article_html);
        let date = first_time_tag_date(&document).or_else(|| {
            first_text(&document, &[".date", ".time"])
                .and_then(|text| parse_with_formats(&text, DATE_FORMATS))
        });
        article_fields(&document, date)
    }
}

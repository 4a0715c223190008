//! ANTARA Lampung regional-update scraper.
//!
//! ANTARA's Lampung bureau publishes a paginated `lampung-update` index on its
//! own subdomain, so the listing URL does not depend on the region tag.
//! Displayed dates are free text ("Selasa, 12 Maret 2024 10:15 WIB") and go
//! through the natural-language parser.

use super::{SourceExtractor, any_time_tag_date, article_fields, collect_links, first_text};
use crate::dates::parse_natural;
use crate::models::{ArticleFields, LinkCandidate};
use scraper::Html;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
pub struct Antara;

impl SourceExtractor for Antara {
    fn name(&self) -> &'static str {
        "antara"
    }

    fn listing_url(&self, page: u32) -> String {
        format!("https://lampung.antaranews.com/lampung-update?page={page}")
    }

    fn discover_links(&self, listing_html: &str, listing_url: &str) -> Vec<LinkCandidate> {
        let document = Html::parse_document(listing_html);
        let links = collect_links(&document, listing_url, |href, _| {
            href.contains("/lampung-update/") || href.contains("antaranews.com")
        });
        debug!(count = links.len(), "Discovered antara links");
        links
    }

    fn extract_article(&self, article_html: &str) -> Option<ArticleFields> {
        let document = Html::parse_document(article_html);
        let date = any_time_tag_date(&document).or_else(|| {
            first_text(&document, &[".date", "p.date"]).and_then(|text| parse_natural(&text))
        });
        article_fields(&document, date)
    }
}

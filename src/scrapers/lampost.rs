//! Lampung Post tag-page scraper.
//!
//! Article URLs embed the publication year (`/2024/...`), so links are kept
//! only when they contain a `/202` path segment and point at a lampost host.

use super::{SourceExtractor, any_time_tag_date, article_fields, collect_links, first_text};
use crate::dates::{parse_timestamp, parse_with_formats};
use crate::models::{ArticleFields, LinkCandidate};
use scraper::Html;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Lampost {
    tag: String,
}

impl Lampost {
    pub fn new(tag: &str) -> Self {
        Self { tag: tag.to_string() }
    }
}

impl SourceExtractor for Lampost {
    fn name(&self) -> &'static str {
        "lampost"
    }

    fn listing_url(&self, page: u32) -> String {
        format!(
            "https://lampost.co.id/tag/{}/page/{}",
            urlencoding::encode(&self.tag),
            page
        )
    }

    fn discover_links(&self, listing_html: &str, listing_url: &str) -> Vec<LinkCandidate> {
        let document = Html::parse_document(listing_html);
        let links = collect_links(&document, listing_url, |href, _| {
            href.contains("/202") && href.contains("lampost")
        });
        debug!(count = links.len(), "Discovered lampost links");
        links
    }

    fn extract_article(&self, article_html: &str) -> Option<ArticleFields> {
        let document = Html::parse_document(article_html);
        // Displayed dates read "12 Maret 2024 - 10:15"; only the part before
        // the dash is a date.
        let date = any_time_tag_date(&document).or_else(|| {
            first_text(&document, &[".published", "span.date"]).and_then(|text| {
                let head = text.split(" -").next().unwrap_or_default().trim();
                parse_with_formats(head, &["%d %B %Y"]).or_else(|| parse_timestamp(head))
            })
        });
        article_fields(&document, date)
    }
}

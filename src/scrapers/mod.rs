//! News portal extractors.
//!
//! Each portal gets one [`SourceExtractor`] implementation that owns its link
//! detection rule and its date fallback order. Every extractor follows the
//! same two-phase pattern:
//!
//! 1. **Discovery**: pick candidate article links out of a listing page
//! 2. **Extraction**: pull title, date and body text out of an article page
//!
//! # Supported Sources
//!
//! | Source | Module | Listing | Link rule |
//! |--------|--------|---------|-----------|
//! | detikcom | [`detik`] | `/tag/{tag}/?sortby=time` | `/news/` or `detik.com` |
//! | RMOL Lampung | [`rmol`] | site search `?s={tag}` | `/202`, `/news/` or `rmollampung` |
//! | ANTARA Lampung | [`antara`] | `/lampung-update` | `/lampung-update/` or `antaranews.com` |
//! | Lampung Post | [`lampost`] | `/tag/{tag}/page/{n}` | `/202` and `lampost` |
//!
//! # Date Fallback
//!
//! 1. `<time datetime="..">` parsed as a timestamp, truncated to a date
//! 2. Displayed date text parsed with portal-specific formats
//! 3. No date; the runner applies its undated policy

use crate::models::{ArticleFields, LinkCandidate};
use chrono::NaiveDate;
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

pub mod antara;
pub mod detik;
pub mod lampost;
pub mod rmol;

/// Extraction capability for one news portal.
pub trait SourceExtractor {
    /// Short portal name used in logs and the `sumber` column.
    fn name(&self) -> &'static str;

    /// URL of listing page `page` (1-based).
    fn listing_url(&self, page: u32) -> String;

    /// Candidate article links on a listing page, absolute, deduplicated by
    /// URL and in first-seen order.
    fn discover_links(&self, listing_html: &str, listing_url: &str) -> Vec<LinkCandidate>;

    /// Title, date and body of an article page, or `None` when the page
    /// holds no recognizable article.
    fn extract_article(&self, article_html: &str) -> Option<ArticleFields>;
}

/// The configured set of portals.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Portal {
    Detik,
    Rmol,
    Antara,
    Lampost,
}

impl Portal {
    /// All portals in their default run order.
    pub const ALL: [Portal; 4] = [Portal::Detik, Portal::Rmol, Portal::Antara, Portal::Lampost];

    /// Build the extractor for this portal; `tag` is the region keyword used
    /// in listing URLs.
    pub fn extractor(self, tag: &str) -> Box<dyn SourceExtractor> {
        match self {
            Portal::Detik => Box::new(detik::Detik::new(tag)),
            Portal::Rmol => Box::new(rmol::Rmol::new(tag)),
            Portal::Antara => Box::new(antara::Antara),
            Portal::Lampost => Box::new(lampost::Lampost::new(tag)),
        }
    }
}

impl fmt::Display for Portal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Portal::Detik => "detik",
            Portal::Rmol => "rmol",
            Portal::Antara => "antara",
            Portal::Lampost => "lampost",
        };
        f.write_str(name)
    }
}

static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static TIME: Lazy<Selector> = Lazy::new(|| Selector::parse("time").unwrap());
static HEADING: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").unwrap());
static OG_TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:title"]"#).unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());

/// Text content of an element with whitespace runs collapsed to one space.
pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    el.text().flat_map(str::split_whitespace).join(" ")
}

/// Collect `a[href]` links that satisfy `keep(href, anchor_text)`.
///
/// `href` is tested as written in the page; accepted links are resolved
/// against `listing_url` and deduplicated by the resolved URL.
pub(crate) fn collect_links<F>(document: &Html, listing_url: &str, keep: F) -> Vec<LinkCandidate>
where
    F: Fn(&str, &str) -> bool,
{
    let base = Url::parse(listing_url).ok();

    document
        .select(&ANCHOR)
        .filter_map(|a| {
            let href = a.value().attr("href")?.trim();
            if href.is_empty()
                || href.starts_with('#')
                || href.starts_with("javascript:")
                || href.starts_with("mailto:")
            {
                return None;
            }
            let text = element_text(a);
            if !keep(href, &text) {
                return None;
            }
            let url = match Url::parse(href) {
                Ok(abs) => abs,
                Err(_) => base.as_ref()?.join(href).ok()?,
            };
            if !matches!(url.scheme(), "http" | "https") {
                return None;
            }
            Some(LinkCandidate {
                title_hint: text,
                url: url.to_string(),
            })
        })
        .unique_by(|c| c.url.clone())
        .collect()
}

/// Space-joined text of every `<p>` in document order, empty ones included.
pub(crate) fn paragraph_body(document: &Html) -> String {
    document.select(&PARAGRAPH).map(element_text).join(" ")
}

fn paragraph_count(document: &Html) -> usize {
    document.select(&PARAGRAPH).count()
}

/// Date from the first `<time>` element, when it carries a parseable
/// `datetime` attribute.
pub(crate) fn first_time_tag_date(document: &Html) -> Option<NaiveDate> {
    let time = document.select(&TIME).next()?;
    crate::dates::parse_timestamp(time.value().attr("datetime")?)
}

/// Date from the first `<time>` element whose `datetime` attribute parses.
pub(crate) fn any_time_tag_date(document: &Html) -> Option<NaiveDate> {
    document
        .select(&TIME)
        .filter_map(|t| t.value().attr("datetime"))
        .find_map(crate::dates::parse_timestamp)
}

/// Text of the first element matching any of `selectors`, tried in order.
pub(crate) fn first_text(document: &Html, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|s| {
        let selector = Selector::parse(s).ok()?;
        document.select(&selector).next().map(element_text)
    })
}

/// Headline of an article page: `<h1>`, then `og:title`, then `<title>`.
pub(crate) fn article_title(document: &Html) -> String {
    let from_h1 = document
        .select(&HEADING)
        .map(element_text)
        .find(|t| !t.is_empty());
    let from_og = || {
        document
            .select(&OG_TITLE)
            .filter_map(|m| m.value().attr("content"))
            .map(|c| c.trim().to_string())
            .find(|t| !t.is_empty())
    };
    let from_title = || {
        document
            .select(&TITLE)
            .map(element_text)
            .find(|t| !t.is_empty())
    };
    from_h1.or_else(from_og).or_else(from_title).unwrap_or_default()
}

/// Assemble [`ArticleFields`] from a parsed article page.
///
/// Returns `None` when the page has neither a headline nor any paragraph.
pub(crate) fn article_fields(document: &Html, date: Option<NaiveDate>) -> Option<ArticleFields> {
    let title = article_title(document);
    if title.is_empty() && paragraph_count(document) == 0 {
        return None;
    }
    Some(ArticleFields {
        title,
        date,
        body: paragraph_body(document),
    })
}

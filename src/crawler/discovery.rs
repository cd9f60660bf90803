//! Frontier discovery
//!
//! Turns seeds into listing page URLs and listing pages into item URLs.
//! Listing documents are scanned with patterns over the embedded data rather
//! than walked as a DOM, so cosmetic markup changes on the storefront do not
//! break discovery. Sitemaps are read with an XML pull parser.

use crate::crawler::fetcher::{fetch_document, Transport};
use crate::url::{item_url, listing_page_url};
use crate::{HarvestError, UrlResult};
use quick_xml::events::Event as XmlEvent;
use quick_xml::Reader;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// JSON pointer to the category's total item count inside `__NEXT_DATA__`
const TOTAL_POINTER: &str = "/props/initialProps/pageProps/initialProductData/total";

fn item_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?s)"mainVariant":\s*\{.*?"id":"(.*?)".*?"slug":"(.*?)".*?\}"#)
            .unwrap_or_else(|_| unreachable!())
    })
}

/// Number of listing pages needed to show `total` items
///
/// # Examples
///
/// ```
/// use catalog_harvest::crawler::page_count;
///
/// assert_eq!(page_count(41, 20), 3);
/// assert_eq!(page_count(40, 20), 2);
/// assert_eq!(page_count(0, 20), 0);
/// ```
pub fn page_count(total: u64, page_size: u32) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(u64::from(page_size))
}

/// Reads the category's total item count from its `__NEXT_DATA__` script
///
/// Returns `None` when the script is absent, is not valid JSON, or does not
/// hold a non-negative integer at the expected location.
pub fn parse_total_items(document: &str) -> Option<u64> {
    let selector = Selector::parse("script#__NEXT_DATA__").ok()?;
    let html = Html::parse_document(document);
    let script = html.select(&selector).next()?;
    let json = script.text().collect::<String>();

    let data: serde_json::Value = serde_json::from_str(&json).ok()?;
    data.pointer(TOTAL_POINTER)?.as_u64()
}

/// Listing URLs `{category}?page=n` for n in `1..=pages`
pub fn listing_urls(category_url: &str, pages: u64) -> UrlResult<Vec<String>> {
    (1..=pages)
        .map(|page| listing_page_url(category_url, page))
        .collect()
}

/// Listing URLs for a fixed page range, both ends inclusive
pub fn range_listing_urls(listing_url: &str, first: u32, last: u32) -> UrlResult<Vec<String>> {
    (first..=last)
        .map(|page| listing_page_url(listing_url, u64::from(page)))
        .collect()
}

/// Discovers the listing pages of one category
///
/// Fetches the category page, reads its total item count and generates one
/// listing URL per page. A category without usable count metadata yields no
/// pages; that is logged and is not an error.
///
/// # Returns
///
/// * `Ok(Vec<String>)` - Listing URLs, possibly empty
/// * `Err(HarvestError::Transport)` - The category page could not be fetched
pub async fn discover_listing_pages(
    transport: &dyn Transport,
    category_url: &str,
    page_size: u32,
) -> Result<Vec<String>, HarvestError> {
    let document = fetch_document(transport, category_url)
        .await
        .map_err(|source| HarvestError::Transport {
            url: category_url.to_string(),
            source,
        })?;

    let Some(total) = parse_total_items(&document) else {
        tracing::warn!(url = category_url, "category has no item count metadata, skipping");
        return Ok(Vec::new());
    };

    let pages = page_count(total, page_size);
    tracing::debug!(url = category_url, total, pages, "category discovered");

    Ok(listing_urls(category_url, pages)?)
}

/// Extracts the item URLs referenced by a listing page
///
/// Matches with an empty slug or id are skipped. A page without matches
/// yields an empty set.
pub fn extract_item_urls(base_url: &str, document: &str) -> BTreeSet<String> {
    item_pattern()
        .captures_iter(document)
        .filter_map(|caps| {
            let id = caps.get(1)?.as_str();
            let slug = caps.get(2)?.as_str();
            item_url(base_url, slug, id).ok()
        })
        .collect()
}

/// Collects the `<loc>` entries of a sitemap document, in document order
///
/// Entries are deduplicated. Parsing stops at the first XML error, keeping
/// the locations read up to that point.
pub fn parse_sitemap_locations(xml: &str) -> Vec<String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut seen = BTreeSet::new();
    let mut locations = Vec::new();
    let mut current: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(XmlEvent::Start(e)) if e.local_name().as_ref() == b"loc" => {
                current = Some(String::new());
            }
            Ok(XmlEvent::Text(t)) => {
                if let Some(loc) = current.as_mut() {
                    match t.unescape() {
                        Ok(text) => loc.push_str(&text),
                        Err(e) => {
                            tracing::warn!(error = %e, "skipping malformed sitemap text");
                        }
                    }
                }
            }
            Ok(XmlEvent::CData(cdata)) => {
                if let Some(loc) = current.as_mut() {
                    loc.push_str(&String::from_utf8_lossy(&cdata));
                }
            }
            Ok(XmlEvent::End(e)) if e.local_name().as_ref() == b"loc" => {
                if let Some(loc) = current.take() {
                    let loc = loc.trim().to_string();
                    if !loc.is_empty() && seen.insert(loc.clone()) {
                        locations.push(loc);
                    }
                }
            }
            Ok(XmlEvent::Eof) => break,
            Err(e) => {
                tracing::warn!(
                    position = reader.buffer_position(),
                    error = %e,
                    "sitemap is not well-formed, keeping entries read so far"
                );
                break;
            }
            _ => {}
        }
    }

    locations
}

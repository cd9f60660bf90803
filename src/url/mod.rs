//! URL handling module for Catalog-Harvest
//!
//! Work URLs are compared by string equality, so every URL the crawler
//! produces is built here and goes through the same parse/serialize step.

use crate::{UrlError, UrlResult};
use url::Url;

/// Parses an absolute http(s) URL
pub fn parse_http_url(raw: &str) -> UrlResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(UrlError::InvalidScheme(other.to_string())),
    }
}

/// Builds the URL of one page of a category listing
///
/// The page number is appended as a `page` query parameter, keeping any
/// query the category URL already carries.
///
/// # Examples
///
/// ```
/// use catalog_harvest::url::listing_page_url;
///
/// let url = listing_page_url("https://store.example.com/c/cleaning", 3).unwrap();
/// assert_eq!(url, "https://store.example.com/c/cleaning?page=3");
/// ```
pub fn listing_page_url(category_url: &str, page: u64) -> UrlResult<String> {
    let mut url = parse_http_url(category_url)?;
    url.query_pairs_mut()
        .append_pair("page", &page.to_string());
    Ok(url.to_string())
}

/// Builds a canonical product URL: `{base}/p/{slug}/{id}/`
///
/// # Examples
///
/// ```
/// use catalog_harvest::url::item_url;
///
/// let url = item_url("https://store.example.com/", "hand-soap-500ml", "9f2c").unwrap();
/// assert_eq!(url, "https://store.example.com/p/hand-soap-500ml/9f2c/");
/// ```
pub fn item_url(base_url: &str, slug: &str, id: &str) -> UrlResult<String> {
    if slug.is_empty() || id.is_empty() {
        return Err(UrlError::Parse(format!(
            "empty slug or id (slug='{}', id='{}')",
            slug, id
        )));
    }

    let raw = format!("{}/p/{}/{}/", base_url.trim_end_matches('/'), slug, id);
    Ok(parse_http_url(&raw)?.to_string())
}

//! Listing page discovery
//!
//! Forum listing pages mark every topic link with a hover-card attribute.
//! Author links carry the same attribute, so profile paths are filtered out.

use crate::url::{canonical_thread_url, is_profile_url, is_topic_url, resolve_link};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use url::Url;

static HOVER_LINK: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("a[data-ipshover][href]").expect("hover link selector must parse")
});

/// Extracts the set of thread URLs from a listing page
///
/// # Arguments
///
/// * `html` - The listing page body
/// * `base_url` - The listing page URL, for resolving relative links
///
/// # Returns
///
/// The deduplicated thread URLs; an empty set means the page had none.
///
/// # Example
///
/// ```
/// use sumi_harvest::crawler::discover_threads;
/// use url::Url;
///
/// let html = r#"<a data-ipshover href="/forums/topic/12-show/">Show</a>
///               <a data-ipshover href="/forums/profile/3-user/">user</a>"#;
/// let base = Url::parse("https://forum.example/forums/forum/1-tv/").unwrap();
/// let threads = discover_threads(html, &base);
/// assert_eq!(threads.len(), 1);
/// ```
pub fn discover_threads(html: &str, base_url: &Url) -> BTreeSet<Url> {
    let document = Html::parse_document(html);

    document
        .select(&HOVER_LINK)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .filter(|url| is_topic_url(url) && !is_profile_url(url))
        .map(|url| canonical_thread_url(&url))
        .collect()
}

/// URL of listing page `page` (1-based)
///
/// Page 1 is the base URL itself; later pages append `page_path` with
/// `{page}` substituted.
pub fn page_url(base_url: &Url, page_path: &str, page: u32) -> Result<Url, url::ParseError> {
    if page <= 1 {
        return Ok(base_url.clone());
    }

    let mut base = base_url.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.set_query(None);
    base.set_fragment(None);

    base.join(&page_path.replace("{page}", &page.to_string()))
}

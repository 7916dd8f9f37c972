//! Magnet URI parsing

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

// Exactly 40 hex digits: a longer run or a base32 hash is rejected
static BTIH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)urn:btih:([0-9a-f]{40})(?:[^0-9a-z]|$)").expect("btih pattern must compile")
});

/// Returns true if the href is a magnet URI
pub fn is_magnet(href: &str) -> bool {
    href.trim_start()
        .get(..8)
        .map(|scheme| scheme.eq_ignore_ascii_case("magnet:?"))
        .unwrap_or(false)
}

/// Extracts the BitTorrent info hash from a magnet URI
///
/// The hash is returned exactly as written in the URI. Magnets without
/// `urn:btih:` followed by exactly 40 hex characters yield None.
///
/// # Examples
///
/// ```
/// use sumi_harvest::url::extract_info_hash;
///
/// let magnet = "magnet:?xt=urn:btih:0123456789abcdef0123456789abcdef01234567&dn=Show";
/// assert_eq!(
///     extract_info_hash(magnet).as_deref(),
///     Some("0123456789abcdef0123456789abcdef01234567")
/// );
/// assert_eq!(extract_info_hash("magnet:?dn=Show"), None);
/// ```
pub fn extract_info_hash(magnet: &str) -> Option<String> {
    if !is_magnet(magnet) {
        return None;
    }
    BTIH.captures(magnet).map(|caps| caps[1].to_string())
}

/// The decoded `dn` (display name) parameter of a magnet URI
pub fn display_name(magnet: &str) -> Option<String> {
    let url = Url::parse(magnet.trim()).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "dn")
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// The decoded `tr` (announce URL) parameters of a magnet URI, in order
pub fn announce_urls(magnet: &str) -> Vec<String> {
    let Ok(url) = Url::parse(magnet.trim()) else {
        return Vec::new();
    };
    url.query_pairs()
        .filter(|(key, _)| key == "tr")
        .map(|(_, value)| value.into_owned())
        .collect()
}

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use url::Url;

static TOPIC_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/topic/(\d+)").expect("topic pattern must compile"));

/// Derives a stable thread id from a thread URL
///
/// The numeric prefix of the `/topic/{id}-{slug}` segment is used when present.
/// Otherwise the id is the first 16 hex digits of the SHA-256 of the full URL,
/// so the same URL always maps to the same id across crawls.
///
/// # Examples
///
/// ```
/// use sumi_harvest::url::thread_id_from_url;
/// use url::Url;
///
/// let url = Url::parse("https://forum.example/forums/topic/12345-some-show/").unwrap();
/// assert_eq!(thread_id_from_url(&url), "12345");
/// ```
pub fn thread_id_from_url(url: &Url) -> String {
    if let Some(caps) = TOPIC_SEGMENT.captures(url.as_str()) {
        return caps[1].to_string();
    }

    let digest = Sha256::digest(url.as_str().as_bytes());
    hex::encode(digest)[..16].to_string()
}

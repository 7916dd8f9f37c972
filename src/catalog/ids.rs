//! Deterministic record ids

use crate::title::{normalize_id, ParsedTitle};
use sha2::{Digest, Sha256};

/// Hex digits of the content hash kept in a stream id
const HASH_PREFIX_LEN: usize = 12;

/// Group id for a parsed title: the id-normalized catalog title
///
/// Falls back to `thread-{thread_id}` when normalization leaves nothing, so
/// titles made only of symbols still get a stable id.
///
/// # Examples
///
/// ```
/// use sumi_harvest::catalog::group_id;
/// use sumi_harvest::parse_title;
///
/// let parsed = parse_title("Cooku With Comali (2025) S06E01 [Tamil - 1080p]");
/// assert_eq!(group_id(&parsed, "4242"), "cooku-with-comali-2025-s06");
/// ```
pub fn group_id(parsed: &ParsedTitle, thread_id: &str) -> String {
    let id = normalize_id(&parsed.catalog_title());
    if id.is_empty() {
        format!("thread-{thread_id}")
    } else {
        id
    }
}

/// Stream id: `{groupId}:{season}:{episode}:{resolution}:{hash}`
///
/// The episode is 0 when unknown and the resolution `na`. The hash is a prefix
/// of the SHA-256 of the lowercased info hash, so two magnets for the same
/// torrent map to the same stream while different resolutions of the same
/// episode never collide.
pub fn stream_id(
    group_id: &str,
    season: u32,
    episode: Option<u32>,
    resolution: Option<&str>,
    info_hash: &str,
) -> String {
    let digest = hex::encode(Sha256::digest(info_hash.to_lowercase().as_bytes()));
    format!(
        "{}:{}:{}:{}:{}",
        group_id,
        season,
        episode.unwrap_or(0),
        resolution.unwrap_or("na").to_lowercase(),
        &digest[..HASH_PREFIX_LEN]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::title::parse_title;

    #[test]
    fn test_group_id_ignores_episode_and_metadata() {
        let a = parse_title("Cooku With Comali (2025) S06E01 [Tamil - 1080p]");
        let b = parse_title("Cooku with Comali (2025) S06E02 [Tam + Tel] 720p HDRip");
        assert_eq!(group_id(&a, "1"), group_id(&b, "2"));

        let other_season = parse_title("Cooku With Comali (2025) S05E01");
        assert_ne!(group_id(&a, "1"), group_id(&other_season, "3"));
    }

    #[test]
    fn test_group_id_fallback() {
        let parsed = parse_title("🎬🎬");
        assert_eq!(group_id(&parsed, "77"), "thread-77");
    }

    #[test]
    fn test_stream_id_shape() {
        let hash = "ABCDEFABCDEFABCDEFABCDEFABCDEFABCDEFABCD";
        let id = stream_id("show-s01", 1, Some(3), Some("1080p"), hash);
        let parts: Vec<&str> = id.split(':').collect();
        assert_eq!(&parts[..4], &["show-s01", "1", "3", "1080p"]);
        assert_eq!(parts[4].len(), HASH_PREFIX_LEN);

        assert_eq!(id, stream_id("show-s01", 1, Some(3), Some("1080p"), &hash.to_lowercase()));
        assert!(stream_id("show-s01", 1, None, None, hash).starts_with("show-s01:1:0:na:"));
    }

    #[test]
    fn test_resolutions_give_distinct_streams() {
        let a = stream_id("g", 1, Some(1), Some("1080p"), &"a".repeat(40));
        let b = stream_id("g", 1, Some(1), Some("720p"), &"b".repeat(40));
        assert_ne!(a, b);
    }
}

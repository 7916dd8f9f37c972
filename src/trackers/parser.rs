//! Tracker list parser

use std::collections::HashSet;

const ANNOUNCE_SCHEMES: &[&str] = &["udp://", "http://", "https://", "wss://"];

/// Parses a newline-delimited tracker list
///
/// Blank lines and `#` comments are dropped, as is anything that is not a
/// `udp`, `http(s)` or `wss` announce URL. Duplicates are removed while
/// keeping first-seen order.
///
/// # Examples
///
/// ```
/// use sumi_harvest::trackers::parse_tracker_list;
///
/// let list = "udp://tracker.example:1337/announce\n\n# mirror\nudp://tracker.example:1337/announce\n";
/// assert_eq!(parse_tracker_list(list), vec!["udp://tracker.example:1337/announce"]);
/// ```
pub fn parse_tracker_list(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();

    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| {
            let lowered = line.to_ascii_lowercase();
            ANNOUNCE_SCHEMES.iter().any(|scheme| lowered.starts_with(scheme))
        })
        .filter(|line| seen.insert(line.to_string()))
        .map(str::to_string)
        .collect()
}

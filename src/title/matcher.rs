//! Fuzzy title matching
//!
//! Titles are compared after [`normalize`](crate::title::normalize) using
//! Jaro-Winkler similarity, which tolerates small spelling drift between
//! uploads of the same show.

use crate::title::normalize;
use strsim::jaro_winkler;

/// Default threshold for free-text matching
pub const DEFAULT_THRESHOLD: f64 = 0.85;

/// Threshold used before overwriting a stored catalog title
pub const GROUP_THRESHOLD: f64 = 0.9;

/// Jaro-Winkler similarity of the normalized titles, 0.0 when either is empty
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    jaro_winkler(&a, &b)
}

/// Whether two titles name the same logical show
///
/// # Examples
///
/// ```
/// use sumi_harvest::title::{similar, DEFAULT_THRESHOLD};
///
/// assert!(similar("Mercy For None", "mercy for none", DEFAULT_THRESHOLD));
/// assert!(!similar("Mercy For None", "Leo", DEFAULT_THRESHOLD));
/// ```
pub fn similar(a: &str, b: &str, threshold: f64) -> bool {
    let score = similarity(a, b);
    score > 0.0 && score >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_and_punctuation_do_not_matter() {
        assert!(similar("Mercy For None", "mercy for none", 0.85));
        assert!(similar("Mercy-For-None!", "mercy for none", 0.99));
    }

    #[test]
    fn test_unrelated_titles_do_not_match() {
        assert!(!similar("Mercy For None", "Leo", 0.85));
        assert!(!similar("Cooku With Comali", "Bigg Boss", 0.85));
    }

    #[test]
    fn test_small_drift_matches_at_group_threshold() {
        assert!(similar(
            "Cooku With Comali (2025) S06",
            "Cooku with Comaali (2025) S06",
            GROUP_THRESHOLD
        ));
    }

    #[test]
    fn test_empty_never_matches() {
        assert!(!similar("", "", 0.0));
        assert!(!similar("!!!", "!!!", 0.5));
        assert_eq!(similarity("", "Leo"), 0.0);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let score = similarity("Vikram Vedha", "Vikram Veda");
        assert!(similar("Vikram Vedha", "Vikram Veda", score));
        assert!(!similar("Vikram Vedha", "Vikram Veda", (score + 0.001).min(1.0)));
    }
}

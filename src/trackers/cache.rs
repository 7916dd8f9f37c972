//! Cached tracker list

use chrono::{DateTime, Duration, Utc};

/// The tracker list together with the time it was fetched
///
/// An empty list that was never fetched is always stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerList {
    pub trackers: Vec<String>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl TrackerList {
    /// Creates a list stamped with the current time
    pub fn new(trackers: Vec<String>) -> Self {
        Self {
            trackers,
            fetched_at: Some(Utc::now()),
        }
    }

    /// A list that has never been fetched
    pub fn empty() -> Self {
        Self {
            trackers: Vec::new(),
            fetched_at: None,
        }
    }

    /// Checks if the list is older than `max_age` (or was never fetched)
    pub fn is_stale(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        match self.fetched_at {
            Some(fetched_at) => now - fetched_at > max_age,
            None => true,
        }
    }

    /// Returns the age of the list, if it was ever fetched
    pub fn age(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.fetched_at.map(|fetched_at| now - fetched_at)
    }

    /// Announce URLs from a magnet followed by the cached ones, without duplicates
    pub fn merged_with(&self, own: &[String]) -> Vec<String> {
        let mut merged: Vec<String> = Vec::with_capacity(own.len() + self.trackers.len());
        for tracker in own.iter().chain(self.trackers.iter()) {
            if !merged.contains(tracker) {
                merged.push(tracker.clone());
            }
        }
        merged
    }
}

impl Default for TrackerList {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_fetched_is_stale() {
        let list = TrackerList::empty();
        assert!(list.is_stale(Duration::hours(24), Utc::now()));
        assert_eq!(list.age(Utc::now()), None);
    }

    #[test]
    fn test_staleness_uses_max_age() {
        let mut list = TrackerList::new(vec!["udp://a.example:80".into()]);
        let now = Utc::now();
        assert!(!list.is_stale(Duration::hours(24), now));

        list.fetched_at = Some(now - Duration::hours(25));
        assert!(list.is_stale(Duration::hours(24), now));
        assert!(!list.is_stale(Duration::hours(48), now));
    }

    #[test]
    fn test_merged_with_keeps_own_first() {
        let list = TrackerList::new(vec!["udp://b.example:80".into(), "udp://a.example:80".into()]);
        let merged = list.merged_with(&["udp://a.example:80".into()]);
        assert_eq!(merged, vec!["udp://a.example:80", "udp://b.example:80"]);
    }
}

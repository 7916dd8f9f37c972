//! Revisit decisions for known threads
//!
//! A thread's tracking record is the `thread:{id}` record in the store. Only
//! its `processedAt` field matters here.

use crate::storage::{parse_timestamp, Fields};
use chrono::{DateTime, Duration, Utc};
use std::fmt;

/// Where a thread stands relative to the revisit threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadStatus {
    /// No tracking record exists yet
    Unseen,

    /// Processed more recently than the threshold
    Fresh { processed_at: DateTime<Utc> },

    /// Processed longer ago than the threshold
    Stale { processed_at: DateTime<Utc> },

    /// The record has no usable `processedAt` timestamp
    Malformed,
}

impl ThreadStatus {
    /// Classifies a tracking record
    ///
    /// # Arguments
    ///
    /// * `record` - The stored thread record, if any
    /// * `threshold` - Minimum age before a thread is processed again
    /// * `now` - The current time
    pub fn evaluate(record: Option<&Fields>, threshold: Duration, now: DateTime<Utc>) -> Self {
        let Some(record) = record else {
            return Self::Unseen;
        };

        match record.get("processedAt").and_then(|raw| parse_timestamp(raw)) {
            Some(processed_at) if now - processed_at < threshold => Self::Fresh { processed_at },
            Some(processed_at) => Self::Stale { processed_at },
            None => Self::Malformed,
        }
    }

    /// Returns true if the thread should be fetched and parsed again
    pub fn needs_processing(&self) -> bool {
        !matches!(self, Self::Fresh { .. })
    }
}

impl fmt::Display for ThreadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unseen => write!(f, "unseen"),
            Self::Fresh { .. } => write!(f, "fresh"),
            Self::Stale { .. } => write!(f, "stale"),
            Self::Malformed => write!(f, "malformed"),
        }
    }
}

/// Returns true if a thread with this tracking record needs processing
///
/// Missing records and records without a parsable `processedAt` always do,
/// regardless of the threshold.
pub fn needs_processing(record: Option<&Fields>, threshold: Duration, now: DateTime<Utc>) -> bool {
    ThreadStatus::evaluate(record, threshold, now).needs_processing()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(processed_at: Option<&str>) -> Fields {
        let mut fields = Fields::new();
        fields.insert("threadId".into(), "1".into());
        if let Some(ts) = processed_at {
            fields.insert("processedAt".into(), ts.into());
        }
        fields
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_unseen_thread_needs_processing() {
        assert_eq!(
            ThreadStatus::evaluate(None, Duration::hours(24), now()),
            ThreadStatus::Unseen
        );
        assert!(needs_processing(None, Duration::hours(24), now()));
    }

    #[test]
    fn test_fresh_and_stale() {
        let recent = record(Some("2025-06-01T06:00:00Z"));
        let old = record(Some("2025-05-30T12:00:00Z"));

        assert!(!needs_processing(Some(&recent), Duration::hours(24), now()));
        assert!(needs_processing(Some(&old), Duration::hours(24), now()));
        assert!(needs_processing(Some(&recent), Duration::hours(1), now()));
    }

    #[test]
    fn test_missing_timestamp_always_needs_processing() {
        let missing = record(None);
        let garbage = record(Some("not a date"));

        for threshold in [Duration::hours(1), Duration::days(3650)] {
            assert!(needs_processing(Some(&missing), threshold, now()));
            assert!(needs_processing(Some(&garbage), threshold, now()));
        }
        assert_eq!(
            ThreadStatus::evaluate(Some(&missing), Duration::hours(1), now()),
            ThreadStatus::Malformed
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(ThreadStatus::Unseen.to_string(), "unseen");
        assert_eq!(ThreadStatus::Malformed.to_string(), "malformed");
    }
}

//! Failure-event side channel
//!
//! Components report degraded or failed work here instead of returning errors
//! that would stop the harvest. The default sink turns every event into a
//! structured `tracing` record.

use std::sync::Mutex;

/// Something worth recording that did not stop the harvest
#[derive(Debug, Clone, PartialEq)]
pub enum HarvestEvent {
    /// A URL could not be fetched within the retry budget
    FetchFailed {
        url: String,
        attempts: u32,
        error: String,
    },

    /// A thread page yielded no usable title
    ExtractionFailed { url: String, reason: String },

    /// The original-post timestamp was missing or unparsable
    TimestampFallback { url: String, raw: Option<String> },

    /// A single release was dropped
    ReleaseRejected { thread_id: String, reason: String },

    /// A thread could not be written to the catalog
    PersistFailed { thread_id: String, error: String },

    /// A scheduled run ended with an error
    CycleFailed { job: &'static str, error: String },
}

impl HarvestEvent {
    /// Short machine-friendly name of the event kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FetchFailed { .. } => "fetch_failed",
            Self::ExtractionFailed { .. } => "extraction_failed",
            Self::TimestampFallback { .. } => "timestamp_fallback",
            Self::ReleaseRejected { .. } => "release_rejected",
            Self::PersistFailed { .. } => "persist_failed",
            Self::CycleFailed { .. } => "cycle_failed",
        }
    }
}

/// Receiver of harvest events
pub trait EventSink: Send + Sync {
    fn record(&self, event: HarvestEvent);
}

/// Emits events through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: HarvestEvent) {
        let kind = event.kind();
        match event {
            HarvestEvent::FetchFailed {
                url,
                attempts,
                error,
            } => {
                tracing::error!(event = kind, %url, attempts, %error, "fetch failed");
            }
            HarvestEvent::ExtractionFailed { url, reason } => {
                tracing::error!(event = kind, %url, %reason, "thread extraction failed");
            }
            HarvestEvent::TimestampFallback { url, raw } => {
                tracing::warn!(event = kind, %url, raw = ?raw, "post timestamp missing, using now");
            }
            HarvestEvent::ReleaseRejected { thread_id, reason } => {
                tracing::warn!(event = kind, %thread_id, %reason, "release dropped");
            }
            HarvestEvent::PersistFailed { thread_id, error } => {
                tracing::error!(event = kind, %thread_id, %error, "catalog write failed");
            }
            HarvestEvent::CycleFailed { job, error } => {
                tracing::error!(event = kind, job, %error, "scheduled run failed");
            }
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<HarvestEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events recorded so far
    pub fn events(&self) -> Vec<HarvestEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Number of recorded events of the given kind
    pub fn count(&self, kind: &str) -> usize {
        self.events().iter().filter(|e| e.kind() == kind).count()
    }
}

impl EventSink for CollectingSink {
    fn record(&self, event: HarvestEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

//! Harvest scheduling
//!
//! This module drives the whole pipeline:
//! - Startup: tracker refresh, new-page discovery, then revisit
//! - New-page discovery over the forum listing pages
//! - Revisits of known threads whose last processing is stale
//! - Bounded-concurrency batches of fetch, extract and save
//! - Three recurring timers until shutdown

use crate::catalog::{CatalogWriter, SaveOutcome};
use crate::config::Config;
use crate::crawler::discovery::{discover_threads, page_url};
use crate::crawler::extractor::extract_thread;
use crate::crawler::fetcher::{FetchPolicy, Fetcher};
use crate::events::{EventSink, HarvestEvent};
use crate::state::{needs_processing, CrawlState, ThreadStatus};
use crate::storage::{thread_key, Fields, Store, THREAD_PREFIX};
use crate::trackers::{fetch_trackers, TrackerList};
use crate::url::thread_id_from_url;
use crate::HarvestError;
use chrono::Utc;
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use url::Url;

/// What happened to one thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadOutcome {
    Saved(SaveOutcome),
    FetchFailed,
    ExtractionFailed,
    PersistFailed,
}

/// Summary of one discovery or revisit run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Listing pages that yielded threads
    pub pages: u32,
    /// Threads found on listing pages or in the store
    pub threads_seen: usize,
    /// Threads skipped because they were processed recently
    pub threads_skipped: usize,
    pub threads_saved: usize,
    pub threads_failed: usize,
    /// Set when another run held the crawl guard and nothing was done
    pub skipped_overlap: bool,
}

impl RunReport {
    fn tally(&mut self, outcomes: &[ThreadOutcome]) {
        for outcome in outcomes {
            match outcome {
                ThreadOutcome::Saved(_) => self.threads_saved += 1,
                _ => self.threads_failed += 1,
            }
        }
    }

    fn overlapping() -> Self {
        Self {
            skipped_overlap: true,
            ..Self::default()
        }
    }
}

/// Forum harvester
///
/// Owns the fetcher, the catalog writer and the scheduler-wide state: the
/// crawl guard, the last successful listing page and the cached tracker list.
pub struct Harvester {
    config: Config,
    base_url: Url,
    fetcher: Fetcher,
    writer: CatalogWriter,
    events: Arc<dyn EventSink>,
    state: CrawlState,
    trackers: RwLock<TrackerList>,
}

impl Harvester {
    /// Creates a harvester writing into `store`
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `store` - The catalog store
    /// * `events` - Where failure events are reported
    ///
    /// # Returns
    ///
    /// * `Ok(Harvester)` - Ready to run
    /// * `Err(HarvestError)` - Bad base URL or HTTP client setup failure
    pub fn new(
        config: Config,
        store: Arc<dyn Store>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self, HarvestError> {
        let base_url = Url::parse(&config.forum.base_url)?;
        let fetcher = Fetcher::new(FetchPolicy::from(&config.crawl), events.clone())?;
        let writer = CatalogWriter::new(store, events.clone())
            .with_group_threshold(config.matching.group_threshold);

        Ok(Self {
            config,
            base_url,
            fetcher,
            writer,
            events,
            state: CrawlState::new(),
            trackers: RwLock::new(TrackerList::empty()),
        })
    }

    pub fn state(&self) -> &CrawlState {
        &self.state
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        self.writer.store()
    }

    /// Snapshot of the cached tracker list
    pub async fn trackers(&self) -> TrackerList {
        self.trackers.read().await.clone()
    }

    fn revisit_threshold(&self) -> chrono::Duration {
        hours(self.config.crawl.revisit_threshold_hours)
    }

    /// Refreshes the tracker list if it is older than its refresh interval
    ///
    /// Returns whether a refresh happened. Nothing is fetched when no tracker
    /// URL is configured.
    pub async fn refresh_trackers(&self, force: bool) -> Result<bool, HarvestError> {
        let Some(raw_url) = &self.config.trackers.url else {
            return Ok(false);
        };

        let max_age = hours(self.config.trackers.refresh_interval_hours);
        {
            let cached = self.trackers.read().await;
            let now = Utc::now();
            if !force && !cached.is_stale(max_age, now) {
                debug!("Tracker list is {:?} old, not refreshing", cached.age(now));
                return Ok(false);
            }
        }

        let url = Url::parse(raw_url)?;
        let list = fetch_trackers(&self.fetcher, &url).await?;
        *self.trackers.write().await = list;
        Ok(true)
    }

    /// Runs the startup sequence: tracker refresh, discovery, revisit
    ///
    /// A failing step is recorded and the next one still runs.
    pub async fn startup(&self) -> RunReport {
        let refreshed = self.refresh_trackers(false).await;
        self.record_failure("trackers", refreshed);

        let mut report = RunReport::default();
        if let Some(discovered) = self
            .record_failure("discovery", self.discover(self.config.crawl.initial_pages).await)
        {
            report = discovered;
        }
        if let Some(revisited) = self.record_failure("revisit", self.revisit().await) {
            report.threads_seen += revisited.threads_seen;
            report.threads_skipped += revisited.threads_skipped;
            report.threads_saved += revisited.threads_saved;
            report.threads_failed += revisited.threads_failed;
            report.skipped_overlap |= revisited.skipped_overlap;
        }

        info!(
            "Startup harvest done: {} pages, {} threads saved, {} failed, {} fresh",
            report.pages, report.threads_saved, report.threads_failed, report.threads_skipped
        );
        report
    }

    /// Walks listing pages from page 1 and processes new or stale threads
    ///
    /// Stops at the first page yielding no threads, or after `max_pages`
    /// pages when it is non-zero. Only pages that yielded threads move the
    /// last successful page forward.
    pub async fn discover(&self, max_pages: u32) -> Result<RunReport, HarvestError> {
        let Some(_guard) = self.state.try_begin() else {
            info!("A crawl is already running, skipping discovery");
            return Ok(RunReport::overlapping());
        };

        let mut report = RunReport::default();
        let threshold = self.revisit_threshold();
        let mut page = 1u32;

        while max_pages == 0 || page <= max_pages {
            let url = page_url(&self.base_url, &self.config.forum.page_path, page)?;
            let html = self.fetcher.fetch(&url).await?;
            let threads = discover_threads(&html, &url);

            if threads.is_empty() {
                info!("Listing page {} has no threads, stopping discovery", page);
                break;
            }
            self.state.record_successful_page(page);
            report.pages += 1;
            report.threads_seen += threads.len();

            let now = Utc::now();
            let mut due = Vec::new();
            for thread_url in threads {
                let thread_id = thread_id_from_url(&thread_url);
                let record = self.read_thread_record(&thread_id);
                if needs_processing(record.as_ref(), threshold, now) {
                    due.push(thread_url);
                } else {
                    report.threads_skipped += 1;
                }
            }

            debug!("Page {}: {} threads due for processing", page, due.len());
            let outcomes = self.process_batches(due).await;
            report.tally(&outcomes);

            page = page.saturating_add(1);
        }

        info!(
            "Discovery finished: {} pages, {} threads saved, {} failed",
            report.pages, report.threads_saved, report.threads_failed
        );
        Ok(report)
    }

    /// Reprocesses every known thread whose last processing is stale
    ///
    /// Records without a readable `processedAt` are always reprocessed.
    pub async fn revisit(&self) -> Result<RunReport, HarvestError> {
        let Some(_guard) = self.state.try_begin() else {
            info!("A crawl is already running, skipping revisit");
            return Ok(RunReport::overlapping());
        };

        let mut report = RunReport::default();
        let threshold = self.revisit_threshold();
        let now = Utc::now();
        let mut due = Vec::new();

        for key in self.store().keys_with_prefix(THREAD_PREFIX)? {
            report.threads_seen += 1;
            let record = match self.store().get_record(&key) {
                Ok(record) => record,
                Err(e) => {
                    self.events.record(HarvestEvent::PersistFailed {
                        thread_id: key.trim_start_matches(THREAD_PREFIX).to_string(),
                        error: e.to_string(),
                    });
                    report.threads_failed += 1;
                    continue;
                }
            };
            let status = ThreadStatus::evaluate(record.as_ref(), threshold, now);
            if !status.needs_processing() {
                report.threads_skipped += 1;
                continue;
            }

            let source = record
                .as_ref()
                .and_then(|fields| fields.get("sourceUrl"))
                .and_then(|raw| Url::parse(raw).ok());
            match source {
                Some(url) => {
                    debug!("Revisiting {} ({})", key, status);
                    due.push(url);
                }
                None => {
                    warn!("Cannot revisit {}: no usable sourceUrl", key);
                    report.threads_failed += 1;
                }
            }
        }

        let outcomes = self.process_batches(due).await;
        report.tally(&outcomes);

        info!(
            "Revisit finished: {} known, {} saved, {} failed, {} fresh",
            report.threads_seen, report.threads_saved, report.threads_failed, report.threads_skipped
        );
        Ok(report)
    }

    /// Reads a thread record for the staleness check
    ///
    /// A failed read is recorded and treated as an unseen thread.
    fn read_thread_record(&self, thread_id: &str) -> Option<Fields> {
        match self.store().get_record(&thread_key(thread_id)) {
            Ok(record) => record,
            Err(e) => {
                self.events.record(HarvestEvent::PersistFailed {
                    thread_id: thread_id.to_string(),
                    error: e.to_string(),
                });
                None
            }
        }
    }

    /// Processes threads in batches of at most `max-concurrency`
    ///
    /// Each batch is awaited as a whole before the next one starts.
    async fn process_batches(&self, urls: Vec<Url>) -> Vec<ThreadOutcome> {
        let batch_size = self.config.crawl.max_concurrency.max(1);
        let mut outcomes = Vec::with_capacity(urls.len());

        for batch in urls.chunks(batch_size) {
            let results = join_all(batch.iter().map(|url| self.process_thread(url))).await;
            outcomes.extend(results);
        }
        outcomes
    }

    /// Fetches, extracts and saves a single thread
    ///
    /// Never fails: every failure is reported through the event sink and
    /// leaves the thread's `processedAt` untouched.
    pub async fn process_thread(&self, url: &Url) -> ThreadOutcome {
        let html = match self.fetcher.fetch(url).await {
            Ok(html) => html,
            Err(_) => return ThreadOutcome::FetchFailed,
        };

        let Some(thread) = extract_thread(&html, url, self.events.as_ref()) else {
            return ThreadOutcome::ExtractionFailed;
        };

        let trackers = self.trackers().await;
        match self.writer.save(&thread, &trackers, Utc::now()) {
            Ok(outcome) => {
                debug!(
                    "Thread {} -> {} ({} releases)",
                    thread.thread_id, outcome.group_id, outcome.releases_saved
                );
                ThreadOutcome::Saved(outcome)
            }
            Err(e) => {
                self.events.record(HarvestEvent::PersistFailed {
                    thread_id: thread.thread_id.clone(),
                    error: e.to_string(),
                });
                ThreadOutcome::PersistFailed
            }
        }
    }

    /// Runs startup, then the three recurring jobs until `shutdown` resolves
    ///
    /// Each tick spawns its job, so a slow discovery does not delay the
    /// revisit or tracker timers. Overlapping discovery and revisit runs are
    /// skipped by the crawl guard. Job failures are recorded and never stop
    /// the schedule.
    pub async fn run_forever<F>(self: Arc<Self>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        self.startup().await;

        let crawl = &self.config.crawl;
        let discovery_every = Duration::from_secs(crawl.new_page_interval_secs.max(1));
        let revisit_every = hours_period(crawl.revisit_interval_hours);
        let trackers_every = hours_period(self.config.trackers.refresh_interval_hours);

        let mut discovery = interval_at(first_tick(discovery_every), discovery_every);
        let mut revisit = interval_at(first_tick(revisit_every), revisit_every);
        let mut trackers = interval_at(first_tick(trackers_every), trackers_every);
        for timer in [&mut discovery, &mut revisit, &mut trackers] {
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        }

        info!(
            "Scheduled discovery every {:?}, revisit every {:?}, trackers every {:?}",
            discovery_every, revisit_every, trackers_every
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping schedule");
                    break;
                }
                _ = discovery.tick() => {
                    let harvester = Arc::clone(&self);
                    tokio::spawn(async move {
                        let pages = harvester.config.crawl.refresh_pages;
                        let result = harvester.discover(pages).await;
                        harvester.record_failure("discovery", result);
                    });
                }
                _ = revisit.tick() => {
                    let harvester = Arc::clone(&self);
                    tokio::spawn(async move {
                        let result = harvester.revisit().await;
                        harvester.record_failure("revisit", result);
                    });
                }
                _ = trackers.tick() => {
                    let harvester = Arc::clone(&self);
                    tokio::spawn(async move {
                        let result = harvester.refresh_trackers(false).await;
                        harvester.record_failure("trackers", result);
                    });
                }
            }
        }
    }

    fn record_failure<T>(&self, job: &'static str, result: Result<T, HarvestError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.events.record(HarvestEvent::CycleFailed {
                    job,
                    error: e.to_string(),
                });
                None
            }
        }
    }
}

/// Converts an hour count to a chrono duration, saturating at the largest
/// representable span
fn hours(count: u64) -> chrono::Duration {
    i64::try_from(count)
        .ok()
        .and_then(chrono::Duration::try_hours)
        .unwrap_or(chrono::Duration::MAX)
}

/// Timer period for an hour-valued interval, at least one hour
fn hours_period(count: u64) -> Duration {
    Duration::from_secs(count.max(1).checked_mul(3600).unwrap_or(u64::MAX))
}

/// First tick of a timer, one period from now or thirty years out
fn first_tick(period: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(period)
        .unwrap_or_else(|| now + Duration::from_secs(86400 * 365 * 30))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CrawlConfig, ForumConfig, MatchingConfig, StorageConfig, TrackerConfig};
    use crate::events::CollectingSink;
    use crate::storage::MemoryStore;

    fn config(base_url: &str) -> Config {
        Config {
            forum: ForumConfig {
                base_url: base_url.to_string(),
                page_path: "page/{page}/".to_string(),
            },
            crawl: CrawlConfig {
                request_delay_ms: 0,
                max_retries: 0,
                backoff_base_ms: 1,
                ..CrawlConfig::default()
            },
            trackers: TrackerConfig::default(),
            storage: StorageConfig {
                database_path: ":memory:".to_string(),
                purge_on_start: false,
            },
            matching: MatchingConfig::default(),
        }
    }

    fn harvester() -> (Harvester, Arc<CollectingSink>) {
        let sink = Arc::new(CollectingSink::new());
        let harvester = Harvester::new(
            config("https://forum.example/forums/forum/19-tv/"),
            Arc::new(MemoryStore::new()),
            sink.clone(),
        )
        .unwrap();
        (harvester, sink)
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let result = Harvester::new(
            config("not a url"),
            Arc::new(MemoryStore::new()),
            Arc::new(CollectingSink::new()),
        );
        assert!(matches!(result, Err(HarvestError::UrlParse(_))));
    }

    #[tokio::test]
    async fn test_runs_are_mutually_exclusive() {
        let (harvester, _) = harvester();
        let _guard = harvester.state().try_begin().unwrap();

        let report = harvester.discover(3).await.unwrap();
        assert!(report.skipped_overlap);
        let report = harvester.revisit().await.unwrap();
        assert!(report.skipped_overlap);
    }

    #[tokio::test]
    async fn test_tracker_refresh_without_url_is_noop() {
        let (harvester, _) = harvester();
        assert!(!harvester.refresh_trackers(true).await.unwrap());
        assert!(harvester.trackers().await.trackers.is_empty());
    }

    #[tokio::test]
    async fn test_revisit_of_empty_store() {
        let (harvester, sink) = harvester();
        let report = harvester.revisit().await.unwrap();
        assert_eq!(report, RunReport::default());
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn test_huge_threshold_leaves_recent_thread_fresh() {
        let mut config = config("https://forum.example/forums/forum/19-tv/");
        config.crawl.revisit_threshold_hours = u64::MAX / 2;
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let mut fields = Fields::new();
        fields.insert("processedAt".into(), Utc::now().to_rfc3339());
        fields.insert(
            "sourceUrl".into(),
            "https://forum.example/forums/topic/5-x/".into(),
        );
        store.put_record("thread:5", &fields).unwrap();

        let harvester =
            Harvester::new(config, store, Arc::new(CollectingSink::new())).unwrap();
        let report = harvester.revisit().await.unwrap();
        assert_eq!(report.threads_seen, 1);
        assert_eq!(report.threads_skipped, 1);
    }

    #[test]
    fn test_duration_conversions_saturate() {
        assert_eq!(hours(2), chrono::Duration::hours(2));
        assert_eq!(hours(u64::MAX), chrono::Duration::MAX);
        assert_eq!(hours_period(0), Duration::from_secs(3600));
        assert_eq!(hours_period(u64::MAX), Duration::from_secs(u64::MAX));
        assert!(first_tick(Duration::from_secs(u64::MAX)) > Instant::now());
    }

    #[test]
    fn test_report_tally() {
        let mut report = RunReport::default();
        report.tally(&[
            ThreadOutcome::FetchFailed,
            ThreadOutcome::ExtractionFailed,
            ThreadOutcome::Saved(SaveOutcome {
                group_id: "g".into(),
                group_created: true,
                title_updated: false,
                releases_saved: 1,
                releases_rejected: 0,
            }),
        ]);
        assert_eq!(report.threads_saved, 1);
        assert_eq!(report.threads_failed, 2);
    }
}

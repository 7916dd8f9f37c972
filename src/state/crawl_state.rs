//! Scheduler-wide crawl state

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// State shared by every run of one harvester
///
/// Holds the "crawl in progress" flag that keeps full discovery/revisit runs
/// from overlapping, and the highest listing page that last yielded threads.
#[derive(Debug, Default)]
pub struct CrawlState {
    running: AtomicBool,
    last_successful_page: AtomicU32,
}

/// Marks a run as in progress until dropped
#[derive(Debug)]
pub struct RunGuard<'a> {
    state: &'a CrawlState,
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the running flag
    ///
    /// Returns None if another run already holds it.
    pub fn try_begin(&self) -> Option<RunGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard { state: self })
    }

    /// Returns true if a run currently holds the flag
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// The highest listing page that yielded threads, 0 before any success
    pub fn last_successful_page(&self) -> u32 {
        self.last_successful_page.load(Ordering::Acquire)
    }

    /// Records a page that yielded threads
    ///
    /// The counter never moves backwards, so a shorter refresh walk keeps
    /// the deeper page found by an earlier run.
    pub fn record_successful_page(&self, page: u32) {
        self.last_successful_page.fetch_max(page, Ordering::AcqRel);
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.state.running.store(false, Ordering::Release);
    }
}

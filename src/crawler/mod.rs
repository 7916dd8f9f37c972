//! Crawler module for forum harvesting
//!
//! This module contains the core harvesting logic, including:
//! - HTTP fetching with retry logic
//! - Listing page discovery
//! - Thread page extraction
//! - Scheduling of discovery, revisit and tracker refresh runs

mod discovery;
mod extractor;
mod fetcher;
mod scheduler;

pub use discovery::{discover_threads, page_url};
pub use extractor::{extract_thread, sanitize_text, ExtractedRelease, ExtractedThread, NameSource};
pub use fetcher::{backoff_delay, build_http_client, FetchPolicy, Fetcher};
pub use scheduler::{Harvester, RunReport, ThreadOutcome};

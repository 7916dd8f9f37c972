//! Tracker list handling module
//!
//! This module provides functionality for fetching, parsing, and caching the
//! newline-delimited list of BitTorrent announce URLs that is attached to every
//! stored release.

mod cache;
mod parser;

pub use cache::TrackerList;
pub use parser::parse_tracker_list;

use crate::crawler::Fetcher;
use crate::FetchError;
use tracing::info;
use url::Url;

/// Fetches and parses the tracker list
///
/// # Arguments
///
/// * `fetcher` - The fetcher to use (retry and event reporting included)
/// * `url` - Where the tracker list is published
///
/// # Returns
///
/// * `Ok(TrackerList)` - The parsed list, stamped with the current time
/// * `Err(FetchError)` - The list could not be fetched
pub async fn fetch_trackers(fetcher: &Fetcher, url: &Url) -> Result<TrackerList, FetchError> {
    let body = fetcher.fetch(url).await?;
    let trackers = parse_tracker_list(&body);
    info!("Fetched {} trackers from {}", trackers.len(), url);
    Ok(TrackerList::new(trackers))
}

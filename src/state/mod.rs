//! State module for tracking harvest progress
//!
//! # Components
//!
//! - `ThreadStatus`: Where a known thread stands relative to the revisit threshold
//! - `CrawlState`: The "crawl in progress" guard and the last successful listing page

mod crawl_state;
mod thread_status;

pub use crawl_state::{CrawlState, RunGuard};
pub use thread_status::{needs_processing, ThreadStatus};

//! Catalog module
//!
//! This module maps harvested threads onto catalog records and reads them back:
//! - `ids`: deterministic group and stream ids
//! - `writer`: the idempotent persistence writer
//! - `search`: fuzzy free-text search over show groups
//! - `stats`: record counts

mod ids;
mod search;
pub mod stats;
mod writer;

pub use ids::{group_id, stream_id};
pub use search::{search, SearchHit};
pub use stats::{load_statistics, print_statistics, CatalogStatistics};
pub use writer::{CatalogWriter, SaveOutcome};

//! Statistics generation from the catalog store
//!
//! This module provides functionality for counting catalog records and
//! displaying them.

use crate::storage::{
    ShowGroup, Store, StorageResult, GROUP_PREFIX, RELEASE_PREFIX, THREAD_PREFIX,
};
use std::collections::BTreeMap;

/// Catalog statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogStatistics {
    /// Number of show groups
    pub groups: usize,

    /// Number of release records
    pub releases: usize,

    /// Number of processed threads
    pub threads: usize,

    /// Group count per language code
    pub groups_by_language: BTreeMap<String, usize>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `store` - The catalog store to query
///
/// # Returns
///
/// * `Ok(CatalogStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query the store
pub fn load_statistics(store: &dyn Store) -> StorageResult<CatalogStatistics> {
    let releases = store.count_with_prefix(RELEASE_PREFIX)?;
    let threads = store.count_with_prefix(THREAD_PREFIX)?;

    let mut groups = 0;
    let mut groups_by_language = BTreeMap::new();
    for key in store.keys_with_prefix(GROUP_PREFIX)? {
        groups += 1;
        let Some(fields) = store.get_record(&key)? else {
            continue;
        };
        // Unreadable groups still count, they just have no languages
        if let Ok(group) = ShowGroup::from_fields(&key, &fields) {
            for language in group.languages {
                *groups_by_language.entry(language).or_insert(0) += 1;
            }
        }
    }

    Ok(CatalogStatistics {
        groups,
        releases,
        threads,
        groups_by_language,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CatalogStatistics) {
    println!("=== Catalog Statistics ===\n");

    println!("Overview:");
    println!("  Show groups: {}", stats.groups);
    println!("  Releases: {}", stats.releases);
    println!("  Threads processed: {}", stats.threads);
    println!();

    if !stats.groups_by_language.is_empty() {
        println!("Groups by Language:");
        // Sort languages by count (descending)
        let mut language_counts: Vec<_> = stats.groups_by_language.iter().collect();
        language_counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        for (language, count) in language_counts {
            println!("  {}: {}", language, count);
        }
        println!();
    }

    let per_group = if stats.groups > 0 {
        stats.releases as f64 / stats.groups as f64
    } else {
        0.0
    };
    println!("Average releases per group: {:.1}", per_group);
}

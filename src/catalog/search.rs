//! Free-text search over show groups

use crate::storage::{ShowGroup, Store, StorageResult, GROUP_PREFIX};
use crate::title::{normalize, similarity};
use tracing::warn;

/// A group that matched a query
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub group: ShowGroup,
    pub score: f64,
}

/// Finds groups whose display title matches `query`
///
/// A group matches when the Jaro-Winkler similarity of the normalized titles
/// reaches `threshold`, or when the normalized title contains the normalized
/// query; substring matches score at least `threshold`. Hits are ordered by
/// score, best first, then by title.
///
/// # Arguments
///
/// * `store` - The catalog store
/// * `query` - Free text, e.g. `cooku with comali`
/// * `threshold` - Minimum similarity for a fuzzy match
pub fn search(store: &dyn Store, query: &str, threshold: f64) -> StorageResult<Vec<SearchHit>> {
    let needle = normalize(query);
    if needle.is_empty() {
        return Ok(Vec::new());
    }

    let mut hits = Vec::new();
    for key in store.keys_with_prefix(GROUP_PREFIX)? {
        let Some(fields) = store.get_record(&key)? else {
            continue;
        };
        let group = match ShowGroup::from_fields(&key, &fields) {
            Ok(group) => group,
            Err(e) => {
                warn!("Skipping unreadable group {}: {}", key, e);
                continue;
            }
        };

        let mut score = similarity(query, &group.display_title);
        if normalize(&group.display_title).contains(&needle) {
            score = score.max(threshold);
        }
        if score > 0.0 && score >= threshold {
            hits.push(SearchHit { group, score });
        }
    }

    hits.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.group.display_title.cmp(&b.group.display_title))
    });
    Ok(hits)
}

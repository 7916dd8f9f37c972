//! Persistence writer
//!
//! Maps an extracted thread and its releases onto the `group:`, `release:` and
//! `thread:` records. Saving the same thread twice leaves the catalog in the
//! same state apart from timestamps.

use crate::catalog::ids::{group_id, stream_id};
use crate::crawler::{ExtractedRelease, ExtractedThread, NameSource};
use crate::events::{EventSink, HarvestEvent};
use crate::storage::{group_key, ReleaseRecord, ReleaseThread, ShowGroup, Store, StorageResult};
use crate::title::{parse_title, similar, ParsedTitle, GROUP_THRESHOLD};
use crate::trackers::TrackerList;
use crate::url::{announce_urls, extract_info_hash};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// What a single save did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub group_id: String,
    /// The group did not exist before this save
    pub group_created: bool,
    /// The stored display title was replaced
    pub title_updated: bool,
    pub releases_saved: usize,
    pub releases_rejected: usize,
}

/// Writes harvested threads into a catalog store
pub struct CatalogWriter {
    store: Arc<dyn Store>,
    events: Arc<dyn EventSink>,
    group_threshold: f64,
}

impl CatalogWriter {
    pub fn new(store: Arc<dyn Store>, events: Arc<dyn EventSink>) -> Self {
        Self {
            store,
            events,
            group_threshold: GROUP_THRESHOLD,
        }
    }

    /// Sets the similarity required before a stored group title is replaced
    pub fn with_group_threshold(mut self, threshold: f64) -> Self {
        self.group_threshold = threshold;
        self
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Saves a thread, its group and its releases
    ///
    /// Releases are written before the group, and the thread record, which
    /// carries `processedAt`, is written last, so a failure part-way leaves the
    /// thread due for another visit.
    pub fn save(
        &self,
        thread: &ExtractedThread,
        trackers: &TrackerList,
        now: DateTime<Utc>,
    ) -> StorageResult<SaveOutcome> {
        let parsed = parse_title(&thread.title);
        let group_id = group_id(&parsed, &thread.thread_id);
        let catalog_title = parsed.catalog_title();

        let mut releases = Vec::with_capacity(thread.releases.len());
        let mut releases_rejected = 0;
        for release in &thread.releases {
            match self.build_release(release, &parsed, &group_id, &thread.thread_id, trackers, now) {
                Some(record) => releases.push(record),
                None => releases_rejected += 1,
            }
        }

        let existing = self.load_group(&group_id)?;
        let group_created = existing.is_none();

        let mut languages = parsed.languages.clone();
        let mut seasons = BTreeSet::from([parsed.season]);
        for release in &releases {
            languages.extend(release.languages.iter().cloned());
            seasons.insert(release.season_number);
        }

        let (display_title, title_updated, poster_url) = match &existing {
            None => (catalog_title.clone(), false, thread.poster_url.clone()),
            Some(group) => {
                languages.extend(group.languages.iter().cloned());
                seasons.extend(group.seasons.iter().copied());

                let replace = group.display_title != catalog_title
                    && similar(&group.display_title, &catalog_title, self.group_threshold);
                let title = if replace {
                    catalog_title.clone()
                } else {
                    group.display_title.clone()
                };
                let poster = if is_placeholder(&group.poster_url) || group.poster_url.is_empty() {
                    thread.poster_url.clone()
                } else {
                    group.poster_url.clone()
                };
                (title, replace, poster)
            }
        };

        for release in &releases {
            let mut fields = release.to_fields()?;
            let key = release.key();
            if let Some(stored) = self.store.get_record(&key)? {
                // First sighting wins
                if stored.contains_key("discoveredAt") {
                    fields.remove("discoveredAt");
                }
            }
            self.store.put_record(&key, &fields)?;
        }

        let group = ShowGroup {
            group_id: group_id.clone(),
            display_title,
            poster_url,
            languages,
            seasons,
            last_updated: now,
            source_thread_id: thread.thread_id.clone(),
        };
        self.store.put_record(&group.key(), &group.to_fields()?)?;

        let record = ReleaseThread {
            thread_id: thread.thread_id.clone(),
            raw_title: thread.title.clone(),
            poster_url: thread.poster_url.clone(),
            posted_at: thread.posted_at,
            processed_at: now,
            source_url: thread.url.to_string(),
            group_id: Some(group_id.clone()),
        };
        self.store.put_record(&record.key(), &record.to_fields())?;

        debug!(
            "Saved thread {} into {} ({} releases, {} rejected)",
            thread.thread_id,
            group_id,
            releases.len(),
            releases_rejected
        );

        Ok(SaveOutcome {
            group_id,
            group_created,
            title_updated,
            releases_saved: releases.len(),
            releases_rejected,
        })
    }

    /// Loads a stored group, treating an unreadable record as absent
    fn load_group(&self, group_id: &str) -> StorageResult<Option<ShowGroup>> {
        let key = group_key(group_id);
        let Some(fields) = self.store.get_record(&key)? else {
            return Ok(None);
        };

        match ShowGroup::from_fields(&key, &fields) {
            Ok(group) => Ok(Some(group)),
            Err(e) => {
                warn!("Overwriting unreadable group record {}: {}", key, e);
                Ok(None)
            }
        }
    }

    /// Builds the record for one release, or None if it has no valid hash
    fn build_release(
        &self,
        release: &ExtractedRelease,
        thread_parsed: &ParsedTitle,
        group_id: &str,
        thread_id: &str,
        trackers: &TrackerList,
        now: DateTime<Utc>,
    ) -> Option<ReleaseRecord> {
        let Some(info_hash) = extract_info_hash(&release.magnet_uri) else {
            self.events.record(HarvestEvent::ReleaseRejected {
                thread_id: thread_id.to_string(),
                reason: format!("no valid info hash in {}", release.magnet_uri),
            });
            return None;
        };

        let own = match release.name_source {
            NameSource::Placeholder => thread_parsed.clone(),
            _ => parse_title(&release.name),
        };
        let meta = ReleaseMeta::resolve(&own, thread_parsed);

        Some(ReleaseRecord {
            stream_id: stream_id(
                group_id,
                meta.season,
                meta.episode_start,
                meta.resolution.as_deref(),
                &info_hash,
            ),
            parent_group_id: group_id.to_string(),
            info_hash,
            magnet_uri: release.magnet_uri.clone(),
            display_name: release.name.clone(),
            display_title: meta.display_title,
            size: own.sizes.iter().next().cloned(),
            resolution: meta.resolution,
            languages: meta.languages,
            codecs: own.codecs.clone(),
            audio_codecs: own.audio_codecs.clone(),
            has_subtitles: own.has_subtitles || thread_parsed.has_subtitles,
            season_number: meta.season,
            episode_number: meta.episode_start,
            episode_end: meta.episode_end,
            trackers: trackers.merged_with(&announce_urls(&release.magnet_uri)),
            discovered_at: now,
        })
    }
}

/// Release metadata, filled in from the thread title where the release name is silent
struct ReleaseMeta {
    season: u32,
    episode_start: Option<u32>,
    episode_end: Option<u32>,
    resolution: Option<String>,
    languages: BTreeSet<String>,
    display_title: String,
}

impl ReleaseMeta {
    fn resolve(own: &ParsedTitle, thread: &ParsedTitle) -> Self {
        // A name without episode info and with the default season says nothing
        // about placement, so the thread title decides
        let own_has_placement = own.episode_start.is_some() || own.season != 1;
        let (season, episode_start, episode_end) = if own_has_placement {
            (own.season, own.episode_start, own.episode_end)
        } else {
            (thread.season, thread.episode_start, thread.episode_end)
        };

        let resolution = own.resolution_tag().or_else(|| {
            if thread.resolutions.len() == 1 {
                thread.resolution_tag()
            } else {
                None
            }
        });

        let languages = if own.languages.is_empty() {
            thread.languages.clone()
        } else {
            own.languages.clone()
        };

        let display_title = if own.used_fallback {
            thread.canonical_display_title.clone()
        } else {
            own.canonical_display_title.clone()
        };

        Self {
            season,
            episode_start,
            episode_end,
            resolution,
            languages,
            display_title,
        }
    }
}

fn is_placeholder(poster_url: &str) -> bool {
    poster_url.starts_with("placeholder:")
}

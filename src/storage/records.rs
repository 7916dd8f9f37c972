//! Typed catalog records
//!
//! Three record kinds live in the store, each under its own key prefix:
//! - `group:{groupId}` for [`ShowGroup`]
//! - `release:{streamId}` for [`ReleaseRecord`]
//! - `thread:{threadId}` for [`ReleaseThread`]
//!
//! Set-valued fields are stored as JSON arrays and timestamps as RFC 3339.

use crate::storage::traits::{Fields, StorageError, StorageResult};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeSet;

pub const GROUP_PREFIX: &str = "group:";
pub const RELEASE_PREFIX: &str = "release:";
pub const THREAD_PREFIX: &str = "thread:";

/// A show+season catalog entry aggregating one or more threads
#[derive(Debug, Clone, PartialEq)]
pub struct ShowGroup {
    pub group_id: String,
    pub display_title: String,
    pub poster_url: String,
    pub languages: BTreeSet<String>,
    pub seasons: BTreeSet<u32>,
    pub last_updated: DateTime<Utc>,
    /// The most recent contributing thread
    pub source_thread_id: String,
}

/// One downloadable release (one magnet link) belonging to a [`ShowGroup`]
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseRecord {
    pub stream_id: String,
    pub parent_group_id: String,
    pub info_hash: String,
    pub magnet_uri: String,
    pub display_name: String,
    pub display_title: String,
    pub size: Option<String>,
    pub resolution: Option<String>,
    pub languages: BTreeSet<String>,
    pub codecs: BTreeSet<String>,
    pub audio_codecs: BTreeSet<String>,
    pub has_subtitles: bool,
    pub season_number: u32,
    pub episode_number: Option<u32>,
    pub episode_end: Option<u32>,
    pub trackers: Vec<String>,
    pub discovered_at: DateTime<Utc>,
}

/// A processed forum thread
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseThread {
    pub thread_id: String,
    pub raw_title: String,
    pub poster_url: String,
    pub posted_at: DateTime<Utc>,
    pub processed_at: DateTime<Utc>,
    pub source_url: String,
    /// The group this thread contributed to
    pub group_id: Option<String>,
}

impl ShowGroup {
    pub fn key(&self) -> String {
        group_key(&self.group_id)
    }

    pub fn to_fields(&self) -> StorageResult<Fields> {
        let mut fields = Fields::new();
        fields.insert("groupId".into(), self.group_id.clone());
        fields.insert("displayTitle".into(), self.display_title.clone());
        fields.insert("posterUrl".into(), self.poster_url.clone());
        fields.insert("languages".into(), encode_set(&self.languages)?);
        fields.insert("seasons".into(), encode_set(&self.seasons)?);
        fields.insert("lastUpdated".into(), self.last_updated.to_rfc3339());
        fields.insert("sourceThreadId".into(), self.source_thread_id.clone());
        Ok(fields)
    }

    pub fn from_fields(key: &str, fields: &Fields) -> StorageResult<Self> {
        let reader = FieldReader { key, fields };
        Ok(Self {
            group_id: reader.required("groupId")?,
            display_title: reader.required("displayTitle")?,
            poster_url: reader.optional("posterUrl").unwrap_or_default(),
            languages: reader.set("languages")?,
            seasons: reader.set("seasons")?,
            last_updated: reader.timestamp("lastUpdated")?,
            source_thread_id: reader.optional("sourceThreadId").unwrap_or_default(),
        })
    }
}

impl ReleaseRecord {
    pub fn key(&self) -> String {
        release_key(&self.stream_id)
    }

    pub fn to_fields(&self) -> StorageResult<Fields> {
        let mut fields = Fields::new();
        fields.insert("streamId".into(), self.stream_id.clone());
        fields.insert("parentGroupId".into(), self.parent_group_id.clone());
        fields.insert("infoHash".into(), self.info_hash.clone());
        fields.insert("magnetUri".into(), self.magnet_uri.clone());
        fields.insert("displayName".into(), self.display_name.clone());
        fields.insert("displayTitle".into(), self.display_title.clone());
        if let Some(size) = &self.size {
            fields.insert("size".into(), size.clone());
        }
        if let Some(resolution) = &self.resolution {
            fields.insert("resolution".into(), resolution.clone());
        }
        fields.insert("languages".into(), encode_set(&self.languages)?);
        fields.insert("codecs".into(), encode_set(&self.codecs)?);
        fields.insert("audioCodecs".into(), encode_set(&self.audio_codecs)?);
        fields.insert("hasSubtitles".into(), self.has_subtitles.to_string());
        fields.insert("seasonNumber".into(), self.season_number.to_string());
        if let Some(episode) = self.episode_number {
            fields.insert("episodeNumber".into(), episode.to_string());
        }
        if let Some(end) = self.episode_end {
            fields.insert("episodeEnd".into(), end.to_string());
        }
        fields.insert("trackers".into(), serde_json::to_string(&self.trackers)?);
        fields.insert("discoveredAt".into(), self.discovered_at.to_rfc3339());
        Ok(fields)
    }

    pub fn from_fields(key: &str, fields: &Fields) -> StorageResult<Self> {
        let reader = FieldReader { key, fields };
        let info_hash = reader.required("infoHash")?;
        if info_hash.len() != 40 || !info_hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(reader.malformed("infoHash is not 40 hex characters"));
        }

        Ok(Self {
            stream_id: reader.required("streamId")?,
            parent_group_id: reader.required("parentGroupId")?,
            info_hash,
            magnet_uri: reader.optional("magnetUri").unwrap_or_default(),
            display_name: reader.optional("displayName").unwrap_or_default(),
            display_title: reader.optional("displayTitle").unwrap_or_default(),
            size: reader.optional("size"),
            resolution: reader.optional("resolution"),
            languages: reader.set("languages")?,
            codecs: reader.set("codecs")?,
            audio_codecs: reader.set("audioCodecs")?,
            has_subtitles: reader.optional("hasSubtitles").as_deref() == Some("true"),
            season_number: reader.number("seasonNumber")?.unwrap_or(1),
            episode_number: reader.number("episodeNumber")?,
            episode_end: reader.number("episodeEnd")?,
            trackers: reader.json("trackers")?.unwrap_or_default(),
            discovered_at: reader.timestamp("discoveredAt")?,
        })
    }
}

impl ReleaseThread {
    pub fn key(&self) -> String {
        thread_key(&self.thread_id)
    }

    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("threadId".into(), self.thread_id.clone());
        fields.insert("rawTitle".into(), self.raw_title.clone());
        fields.insert("posterUrl".into(), self.poster_url.clone());
        fields.insert("postedAt".into(), self.posted_at.to_rfc3339());
        fields.insert("processedAt".into(), self.processed_at.to_rfc3339());
        fields.insert("sourceUrl".into(), self.source_url.clone());
        if let Some(group_id) = &self.group_id {
            fields.insert("groupId".into(), group_id.clone());
        }
        fields
    }

    pub fn from_fields(key: &str, fields: &Fields) -> StorageResult<Self> {
        let reader = FieldReader { key, fields };
        Ok(Self {
            thread_id: reader.required("threadId")?,
            raw_title: reader.optional("rawTitle").unwrap_or_default(),
            poster_url: reader.optional("posterUrl").unwrap_or_default(),
            posted_at: reader.timestamp("postedAt")?,
            processed_at: reader.timestamp("processedAt")?,
            source_url: reader.required("sourceUrl")?,
            group_id: reader.optional("groupId"),
        })
    }
}

pub fn group_key(group_id: &str) -> String {
    format!("{GROUP_PREFIX}{group_id}")
}

pub fn release_key(stream_id: &str) -> String {
    format!("{RELEASE_PREFIX}{stream_id}")
}

pub fn thread_key(thread_id: &str) -> String {
    format!("{THREAD_PREFIX}{thread_id}")
}

/// Encodes a set as a JSON array
pub fn encode_set<T: Serialize>(set: &BTreeSet<T>) -> StorageResult<String> {
    Ok(serde_json::to_string(set)?)
}

/// Parses an RFC 3339 timestamp
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

struct FieldReader<'a> {
    key: &'a str,
    fields: &'a Fields,
}

impl FieldReader<'_> {
    fn malformed(&self, reason: impl Into<String>) -> StorageError {
        StorageError::MalformedRecord {
            key: self.key.to_string(),
            reason: reason.into(),
        }
    }

    fn optional(&self, name: &str) -> Option<String> {
        self.fields.get(name).cloned()
    }

    fn required(&self, name: &str) -> StorageResult<String> {
        self.optional(name)
            .ok_or_else(|| self.malformed(format!("missing field {name}")))
    }

    fn timestamp(&self, name: &str) -> StorageResult<DateTime<Utc>> {
        let raw = self.required(name)?;
        parse_timestamp(&raw).ok_or_else(|| self.malformed(format!("bad timestamp in {name}: {raw}")))
    }

    fn number(&self, name: &str) -> StorageResult<Option<u32>> {
        match self.fields.get(name) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| self.malformed(format!("bad number in {name}: {raw}"))),
        }
    }

    fn json<T: DeserializeOwned>(&self, name: &str) -> StorageResult<Option<T>> {
        match self.fields.get(name) {
            None => Ok(None),
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
        }
    }

    fn set<T: DeserializeOwned + Ord>(&self, name: &str) -> StorageResult<BTreeSet<T>> {
        Ok(self.json(name)?.unwrap_or_default())
    }
}

//! Release title parsing
//!
//! This module turns free-text release titles into structured metadata:
//! - `extract`: the ordered extraction steps, each returning its residue
//! - `language`: language name/abbreviation table
//! - `normalize`: normalization used for matching and ids
//! - `matcher`: Jaro-Winkler similarity over normalized titles

pub mod extract;
mod language;
mod matcher;
mod normalize;

pub use matcher::{similar, similarity, DEFAULT_THRESHOLD, GROUP_THRESHOLD};
pub use normalize::{normalize, normalize_id};

use std::collections::BTreeSet;

/// Structured metadata recovered from a release title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTitle {
    /// The show name left after every metadata token was removed
    pub base_show_name: String,
    pub year: Option<u16>,
    /// Season number; 1 when the title names none
    pub season: u32,
    pub episode_start: Option<u32>,
    /// Equal to `episode_start` for single-episode releases
    pub episode_end: Option<u32>,
    /// ISO-639-1-like codes
    pub languages: BTreeSet<String>,
    pub resolutions: BTreeSet<String>,
    pub codecs: BTreeSet<String>,
    pub audio_codecs: BTreeSet<String>,
    pub quality_tags: BTreeSet<String>,
    pub sizes: BTreeSet<String>,
    pub has_subtitles: bool,
    pub canonical_display_title: String,
    /// Set when the pipeline erased the show name and the raw title was used
    pub used_fallback: bool,
}

impl ParsedTitle {
    /// Title identifying the show and season, without episode information
    ///
    /// This is the text catalog group ids are derived from.
    pub fn catalog_title(&self) -> String {
        if self.used_fallback {
            return self.base_show_name.clone();
        }
        let mut title = self.base_show_name.clone();
        if let Some(year) = self.year {
            title.push_str(&format!(" ({})", year));
        }
        title.push_str(&format!(" S{:02}", self.season));
        title
    }

    /// The highest resolution found, e.g. `1080p` or `4K`
    pub fn resolution_tag(&self) -> Option<String> {
        let numeric = self
            .resolutions
            .iter()
            .filter_map(|r| r.trim_end_matches('p').parse::<u32>().ok().map(|n| (n, r)))
            .max_by_key(|(n, _)| *n)
            .map(|(_, r)| r.clone());

        numeric.or_else(|| {
            ["4K", "HD", "HQ"]
                .iter()
                .find(|tag| self.resolutions.contains(**tag))
                .map(|tag| tag.to_string())
        })
    }
}

/// Parses a release title
///
/// The extraction order is fixed: year, season/episode, resolution, quality
/// tag, video codec, audio codec, language, size, subtitle flag, residual
/// cleanup. Each step only sees what the previous steps left behind. Never
/// fails; if stripping erases the show name, a lightly cleaned copy of the
/// input is used as both the show name and the display title.
///
/// # Example
///
/// ```
/// use sumi_harvest::title::parse_title;
///
/// let parsed = parse_title("Cooku With Comali (2025) S06E01 [Tamil - 1080p - x264 - AAC - 7GB]");
/// assert_eq!(parsed.base_show_name, "Cooku With Comali");
/// assert_eq!(parsed.season, 6);
/// assert_eq!(parsed.canonical_display_title, "Cooku With Comali (2025) S06 EP01");
/// ```
pub fn parse_title(raw: &str) -> ParsedTitle {
    let (year, rest) = extract::extract_year(raw);
    let (span, rest) = extract::extract_season_episode(&rest);
    let (resolutions, rest) = extract::extract_resolutions(&rest);
    let (quality_tags, rest) = extract::extract_quality_tags(&rest);
    let (codecs, rest) = extract::extract_codecs(&rest);
    let (audio_codecs, rest) = extract::extract_audio_codecs(&rest);
    let (languages, rest) = extract::extract_languages(&rest);
    let (sizes, rest) = extract::extract_sizes(&rest);
    let (has_subtitles, rest) = extract::extract_subtitle_flag(&rest);
    let residue = extract::clean_residue(&rest);

    let season = span.season.unwrap_or(1);
    let episode_start = span.start;
    let episode_end = span.end.or(span.start);

    let (base_show_name, canonical_display_title, used_fallback) =
        if extract::is_metadata_only(&residue) {
            let fallback = extract::fallback_title(raw);
            (fallback.clone(), fallback, true)
        } else {
            let display = display_title(&residue, year, season, episode_start, episode_end);
            (residue, display, false)
        };

    ParsedTitle {
        base_show_name,
        year,
        season,
        episode_start,
        episode_end,
        languages,
        resolutions,
        codecs,
        audio_codecs,
        quality_tags,
        sizes,
        has_subtitles,
        canonical_display_title,
        used_fallback,
    }
}

fn display_title(
    base: &str,
    year: Option<u16>,
    season: u32,
    start: Option<u32>,
    end: Option<u32>,
) -> String {
    let mut title = base.to_string();
    if let Some(year) = year {
        title.push_str(&format!(" ({})", year));
    }
    title.push_str(&format!(" S{:02}", season));
    match (start, end) {
        (Some(start), Some(end)) if end > start => {
            title.push_str(&format!(" EP({:02}-{:02})", start, end));
        }
        (Some(start), _) => title.push_str(&format!(" EP{:02}", start)),
        _ => {}
    }
    title
}

//! Individual title extraction steps
//!
//! Every step takes the text left over by the previous step and returns what it
//! found together with a new residue in which the matched spans are replaced by
//! a single space. Steps never fail; a step that finds nothing returns the input
//! unchanged.

use crate::title::language;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::BTreeSet;
use std::ops::Range;

/// What a step extracted, plus the residual text for the next step
pub type Step<T> = (T, String);

fn pattern(source: &str) -> Regex {
    Regex::new(source).expect("title pattern must compile")
}

static YEAR: Lazy<Regex> = Lazy::new(|| pattern(r"(?:\(\s*)?\b((?:19|20)\d{2})\b(?:\s*\))?"));

static SEASON_EPISODE: Lazy<Regex> = Lazy::new(|| {
    pattern(
        r"(?i)\bS(?:eason)?\s*(\d{1,2})\s*[-_.]?\s*(?:Episodes?|EP|E)\s*\(?\s*(\d{1,4})(?:\s*(?:-|~|to)\s*(?:EP|E)?\s*(\d{1,4})\b)?\s*\)?",
    )
});

// Short form only as `S02`/`s02`, so "Ocean's 11" is not read as a season
static SEASON_ONLY: Lazy<Regex> =
    Lazy::new(|| pattern(r"\b(?:(?i:season)\s*|[Ss])(\d{1,2})\b"));

static EPISODE_ONLY: Lazy<Regex> = Lazy::new(|| {
    pattern(
        r"(?i)\b(?:Episodes?|EP|E)\s*\(?\s*(\d{1,4})(?:\s*(?:-|~|to)\s*(?:EP|E)?\s*(\d{1,4}))?\b\s*\)?",
    )
});

static SEASON_PACK: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)\b(?:complete\s+series|complete\s+season|season\s+pack|complete)\b")
});

static RESOLUTION: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)\b(?:\d{3,4}p|4k|uhd|hd|hq)\b"));

static QUALITY: Lazy<Regex> = Lazy::new(|| {
    pattern(
        r"(?i)\b(?:true\s*web-?dl|web-?dl|web-?rip|hd-?rip|blu-?ray|br-?rip|bd-?rip|dvd-?rip|dvd-?scr|hdtv|hd-?cam|cam-?rip|pre-?dvd|tv-?rip|pdtv|hdts|hd-?tc)\b",
    )
});

static CODEC: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?i)\b(?:x\.?264|x\.?265|h\.?264|h\.?265|hevc|avc|vp9|av1)\b"));

static AUDIO: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)\b(?:ddp?\+?\s?5\.1|e?ac3|aac(?:\s?2\.0)?|dts|opus|mp3|atmos|5\.1)\b")
});

static BRACKET_GROUP: Lazy<Regex> = Lazy::new(|| pattern(r"[\[(]([^\[\]()]*)[\])]"));

static WORD: Lazy<Regex> = Lazy::new(|| pattern(r"\b[A-Za-z]+\b"));

static LIST_SEGMENT_BREAK: Lazy<Regex> = Lazy::new(|| pattern(r"\s+[-|]\s+|\|"));

static SIZE: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?i)\b(\d+(?:\.\d+)?)\s?(KB|MB|GB|TB)\b"));

static SUBTITLES: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?i)\b(?:e-?subs?|subtitles?|subs)\b"));

static WWW_WATERMARK: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)\bwww\.[^\s\]\)]+"));

static FILE_EXTENSION: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?i)\.(?:mkv|mp4|avi|m4v|webm|mov|wmv|ts|torrent)\b"));

static DOMAIN_WATERMARK: Lazy<Regex> = Lazy::new(|| {
    pattern(
        r"\b[A-Za-z0-9-]+\.(?:com|net|org|xyz|info|cc|ws|lol|bid|pw|vip|click|site|online|fun|live|art)\b",
    )
});

static NUMBERED_DOMAIN_WATERMARK: Lazy<Regex> = Lazy::new(|| {
    pattern(r"\b[A-Za-z0-9-]*\d[A-Za-z0-9-]*\.(?:in|to|me|co|io|tv|mx|nz|se|li|re|rs|st|sh|bz|la|pm)\b")
});

static SQUARE_GROUP: Lazy<Regex> = Lazy::new(|| pattern(r"\[[^\]]*\]|\{[^}]*\}"));

static TRAILING_PAREN: Lazy<Regex> = Lazy::new(|| pattern(r"\s*\([^()]*\)\s*$"));

static EMPTY_PAREN: Lazy<Regex> = Lazy::new(|| pattern(r"\([^\p{L}\p{N}()]*\)"));

static DOT_UNDERSCORE: Lazy<Regex> = Lazy::new(|| pattern(r"[._]+"));

static JUNK_TOKENS: Lazy<Regex> = Lazy::new(|| {
    pattern(
        r"(?i)\b(?:org|orig|aud|audio|audios|dual|multi|dubbed|untouched|proper|repack|combined|\d+\s?kbps|\d+\s?bit)\b",
    )
});

static STRAY_PUNCTUATION: Lazy<Regex> = Lazy::new(|| pattern(r"[^\p{L}\p{N}\s'&!:\-]"));

static ANY_GROUP: Lazy<Regex> = Lazy::new(|| pattern(r"\[[^\]]*\]|\([^)]*\)|\{[^}]*\}"));

static METADATA_ONLY: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)^(?:(?:19|20)\d{2}|s\d{1,2}|e\d{1,4}|ep\d{1,4}|season|episode|part|[\s()\[\]\-])*$")
});

/// Season and episode numbers found in a title
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EpisodeSpan {
    pub season: Option<u32>,
    pub start: Option<u32>,
    pub end: Option<u32>,
}

/// Replaces `range` in `text` with a single space
fn cut(text: &str, range: Range<usize>) -> String {
    let mut out = String::with_capacity(text.len());
    out.push_str(&text[..range.start]);
    out.push(' ');
    out.push_str(&text[range.end..]);
    out
}

/// First match of `re` with its numeric groups parsed
fn first_numbers(re: &Regex, text: &str) -> Option<(Vec<Option<u32>>, Range<usize>)> {
    re.captures(text).and_then(|caps| {
        let whole = caps.get(0)?.range();
        let numbers = (1..caps.len())
            .map(|i| caps.get(i).and_then(|m| m.as_str().parse().ok()))
            .collect();
        Some((numbers, whole))
    })
}

/// Strips every match `accept` maps to a canonical value
fn take_all<F>(re: &Regex, text: &str, mut accept: F) -> Step<BTreeSet<String>>
where
    F: FnMut(&str, &str) -> Option<String>,
{
    let mut found = BTreeSet::new();
    let mut rest = String::with_capacity(text.len());
    let mut last = 0;

    for m in re.find_iter(text) {
        if let Some(value) = accept(m.as_str(), &text[m.end()..]) {
            found.insert(value);
            rest.push_str(&text[last..m.start()]);
            rest.push(' ');
            last = m.end();
        }
    }
    rest.push_str(&text[last..]);

    (found, rest)
}

fn squash(token: &str) -> String {
    token
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '+')
        .collect::<String>()
        .to_lowercase()
}

/// Step 1: first four-digit year, optionally parenthesized
pub fn extract_year(text: &str) -> Step<Option<u16>> {
    match first_numbers(&YEAR, text) {
        Some((numbers, range)) => {
            let year = numbers.first().copied().flatten().map(|y| y as u16);
            (year, cut(text, range))
        }
        None => (None, text.to_string()),
    }
}

/// Step 2: season, episode and episode ranges, plus season-pack markers
pub fn extract_season_episode(text: &str) -> Step<EpisodeSpan> {
    let mut span = EpisodeSpan::default();
    let mut rest = text.to_string();

    if let Some((numbers, range)) = first_numbers(&SEASON_EPISODE, &rest) {
        span.season = numbers[0];
        span.start = numbers[1];
        span.end = numbers[2];
        rest = cut(&rest, range);
    } else {
        if let Some((numbers, range)) = first_numbers(&SEASON_ONLY, &rest) {
            span.season = numbers[0];
            rest = cut(&rest, range);
        }
        if let Some((numbers, range)) = first_numbers(&EPISODE_ONLY, &rest) {
            span.start = numbers[0];
            span.end = numbers[1];
            rest = cut(&rest, range);
        }
    }

    if let Some(range) = SEASON_PACK.find(&rest).map(|m| m.range()) {
        rest = cut(&rest, range);
        if span.season.is_none() && span.start.is_none() {
            span.season = Some(1);
            span.start = Some(1);
        }
    }

    // A range running backwards, or absurdly long, is some other number
    if let (Some(start), Some(end)) = (span.start, span.end) {
        if end < start || end - start > 999 {
            span.end = None;
        }
    }

    (span, rest)
}

/// Step 3: resolutions such as `1080p`, `4K`, `HD`
pub fn extract_resolutions(text: &str) -> Step<BTreeSet<String>> {
    take_all(&RESOLUTION, text, |token, after| {
        let lowered = token.to_lowercase();
        match lowered.as_str() {
            // "HD-Rip" and friends belong to the quality step
            "hd" | "hq" if after.starts_with('-') => None,
            "4k" | "uhd" => Some("4K".to_string()),
            "hd" | "hq" => Some(lowered.to_uppercase()),
            _ => Some(lowered),
        }
    })
}

/// Step 4: distribution-source tags
pub fn extract_quality_tags(text: &str) -> Step<BTreeSet<String>> {
    take_all(&QUALITY, text, |token, _| {
        let tag = match squash(token).as_str() {
            "truewebdl" => "TRUE WEB-DL",
            "webdl" => "WEB-DL",
            "webrip" => "WEBRip",
            "hdrip" => "HDRip",
            "bluray" => "BluRay",
            "brrip" => "BRRip",
            "bdrip" => "BDRip",
            "dvdrip" => "DVDRip",
            "dvdscr" => "DVDScr",
            "hdtv" => "HDTV",
            "hdcam" => "HDCAM",
            "camrip" => "CAMRip",
            "predvd" => "PreDVD",
            "tvrip" => "TVRip",
            "pdtv" => "PDTV",
            "hdts" => "HDTS",
            "hdtc" => "HDTC",
            _ => return Some(token.to_uppercase()),
        };
        Some(tag.to_string())
    })
}

/// Step 5: video codecs
pub fn extract_codecs(text: &str) -> Step<BTreeSet<String>> {
    take_all(&CODEC, text, |token, _| {
        let codec = match squash(token).replace('.', "").as_str() {
            "x264" => "x264",
            "x265" => "x265",
            "h264" | "avc" => "AVC",
            "h265" | "hevc" => "HEVC",
            "vp9" => "VP9",
            "av1" => "AV1",
            _ => return None,
        };
        Some(codec.to_string())
    })
}

/// Step 6: audio codecs and channel layouts
pub fn extract_audio_codecs(text: &str) -> Step<BTreeSet<String>> {
    take_all(&AUDIO, text, |token, _| {
        let squashed = squash(token).replace('+', "");
        let codec = if squashed.starts_with("ddp") {
            "DDP5.1"
        } else if squashed.starts_with("dd") {
            "DD5.1"
        } else if squashed == "eac3" {
            "EAC3"
        } else if squashed == "ac3" {
            "AC3"
        } else if squashed.starts_with("aac") {
            "AAC"
        } else {
            match squashed.as_str() {
                "dts" => "DTS",
                "opus" => "Opus",
                "mp3" => "MP3",
                "atmos" => "Atmos",
                "5.1" => "5.1",
                _ => return None,
            }
        };
        Some(codec.to_string())
    })
}

/// Step 7: languages from bracketed lists and discrete language names
///
/// A bracket group is split into fields at ` - ` and `|` separators. A field
/// counts as a language list when at least one of its words maps to a
/// language. Inside such a field abbreviations are trusted and unmapped two-
/// or three-letter words are kept verbatim. Outside lists only full language
/// names are recognized.
pub fn extract_languages(text: &str) -> Step<BTreeSet<String>> {
    let mut found = BTreeSet::new();

    let after_lists = BRACKET_GROUP
        .replace_all(text, |caps: &Captures| {
            let whole = &caps[0];
            let mut out = String::with_capacity(whole.len());
            let mut start = 0;
            for separator in LIST_SEGMENT_BREAK.find_iter(whole) {
                out.push_str(&strip_language_field(&whole[start..separator.start()], &mut found));
                out.push_str(separator.as_str());
                start = separator.end();
            }
            out.push_str(&strip_language_field(&whole[start..], &mut found));
            out
        })
        .into_owned();

    let rest = WORD
        .replace_all(&after_lists, |w: &Captures| match language::lookup_name(&w[0]) {
            Some(code) => {
                found.insert(code.to_string());
                String::new()
            }
            None => w[0].to_string(),
        })
        .into_owned();

    (found, rest)
}

fn strip_language_field(field: &str, found: &mut BTreeSet<String>) -> String {
    let is_list = WORD
        .find_iter(field)
        .any(|w| language::lookup_any(w.as_str()).is_some());
    if !is_list {
        return field.to_string();
    }

    WORD.replace_all(field, |w: &Captures| {
        let word = &w[0];
        if let Some(code) = language::lookup_any(word) {
            found.insert(code.to_string());
            String::new()
        } else if language::is_unmapped_language_token(word) {
            found.insert(word.to_lowercase());
            String::new()
        } else {
            word.to_string()
        }
    })
    .into_owned()
}

/// Step 8: sizes such as `7GB` or `1.4 GB`
pub fn extract_sizes(text: &str) -> Step<BTreeSet<String>> {
    let mut found = BTreeSet::new();
    let rest = SIZE
        .replace_all(text, |caps: &Captures| {
            found.insert(format!("{}{}", &caps[1], caps[2].to_uppercase()));
            " "
        })
        .into_owned();
    (found, rest)
}

/// Step 9: subtitle markers
pub fn extract_subtitle_flag(text: &str) -> Step<bool> {
    let present = SUBTITLES.is_match(text);
    (present, SUBTITLES.replace_all(text, " ").into_owned())
}

/// Step 10: strips watermarks, leftover groups and junk, collapses whitespace
pub fn clean_residue(text: &str) -> String {
    let text = WWW_WATERMARK.replace_all(text, " ");
    let text = FILE_EXTENSION.replace_all(&text, " ");
    let text = DOMAIN_WATERMARK.replace_all(&text, " ");
    let text = NUMBERED_DOMAIN_WATERMARK.replace_all(&text, " ");
    let mut text = SQUARE_GROUP.replace_all(&text, " ").into_owned();

    loop {
        let trimmed = TRAILING_PAREN.replace(&text, "").into_owned();
        if trimmed == text {
            break;
        }
        text = trimmed;
    }

    let text = JUNK_TOKENS.replace_all(&text, " ");
    let text = EMPTY_PAREN.replace_all(&text, " ");
    let text = DOT_UNDERSCORE.replace_all(&text, " ");
    let text = STRAY_PUNCTUATION.replace_all(&text, " ");

    collapse_separators(&text)
}

/// Collapses whitespace and drops tokens made only of separators
///
/// A lone `&` survives only between two words, as in "Tom & Jerry".
fn collapse_separators(text: &str) -> String {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let is_separator = |token: &str| {
        token
            .chars()
            .all(|c| matches!(c, '-' | ':' | '|' | '+' | '~' | ',' | '/' | '&'))
    };

    let mut kept = Vec::with_capacity(tokens.len());
    for (i, token) in tokens.iter().enumerate() {
        if !is_separator(token) {
            kept.push(*token);
            continue;
        }
        let joins_words = *token == "&"
            && i > 0
            && !is_separator(tokens[i - 1])
            && tokens.get(i + 1).is_some_and(|next| !is_separator(next));
        if joins_words {
            kept.push(*token);
        }
    }

    kept.join(" ")
        .trim_matches(|c: char| matches!(c, '-' | ':' | ',' | '&') || c.is_whitespace())
        .to_string()
}

/// Whether a residue contains nothing but year/season/episode tokens
pub fn is_metadata_only(residue: &str) -> bool {
    METADATA_ONLY.is_match(residue)
}

/// Minimal cleanup used when the full pipeline erased the show name
pub fn fallback_title(raw: &str) -> String {
    let stripped = collapse_separators(&ANY_GROUP.replace_all(raw, " "));
    if stripped.is_empty() {
        raw.split_whitespace().collect::<Vec<_>>().join(" ")
    } else {
        stripped
    }
}

//! Thread page extraction
//!
//! Pulls the title, poster, original-post timestamp and magnet links out of a
//! single forum thread page. Every field has a fallback chain; only a page
//! without any usable title is rejected.

use crate::events::{EventSink, HarvestEvent};
use crate::storage::parse_timestamp;
use crate::url::{display_name, extract_info_hash, is_magnet, resolve_link, thread_id_from_url};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

fn selector(source: &str) -> Selector {
    Selector::parse(source).expect("thread selector must parse")
}

static PAGE_TITLE: Lazy<Selector> = Lazy::new(|| selector("h1.ipsType_pageTitle, h1[data-role='pageTitle']"));
static OG_TITLE: Lazy<Selector> = Lazy::new(|| selector("meta[property='og:title']"));
static HTML_TITLE: Lazy<Selector> = Lazy::new(|| selector("title"));
static OG_IMAGE: Lazy<Selector> = Lazy::new(|| selector("meta[property='og:image']"));
static POST_BODY: Lazy<Selector> =
    Lazy::new(|| selector("div[data-role='commentContent'], div.ipsType_richText, article"));
static IMAGE: Lazy<Selector> = Lazy::new(|| selector("img"));
static TIME: Lazy<Selector> = Lazy::new(|| selector("time[datetime]"));

static MARKUP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script\b.*?</script>|<style\b.*?</style>|<[^>]*>")
        .expect("markup pattern must compile")
});

/// Attachment-title class used by the forum's file attachments
const ATTACHMENT_TITLE_CLASS: &str = "ipsAttachLink_title";

/// Image URLs that are known to be broken or decorative
const BROKEN_ASSETS: &[&str] = &[
    "spacer.png",
    "blank.gif",
    "pixel.gif",
    "/emoticons/",
    "default_photo",
    "data:image",
];

const MAX_TITLE_CHARS: usize = 300;

/// Where a release's descriptive name came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameSource {
    AttachmentTitle,
    DisplayName,
    LinkText,
    /// Nothing usable was found; the name is a generic placeholder
    Placeholder,
}

/// One magnet link found in a thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedRelease {
    pub magnet_uri: String,
    pub info_hash: String,
    pub name: String,
    pub name_source: NameSource,
}

/// Everything pulled out of one thread page
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedThread {
    pub thread_id: String,
    pub url: Url,
    pub title: String,
    pub poster_url: String,
    pub posted_at: DateTime<Utc>,
    pub releases: Vec<ExtractedRelease>,
}

/// Extracts a thread from its page
///
/// Returns None, after recording an `ExtractionFailed` event, when no title
/// can be found. Invalid magnets are dropped with a `ReleaseRejected` event; a
/// missing or unparsable timestamp falls back to now with a
/// `TimestampFallback` event.
pub fn extract_thread(html: &str, url: &Url, events: &dyn EventSink) -> Option<ExtractedThread> {
    let document = Html::parse_document(html);
    let thread_id = thread_id_from_url(url);

    let Some(title) = extract_title(&document) else {
        events.record(HarvestEvent::ExtractionFailed {
            url: url.to_string(),
            reason: "no title in heading, og:title or <title>".to_string(),
        });
        return None;
    };

    let body = document
        .select(&POST_BODY)
        .next()
        .unwrap_or_else(|| document.root_element());

    let poster_url = extract_poster(&document, body, url)
        .unwrap_or_else(|| placeholder_poster(&thread_id));

    let posted_at = match extract_timestamp(&document) {
        (Some(posted_at), _) => posted_at,
        (None, raw) => {
            events.record(HarvestEvent::TimestampFallback {
                url: url.to_string(),
                raw,
            });
            Utc::now()
        }
    };

    let releases = extract_releases(body, &thread_id, events);

    Some(ExtractedThread {
        thread_id,
        url: url.clone(),
        title,
        poster_url,
        posted_at,
        releases,
    })
}

/// Strips markup and control characters, collapses whitespace
///
/// ```
/// use sumi_harvest::crawler::sanitize_text;
///
/// assert_eq!(sanitize_text("Show <script>alert(1)</script> S01"), "Show S01");
/// assert_eq!(sanitize_text("  <b>Bold</b>\tname "), "Bold name");
/// ```
pub fn sanitize_text(raw: &str) -> String {
    let stripped = MARKUP.replace_all(raw, " ");
    let cleaned: String = stripped
        .chars()
        .map(|c| if c.is_control() || c == '<' || c == '>' { ' ' } else { c })
        .collect();

    let mut collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if let Some((cut, _)) = collapsed.char_indices().nth(MAX_TITLE_CHARS) {
        collapsed.truncate(cut);
    }
    collapsed
}

fn element_text(element: ElementRef<'_>) -> String {
    sanitize_text(&element.text().collect::<String>())
}

fn meta_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .filter_map(|element| element.value().attr("content"))
        .map(sanitize_text)
        .find(|content| !content.is_empty())
}

fn extract_title(document: &Html) -> Option<String> {
    document
        .select(&PAGE_TITLE)
        .map(element_text)
        .find(|title| !title.is_empty())
        .or_else(|| meta_content(document, &OG_TITLE))
        .or_else(|| {
            document
                .select(&HTML_TITLE)
                .map(element_text)
                .find(|title| !title.is_empty())
        })
}

fn is_usable_image(url: &Url) -> bool {
    let text = url.as_str();
    !BROKEN_ASSETS.iter().any(|asset| text.contains(asset))
}

fn extract_poster(document: &Html, body: ElementRef<'_>, page_url: &Url) -> Option<String> {
    let from_post = body
        .select(&IMAGE)
        .filter_map(|img| {
            img.value()
                .attr("data-src")
                .or_else(|| img.value().attr("src"))
        })
        .filter_map(|src| resolve_link(src, page_url))
        .find(is_usable_image);

    from_post
        .or_else(|| {
            meta_content(document, &OG_IMAGE)
                .and_then(|src| resolve_link(&src, page_url))
                .filter(is_usable_image)
        })
        .map(String::from)
}

fn placeholder_poster(thread_id: &str) -> String {
    format!("placeholder:poster:{thread_id}")
}

/// The first parsable `time[datetime]`, or None with the raw attribute seen
fn extract_timestamp(document: &Html) -> (Option<DateTime<Utc>>, Option<String>) {
    let raw = document
        .select(&TIME)
        .filter_map(|time| time.value().attr("datetime"))
        .map(str::to_string)
        .next();

    let parsed = raw.as_deref().and_then(parse_timestamp);
    (parsed, raw)
}

fn is_generic_link_text(text: &str) -> bool {
    let lowered = text.to_lowercase();
    lowered.is_empty()
        || is_magnet(text)
        || matches!(
            lowered.as_str(),
            "magnet" | "magnet link" | "download" | "click here" | "here"
        )
}

/// Walks the post body in document order and collects magnet links
///
/// An attachment title names the next magnet after it and is then used up.
fn extract_releases(
    body: ElementRef<'_>,
    thread_id: &str,
    events: &dyn EventSink,
) -> Vec<ExtractedRelease> {
    let mut releases = Vec::new();
    let mut seen_hashes = HashSet::new();
    let mut pending_title: Option<String> = None;

    for element in body.descendants().filter_map(ElementRef::wrap) {
        let value = element.value();

        if value.classes().any(|class| class == ATTACHMENT_TITLE_CLASS) {
            let title = element_text(element);
            if !title.is_empty() {
                pending_title = Some(title);
            }
            continue;
        }

        if value.name() != "a" {
            continue;
        }
        let Some(href) = value.attr("href").map(str::trim) else {
            continue;
        };
        if !is_magnet(href) {
            continue;
        }

        let Some(info_hash) = extract_info_hash(href) else {
            events.record(HarvestEvent::ReleaseRejected {
                thread_id: thread_id.to_string(),
                reason: format!("magnet without a valid info hash: {href}"),
            });
            continue;
        };
        if !seen_hashes.insert(info_hash.to_lowercase()) {
            continue;
        }

        let link_text = element_text(element);
        let (name, name_source) = if let Some(title) = pending_title.take() {
            (title, NameSource::AttachmentTitle)
        } else if let Some(dn) = display_name(href).map(|dn| sanitize_text(&dn)).filter(|dn| !dn.is_empty()) {
            (dn, NameSource::DisplayName)
        } else if !is_generic_link_text(&link_text) {
            (link_text, NameSource::LinkText)
        } else {
            (format!("Release {}", releases.len() + 1), NameSource::Placeholder)
        };

        releases.push(ExtractedRelease {
            magnet_uri: href.to_string(),
            info_hash,
            name,
            name_source,
        });
    }

    releases
}

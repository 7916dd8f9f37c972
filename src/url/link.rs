use url::Url;

/// Resolves an href to an absolute http(s) URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
///
/// # Arguments
///
/// * `href` - The raw attribute value
/// * `base_url` - The URL of the page the link appeared on
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) if matches!(absolute_url.scheme(), "http" | "https") => {
            Some(absolute_url)
        }
        _ => None,
    }
}

/// Returns true if the URL points at a forum topic
pub fn is_topic_url(url: &Url) -> bool {
    url.as_str().contains("/topic/")
}

/// Returns true if the URL points at a member profile
pub fn is_profile_url(url: &Url) -> bool {
    url.as_str().contains("/profile/")
}

/// Strips the fragment and any trailing comment-navigation query from a thread URL
///
/// Listing pages link the same topic several times (`#comments`,
/// `?do=getNewComment`, ...). Only the path identifies the thread, unless the
/// forum routes through `index.php?/...`, in which case the route query is kept.
pub fn canonical_thread_url(url: &Url) -> Url {
    let mut canonical = url.clone();
    canonical.set_fragment(None);

    let keep_query = canonical
        .query()
        .map(|q| q.starts_with('/'))
        .unwrap_or(false);
    if keep_query {
        let route = canonical
            .query()
            .and_then(|q| q.split('&').next())
            .map(str::to_string);
        canonical.set_query(route.as_deref());
    } else {
        canonical.set_query(None);
    }

    canonical
}

//! URL handling for forum pages and release links
//!
//! This module provides link resolution against a page URL, the topic/profile
//! path filters used by discovery, stable thread-id derivation, and magnet URI
//! parsing.

mod link;
mod magnet;
mod thread_id;

pub use link::{canonical_thread_url, is_profile_url, is_topic_url, resolve_link};
pub use magnet::{announce_urls, display_name, extract_info_hash, is_magnet};
pub use thread_id::thread_id_from_url;

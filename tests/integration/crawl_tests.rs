//! Integration tests for the harvester
//!
//! These tests use wiremock to serve forum listing and thread pages and run
//! discovery, revisit and the startup sequence end-to-end.

use chrono::Utc;
use std::sync::Arc;
use sumi_harvest::config::{
    Config, CrawlConfig, ForumConfig, MatchingConfig, StorageConfig, TrackerConfig,
};
use sumi_harvest::events::CollectingSink;
use sumi_harvest::storage::{
    open_store, Fields, MemoryStore, ReleaseRecord, ShowGroup, StorageError, StorageResult,
    Store, GROUP_PREFIX, RELEASE_PREFIX, THREAD_PREFIX,
};
use sumi_harvest::Harvester;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HASH_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const HASH_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
const HASH_C: &str = "cccccccccccccccccccccccccccccccccccccccc";

const LISTING_PATH: &str = "/forums/forum/19-tv-shows/";

/// Creates a test configuration pointing at the mock forum
fn create_test_config(server: &MockServer, tracker_url: Option<String>) -> Config {
    Config {
        forum: ForumConfig {
            base_url: format!("{}{}", server.uri(), LISTING_PATH),
            page_path: "page/{page}/".to_string(),
        },
        crawl: CrawlConfig {
            initial_pages: 0,
            max_concurrency: 2,
            request_delay_ms: 0,
            max_retries: 1,
            backoff_base_ms: 1,
            request_timeout_secs: 5,
            ..CrawlConfig::default()
        },
        trackers: TrackerConfig {
            url: tracker_url,
            refresh_interval_hours: 24,
        },
        storage: StorageConfig {
            database_path: ":memory:".to_string(),
            purge_on_start: false,
        },
        matching: MatchingConfig::default(),
    }
}

fn listing_page(topics: &[&str]) -> String {
    let items: String = topics
        .iter()
        .map(|slug| {
            format!(
                r#"<li>
                     <a href="/forums/topic/{slug}/" data-ipshover>{slug}</a>
                     <a href="/forums/profile/7-uploader/" data-ipshover>uploader</a>
                   </li>"#
            )
        })
        .collect();
    format!("<html><body><ol>{items}</ol></body></html>")
}

fn thread_page(title: &str, magnets: &[(&str, &str)]) -> String {
    let links: String = magnets
        .iter()
        .map(|(hash, name)| {
            format!(r#"<p><a href="magnet:?xt=urn:btih:{hash}&amp;tr=udp%3A%2F%2Fown.example%3A80">{name}</a></p>"#)
        })
        .collect();
    format!(
        r#"<html><head><title>{title} - Forum</title></head><body>
           <h1 class="ipsType_pageTitle">{title}</h1>
           <time datetime="2025-03-01T12:30:00Z">March 1</time>
           <div data-role="commentContent">
             <img src="https://img.example/poster.jpg">
             {links}
           </div>
         </body></html>"#
    )
}

async fn mount_page(server: &MockServer, page_path: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn release_records(store: &dyn Store) -> Vec<ReleaseRecord> {
    store
        .keys_with_prefix(RELEASE_PREFIX)
        .unwrap()
        .iter()
        .map(|key| ReleaseRecord::from_fields(key, &store.get_record(key).unwrap().unwrap()).unwrap())
        .collect()
}

/// Store whose thread records cannot be read back
struct UnreadableThreads(MemoryStore);

impl Store for UnreadableThreads {
    fn get_record(&self, key: &str) -> StorageResult<Option<Fields>> {
        if key.starts_with(THREAD_PREFIX) {
            return Err(StorageError::Poisoned);
        }
        self.0.get_record(key)
    }

    fn put_record(&self, key: &str, fields: &Fields) -> StorageResult<()> {
        self.0.put_record(key, fields)
    }

    fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        self.0.keys_with_prefix(prefix)
    }

    fn clear(&self) -> StorageResult<()> {
        self.0.clear()
    }
}

#[tokio::test]
async fn test_empty_listing_page_stops_discovery() {
    let server = MockServer::start().await;

    mount_page(&server, LISTING_PATH, listing_page(&["101-heart-beat"])).await;
    mount_page(
        &server,
        "/forums/forum/19-tv-shows/page/2/",
        "<html><body><p>No topics</p></body></html>".to_string(),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/forums/forum/19-tv-shows/page/3/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/forums/topic/101-heart-beat/",
        thread_page(
            "Heart Beat (2024) S02E01 [Tamil] 720p",
            &[(HASH_A, "Heart Beat S02E01 720p")],
        ),
    )
    .await;

    let store = Arc::new(MemoryStore::new());
    let sink = Arc::new(CollectingSink::new());
    let harvester =
        Harvester::new(create_test_config(&server, None), store.clone(), sink.clone()).unwrap();

    let report = harvester.discover(0).await.unwrap();
    assert_eq!(report.pages, 1);
    assert_eq!(report.threads_saved, 1);
    assert_eq!(harvester.state().last_successful_page(), 1);
    assert!(!harvester.state().is_running());

    // Everything is fresh now, so a second pass only skips
    let report = harvester.discover(0).await.unwrap();
    assert_eq!(report.threads_skipped, 1);
    assert_eq!(report.threads_saved, 0);
    assert_eq!(harvester.state().last_successful_page(), 1);
    assert!(sink.events().is_empty());
}

#[tokio::test]
async fn test_short_refresh_walk_keeps_deepest_page() {
    let server = MockServer::start().await;

    mount_page(&server, LISTING_PATH, listing_page(&["101-heart-beat"])).await;
    mount_page(
        &server,
        "/forums/forum/19-tv-shows/page/2/",
        listing_page(&["102-mercy-for-none"]),
    )
    .await;
    mount_page(
        &server,
        "/forums/forum/19-tv-shows/page/3/",
        "<html><body><p>No topics</p></body></html>".to_string(),
    )
    .await;
    mount_page(
        &server,
        "/forums/topic/101-heart-beat/",
        thread_page("Heart Beat (2024) S02E01 720p", &[(HASH_A, "Heart Beat S02E01 720p")]),
    )
    .await;
    mount_page(
        &server,
        "/forums/topic/102-mercy-for-none/",
        thread_page("Mercy For None (2025) S01E01 1080p", &[(HASH_B, "Mercy For None S01E01 1080p")]),
    )
    .await;

    let store = Arc::new(MemoryStore::new());
    let harvester = Harvester::new(
        create_test_config(&server, None),
        store,
        Arc::new(CollectingSink::new()),
    )
    .unwrap();

    let report = harvester.discover(0).await.unwrap();
    assert_eq!(report.pages, 2);
    assert_eq!(harvester.state().last_successful_page(), 2);

    let report = harvester.discover(1).await.unwrap();
    assert_eq!(report.pages, 1);
    assert_eq!(harvester.state().last_successful_page(), 2);
}

#[tokio::test]
async fn test_revisit_reprocesses_records_without_timestamp() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/forums/topic/201-vadhandhi/",
        thread_page(
            "Vadhandhi (2022) S01E03 [Tamil + Telugu] 1080p",
            &[(HASH_A, "Vadhandhi S01E03 1080p")],
        ),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/forums/topic/202-fresh-show/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());

    // Tracking record without processedAt
    let mut stale = Fields::new();
    stale.insert("threadId".into(), "201".into());
    stale.insert(
        "sourceUrl".into(),
        format!("{}/forums/topic/201-vadhandhi/", server.uri()),
    );
    store.put_record("thread:201", &stale).unwrap();

    let mut fresh = Fields::new();
    fresh.insert("threadId".into(), "202".into());
    fresh.insert(
        "sourceUrl".into(),
        format!("{}/forums/topic/202-fresh-show/", server.uri()),
    );
    fresh.insert("processedAt".into(), Utc::now().to_rfc3339());
    store.put_record("thread:202", &fresh).unwrap();

    let mut config = create_test_config(&server, None);
    config.crawl.revisit_threshold_hours = 10_000;
    let harvester = Harvester::new(config, store.clone(), Arc::new(CollectingSink::new())).unwrap();

    let report = harvester.revisit().await.unwrap();
    assert_eq!(report.threads_seen, 2);
    assert_eq!(report.threads_skipped, 1);
    assert_eq!(report.threads_saved, 1);

    let record = store.get_record("thread:201").unwrap().unwrap();
    assert!(record.contains_key("processedAt"));
    assert_eq!(record.get("groupId").map(String::as_str), Some("vadhandhi-2022-s01"));
}

#[tokio::test]
async fn test_two_resolutions_persist_as_two_streams() {
    let server = MockServer::start().await;

    mount_page(&server, LISTING_PATH, listing_page(&["301-cooku-with-comali"])).await;
    mount_page(
        &server,
        "/forums/forum/19-tv-shows/page/2/",
        listing_page(&[]),
    )
    .await;
    mount_page(
        &server,
        "/forums/topic/301-cooku-with-comali/",
        thread_page(
            "Cooku With Comali (2025) S06E01 [Tamil - 1080p &amp; 720p]",
            &[
                (HASH_A, "Cooku With Comali S06E01 1080p"),
                (HASH_B, "Cooku With Comali S06E01 720p"),
                ("1234", "broken"),
            ],
        ),
    )
    .await;

    let store = Arc::new(MemoryStore::new());
    let sink = Arc::new(CollectingSink::new());
    let harvester =
        Harvester::new(create_test_config(&server, None), store.clone(), sink.clone()).unwrap();
    harvester.discover(0).await.unwrap();

    let mut releases = release_records(&*store);
    releases.sort_by(|a, b| a.info_hash.cmp(&b.info_hash));
    assert_eq!(releases.len(), 2);
    assert_ne!(releases[0].stream_id, releases[1].stream_id);
    assert_eq!(releases[0].resolution.as_deref(), Some("1080p"));
    assert_eq!(releases[1].resolution.as_deref(), Some("720p"));
    for release in &releases {
        assert_eq!(release.parent_group_id, "cooku-with-comali-2025-s06");
        assert_eq!(release.season_number, 6);
        assert_eq!(release.episode_number, Some(1));
    }

    // The hash-less magnet is dropped without affecting its siblings
    assert_eq!(sink.count("release_rejected"), 1);
}

#[tokio::test]
async fn test_failed_thread_fetch_is_not_fatal() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        LISTING_PATH,
        listing_page(&["401-good-show", "402-broken-show"]),
    )
    .await;
    mount_page(
        &server,
        "/forums/forum/19-tv-shows/page/2/",
        listing_page(&[]),
    )
    .await;
    mount_page(
        &server,
        "/forums/topic/401-good-show/",
        thread_page("Good Show (2023) S01E02 720p", &[(HASH_C, "Good Show S01E02 720p")]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/forums/topic/402-broken-show/"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let sink = Arc::new(CollectingSink::new());
    let harvester =
        Harvester::new(create_test_config(&server, None), store.clone(), sink.clone()).unwrap();

    let report = harvester.discover(0).await.unwrap();
    assert_eq!(report.threads_saved, 1);
    assert_eq!(report.threads_failed, 1);
    assert_eq!(sink.count("fetch_failed"), 1);

    // The failed thread was never marked processed
    assert!(store.get_record("thread:401").unwrap().is_some());
    assert!(store.get_record("thread:402").unwrap().is_none());
}

#[tokio::test]
async fn test_startup_harvest_into_sqlite() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/trackers.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "# public trackers\nudp://tracker.one:1337/announce\n\nhttp://tracker.two/announce\nudp://tracker.one:1337/announce\n",
        ))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(
        &server,
        LISTING_PATH,
        listing_page(&["501-heart-beat-s02", "502-heart-beat-s02-more"]),
    )
    .await;
    mount_page(
        &server,
        "/forums/forum/19-tv-shows/page/2/",
        listing_page(&[]),
    )
    .await;
    mount_page(
        &server,
        "/forums/topic/501-heart-beat-s02/",
        thread_page(
            "Heart Beat (2024) S02E01 [Tamil] 1080p",
            &[(HASH_A, "Heart Beat S02E01 1080p")],
        ),
    )
    .await;
    mount_page(
        &server,
        "/forums/topic/502-heart-beat-s02-more/",
        thread_page(
            "Heart Beat (2024) S02E02 [Telugu] 1080p",
            &[(HASH_B, "Heart Beat S02E02 1080p")],
        ),
    )
    .await;

    let db_path = dir.path().join("catalog.db");
    let store: Arc<dyn Store> = Arc::new(open_store(&db_path).unwrap());
    let config = create_test_config(&server, Some(format!("{}/trackers.txt", server.uri())));
    let harvester = Harvester::new(config, store.clone(), Arc::new(CollectingSink::new())).unwrap();

    let report = harvester.startup().await;
    assert_eq!(report.threads_saved, 2);
    assert_eq!(harvester.trackers().await.trackers.len(), 2);

    // Both threads fold into one show/season group with merged languages
    let groups = store.keys_with_prefix(GROUP_PREFIX).unwrap();
    assert_eq!(groups, vec!["group:heart-beat-2024-s02"]);
    let group = ShowGroup::from_fields(&groups[0], &store.get_record(&groups[0]).unwrap().unwrap())
        .unwrap();
    assert_eq!(group.display_title, "Heart Beat (2024) S02");
    assert!(group.languages.contains("ta") && group.languages.contains("te"));
    assert!(group.seasons.contains(&2));

    assert_eq!(store.count_with_prefix(THREAD_PREFIX).unwrap(), 2);
    for release in release_records(&*store) {
        assert_eq!(
            release.trackers,
            vec![
                "udp://own.example:80",
                "udp://tracker.one:1337/announce",
                "http://tracker.two/announce",
            ]
        );
    }
}

#[tokio::test]
async fn test_unreadable_thread_record_does_not_stop_discovery() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        LISTING_PATH,
        listing_page(&["101-heart-beat", "102-mercy-for-none"]),
    )
    .await;
    mount_page(
        &server,
        "/forums/forum/19-tv-shows/page/2/",
        "<html><body><p>No topics</p></body></html>".to_string(),
    )
    .await;
    mount_page(
        &server,
        "/forums/topic/101-heart-beat/",
        thread_page("Heart Beat (2024) S02E01 720p", &[(HASH_A, "Heart Beat S02E01 720p")]),
    )
    .await;
    mount_page(
        &server,
        "/forums/topic/102-mercy-for-none/",
        thread_page("Mercy For None (2025) S01E01 1080p", &[(HASH_B, "Mercy For None S01E01 1080p")]),
    )
    .await;

    let store = Arc::new(UnreadableThreads(MemoryStore::new()));
    let sink = Arc::new(CollectingSink::new());
    let harvester =
        Harvester::new(create_test_config(&server, None), store.clone(), sink.clone()).unwrap();

    let report = harvester.discover(0).await.unwrap();
    assert_eq!(report.threads_seen, 2);
    assert_eq!(report.threads_saved, 2);
    assert_eq!(sink.count("persist_failed"), 2);
    assert_eq!(store.count_with_prefix(THREAD_PREFIX).unwrap(), 2);

    let report = harvester.revisit().await.unwrap();
    assert_eq!(report.threads_seen, 2);
    assert_eq!(report.threads_failed, 2);
    assert_eq!(sink.count("persist_failed"), 4);
}

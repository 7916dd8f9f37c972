use serde::Deserialize;

/// Main configuration structure for Sumi-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub forum: ForumConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub trackers: TrackerConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
}

/// Where the forum lives and how its listing pages are addressed
#[derive(Debug, Clone, Deserialize)]
pub struct ForumConfig {
    /// URL of the first listing page
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Path appended to the base URL for pages after the first; must contain `{page}`
    #[serde(rename = "page-path", default = "default_page_path")]
    pub page_path: String,
}

/// Crawl scheduling and fetch behavior
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// Listing pages walked on startup (0 = until a page yields nothing)
    #[serde(rename = "initial-pages", default = "default_initial_pages")]
    pub initial_pages: u32,

    /// Listing pages walked on each recurring discovery run (0 = unbounded)
    #[serde(rename = "refresh-pages", default = "default_refresh_pages")]
    pub refresh_pages: u32,

    /// Seconds between recurring new-page discovery runs
    #[serde(rename = "new-page-interval-secs", default = "default_new_page_interval")]
    pub new_page_interval_secs: u64,

    /// Hours between recurring revisit runs
    #[serde(rename = "revisit-interval-hours", default = "default_revisit_interval")]
    pub revisit_interval_hours: u64,

    /// A thread processed more recently than this is skipped
    #[serde(rename = "revisit-threshold-hours", default = "default_revisit_threshold")]
    pub revisit_threshold_hours: u64,

    /// Maximum number of threads processed concurrently within one batch
    #[serde(rename = "max-concurrency", default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Courtesy delay applied before every request (milliseconds)
    #[serde(rename = "request-delay-ms", default = "default_request_delay")]
    pub request_delay_ms: u64,

    /// Retries after the first failed attempt
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff unit; the wait before retry `n` is `base * 2^n`
    #[serde(rename = "backoff-base-ms", default = "default_backoff_base")]
    pub backoff_base_ms: u64,

    /// Whole-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Auxiliary tracker list source
#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
    /// Newline-delimited announce list; no refresh happens when absent
    pub url: Option<String>,

    #[serde(rename = "refresh-interval-hours", default = "default_tracker_refresh")]
    pub refresh_interval_hours: u64,
}

/// Catalog store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Wipe the catalog before the first harvest
    #[serde(rename = "purge-on-start", default)]
    pub purge_on_start: bool,
}

/// Similarity thresholds used by the grouper and by catalog search
#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    #[serde(rename = "group-threshold", default = "default_group_threshold")]
    pub group_threshold: f64,

    #[serde(rename = "search-threshold", default = "default_search_threshold")]
    pub search_threshold: f64,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            initial_pages: default_initial_pages(),
            refresh_pages: default_refresh_pages(),
            new_page_interval_secs: default_new_page_interval(),
            revisit_interval_hours: default_revisit_interval(),
            revisit_threshold_hours: default_revisit_threshold(),
            max_concurrency: default_max_concurrency(),
            request_delay_ms: default_request_delay(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            url: None,
            refresh_interval_hours: default_tracker_refresh(),
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            group_threshold: default_group_threshold(),
            search_threshold: default_search_threshold(),
        }
    }
}

fn default_page_path() -> String {
    "page/{page}/".to_string()
}

fn default_initial_pages() -> u32 {
    5
}

fn default_refresh_pages() -> u32 {
    1
}

fn default_new_page_interval() -> u64 {
    15 * 60
}

fn default_revisit_interval() -> u64 {
    6
}

fn default_revisit_threshold() -> u64 {
    24
}

fn default_max_concurrency() -> usize {
    5
}

fn default_request_delay() -> u64 {
    1000
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_base() -> u64 {
    1000
}

fn default_request_timeout() -> u64 {
    30
}

fn default_tracker_refresh() -> u64 {
    24
}

fn default_group_threshold() -> f64 {
    0.9
}

fn default_search_threshold() -> f64 {
    0.85
}

//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests made by the harvester, including:
//! - Building the HTTP client with transport timeouts
//! - Rotating the User-Agent per request
//! - The courtesy delay applied before every request
//! - Bounded retry with exponential backoff
//! - Reporting exhausted fetches to the event sink

use crate::config::CrawlConfig;
use crate::events::{EventSink, HarvestEvent};
use crate::FetchError;
use rand::seq::SliceRandom;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Browser User-Agent strings rotated across requests
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
];

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timing and retry settings for the fetcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Courtesy delay before every request, retries included
    pub request_delay: Duration,
    /// Retries after the first failed attempt
    pub max_retries: u32,
    /// The wait before retry `n` is `backoff_base * 2^n`
    pub backoff_base: Duration,
    /// Whole-request timeout
    pub timeout: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self::from(&CrawlConfig::default())
    }
}

impl From<&CrawlConfig> for FetchPolicy {
    fn from(config: &CrawlConfig) -> Self {
        Self {
            request_delay: Duration::from_millis(config.request_delay_ms),
            max_retries: config.max_retries,
            backoff_base: Duration::from_millis(config.backoff_base_ms),
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// Redirects are followed by the client (reqwest's default policy, up to 10
/// hops). The User-Agent is set per request, not here.
///
/// # Arguments
///
/// * `timeout` - Whole-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(CONNECT_TIMEOUT)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Delay before the retry that follows failed attempt `attempt` (0-based)
///
/// # Examples
///
/// ```
/// use sumi_harvest::crawler::backoff_delay;
/// use std::time::Duration;
///
/// let base = Duration::from_secs(1);
/// assert_eq!(backoff_delay(0, base), Duration::from_secs(1));
/// assert_eq!(backoff_delay(2, base), Duration::from_secs(4));
/// ```
pub fn backoff_delay(attempt: u32, base: Duration) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt.min(16)))
}

fn pick_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Retrying HTML fetcher
pub struct Fetcher {
    client: Client,
    policy: FetchPolicy,
    events: Arc<dyn EventSink>,
}

impl Fetcher {
    /// Creates a fetcher with the given policy and event sink
    pub fn new(policy: FetchPolicy, events: Arc<dyn EventSink>) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(policy.timeout)?,
            policy,
            events,
        })
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// Fetches a URL and returns its body
    ///
    /// Any 2xx or 3xx final status counts as success. Network errors and other
    /// statuses are retried up to `max_retries` times; on exhaustion a
    /// `FetchFailed` event is recorded and `FetchError::Exhausted` returned.
    pub async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let attempts = self.policy.max_retries + 1;
        let mut last_error = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = backoff_delay(attempt - 1, self.policy.backoff_base);
                debug!("Retrying {} in {:?} (attempt {}/{})", url, delay, attempt + 1, attempts);
                tokio::time::sleep(delay).await;
            }

            match self.fetch_once(url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    warn!("Fetch attempt {}/{} for {} failed: {}", attempt + 1, attempts, url, e);
                    last_error = Some(e);
                }
            }
        }

        let last_error = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempts made".to_string());

        self.events.record(HarvestEvent::FetchFailed {
            url: url.to_string(),
            attempts,
            error: last_error.clone(),
        });

        Err(FetchError::Exhausted {
            url: url.to_string(),
            attempts,
            last_error,
        })
    }

    async fn fetch_once(&self, url: &Url) -> Result<String, FetchError> {
        if !self.policy.request_delay.is_zero() {
            tokio::time::sleep(self.policy.request_delay).await;
        }

        let user_agent = pick_user_agent();
        let response = self
            .client
            .get(url.clone())
            .header(reqwest::header::USER_AGENT, user_agent)
            .send()
            .await
            .map_err(|e| FetchError::Network {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !(status.is_success() || status.is_redirection()) {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| FetchError::Network {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

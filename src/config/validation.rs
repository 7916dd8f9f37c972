use crate::config::types::{Config, CrawlConfig, ForumConfig, MatchingConfig, TrackerConfig};
use crate::{ConfigError, ConfigResult};
use url::Url;

/// Upper bound for every hour-valued setting (ten years)
const MAX_HOURS: u64 = 24 * 365 * 10;

/// Upper bound for every second-valued setting
const MAX_SECS: u64 = MAX_HOURS * 3600;

/// Upper bound for retries after the first attempt
const MAX_RETRIES: u32 = 16;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_forum_config(&config.forum)?;
    validate_crawl_config(&config.crawl)?;
    validate_tracker_config(&config.trackers)?;
    validate_matching_config(&config.matching)?;

    if config.storage.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_forum_config(config: &ForumConfig) -> ConfigResult<()> {
    validate_http_url(&config.base_url, "base_url")?;

    if !config.page_path.contains("{page}") {
        return Err(ConfigError::Validation(format!(
            "page_path must contain the {{page}} placeholder, got '{}'",
            config.page_path
        )));
    }

    Ok(())
}

fn validate_crawl_config(config: &CrawlConfig) -> ConfigResult<()> {
    if config.max_concurrency < 1 || config.max_concurrency > 64 {
        return Err(ConfigError::Validation(format!(
            "max_concurrency must be between 1 and 64, got {}",
            config.max_concurrency
        )));
    }

    validate_range(
        "new_page_interval_secs",
        config.new_page_interval_secs,
        1,
        MAX_SECS,
    )?;
    validate_range(
        "revisit_interval_hours",
        config.revisit_interval_hours,
        1,
        MAX_HOURS,
    )?;
    validate_range(
        "revisit_threshold_hours",
        config.revisit_threshold_hours,
        0,
        MAX_HOURS,
    )?;
    validate_range("request_timeout_secs", config.request_timeout_secs, 1, MAX_SECS)?;

    if config.max_retries > MAX_RETRIES {
        return Err(ConfigError::Validation(format!(
            "max_retries must be at most {}, got {}",
            MAX_RETRIES, config.max_retries
        )));
    }

    Ok(())
}

fn validate_tracker_config(config: &TrackerConfig) -> ConfigResult<()> {
    if let Some(url) = &config.url {
        validate_http_url(url, "trackers.url")?;
    }

    validate_range(
        "trackers.refresh_interval_hours",
        config.refresh_interval_hours,
        1,
        MAX_HOURS,
    )
}

fn validate_range(name: &str, value: u64, min: u64, max: u64) -> ConfigResult<()> {
    if value < min || value > max {
        return Err(ConfigError::Validation(format!(
            "{} must be between {} and {}, got {}",
            name, min, max, value
        )));
    }
    Ok(())
}

fn validate_matching_config(config: &MatchingConfig) -> ConfigResult<()> {
    for (name, value) in [
        ("group_threshold", config.group_threshold),
        ("search_threshold", config.search_threshold),
    ] {
        if !(value > 0.0 && value <= 1.0) {
            return Err(ConfigError::Validation(format!(
                "{} must be in (0, 1], got {}",
                name, value
            )));
        }
    }

    Ok(())
}

fn validate_http_url(raw: &str, field: &str) -> ConfigResult<()> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use http or https",
            field, raw
        )));
    }

    Ok(())
}

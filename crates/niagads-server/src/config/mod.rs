// SPDX-License-Identifier: Apache-2.0

use niagads_core::constants::{
    CACHE_OPERATION_TIMEOUT, CACHE_TTL, DEFAULT_METADATA_SESSIONS, DEFAULT_PAGE_SIZE,
    HTTP_CLIENT_TIMEOUT, TRACKS_PER_API_REQUEST_LIMIT,
};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
pub struct ApiConfig {
    pub page_size: u64,
    pub tracks_per_request: usize,
    pub cache_timeout: Duration,
    pub cache_ttl: Duration,
    pub remote_timeout: Duration,
    pub max_metadata_sessions: usize,
    pub metadata_checkout_timeout: Duration,
    pub memory_cache_max_entries: usize,
    pub redis_url: Option<String>,
    pub redis_prefix: String,
    pub redis_timeout_ms: u64,
    pub redis_retry_attempts: usize,
    pub redis_breaker_failure_threshold: u32,
    pub redis_breaker_open_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE as u64,
            tracks_per_request: TRACKS_PER_API_REQUEST_LIMIT,
            cache_timeout: CACHE_OPERATION_TIMEOUT,
            cache_ttl: CACHE_TTL,
            remote_timeout: HTTP_CLIENT_TIMEOUT,
            max_metadata_sessions: DEFAULT_METADATA_SESSIONS,
            metadata_checkout_timeout: Duration::from_secs(10),
            memory_cache_max_entries: 10_000,
            redis_url: None,
            redis_prefix: "niagads".to_string(),
            redis_timeout_ms: 250,
            redis_retry_attempts: 2,
            redis_breaker_failure_threshold: 8,
            redis_breaker_open_ms: 3000,
        }
    }
}

pub fn validate_startup_config(config: &ApiConfig) -> Result<(), String> {
    if config.page_size == 0 {
        return Err("page size must be > 0".to_string());
    }
    if config.tracks_per_request == 0 {
        return Err("tracks per remote request must be > 0".to_string());
    }
    if config.cache_timeout.is_zero()
        || config.remote_timeout.is_zero()
        || config.metadata_checkout_timeout.is_zero()
    {
        return Err("timeouts must be > 0".to_string());
    }
    if config.cache_ttl.is_zero() {
        return Err("cache ttl must be > 0".to_string());
    }
    if config.max_metadata_sessions == 0 || config.memory_cache_max_entries == 0 {
        return Err("capacity limits must be > 0".to_string());
    }
    if config.redis_url.as_deref().is_some_and(str::is_empty) {
        return Err("redis url must not be empty when set".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ApiConfig::default();
        assert_eq!(config.page_size, 5000);
        assert_eq!(config.tracks_per_request, 50);
        assert_eq!(config.cache_ttl, Duration::from_secs(3600));
        validate_startup_config(&config).expect("defaults");
    }

    #[test]
    fn zero_limits_are_rejected() {
        let config = ApiConfig {
            page_size: 0,
            ..ApiConfig::default()
        };
        assert_eq!(
            validate_startup_config(&config).expect_err("page size"),
            "page size must be > 0"
        );

        let config = ApiConfig {
            cache_timeout: Duration::ZERO,
            ..ApiConfig::default()
        };
        assert!(validate_startup_config(&config).is_err());

        let config = ApiConfig {
            max_metadata_sessions: 0,
            ..ApiConfig::default()
        };
        assert!(validate_startup_config(&config).is_err());
    }
}

// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

use niagads_server::{
    build_router, validate_startup_config, ApiConfig, AppState, CacheBackend, FilerRouteHelper,
    MemoryCache, RedisCache, RedisPolicy, ResponseCache,
};
use niagads_store::{FilerApiClient, SqliteMetadataStore};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILER_URL: &str = "https://tf.lisanwanglab.org/FILER";

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_duration_ms(name: &str, default_ms: u64) -> Duration {
    Duration::from_millis(env_u64(name, default_ms))
}

fn api_config_from_env() -> ApiConfig {
    let defaults = ApiConfig::default();
    ApiConfig {
        page_size: env_u64("NIAGADS_PAGE_SIZE", defaults.page_size),
        tracks_per_request: env_usize("NIAGADS_TRACKS_PER_REQUEST", defaults.tracks_per_request),
        cache_timeout: env_duration_ms(
            "NIAGADS_CACHE_TIMEOUT_MS",
            defaults.cache_timeout.as_millis() as u64,
        ),
        cache_ttl: Duration::from_secs(env_u64(
            "NIAGADS_CACHE_TTL_SECS",
            defaults.cache_ttl.as_secs(),
        )),
        remote_timeout: env_duration_ms(
            "NIAGADS_REMOTE_TIMEOUT_MS",
            defaults.remote_timeout.as_millis() as u64,
        ),
        max_metadata_sessions: env_usize(
            "NIAGADS_MAX_METADATA_SESSIONS",
            defaults.max_metadata_sessions,
        ),
        redis_url: env::var("NIAGADS_REDIS_URL")
            .ok()
            .filter(|v| !v.trim().is_empty()),
        redis_prefix: env::var("NIAGADS_REDIS_PREFIX").unwrap_or(defaults.redis_prefix.clone()),
        ..defaults
    }
}

fn cache_backend(config: &ApiConfig) -> Result<Arc<dyn CacheBackend>, String> {
    match &config.redis_url {
        Some(url) => {
            let policy = RedisPolicy {
                timeout: Duration::from_millis(config.redis_timeout_ms),
                retry_attempts: config.redis_retry_attempts,
                breaker_failure_threshold: config.redis_breaker_failure_threshold,
                breaker_open_duration: Duration::from_millis(config.redis_breaker_open_ms),
                ..RedisPolicy::default()
            };
            let redis = RedisCache::new(url, &config.redis_prefix, policy)
                .map_err(|e| format!("redis client failed: {e}"))?;
            info!(prefix = %config.redis_prefix, "using redis cache");
            Ok(Arc::new(redis))
        }
        None => {
            warn!("NIAGADS_REDIS_URL not set; using process-local cache");
            Ok(Arc::new(MemoryCache::new(config.memory_cache_max_entries)))
        }
    }
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = sigint.recv() => {}
                }
            }
            _ => {
                warn!("signal handlers unavailable; falling back to ctrl-c");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if env_bool("NIAGADS_LOG_JSON", true) {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    init_tracing();

    let config = api_config_from_env();
    validate_startup_config(&config)?;

    let bind_addr = env::var("NIAGADS_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let filer_url = env::var("NIAGADS_FILER_URL").unwrap_or_else(|_| DEFAULT_FILER_URL.to_string());
    let db_path = env::var("NIAGADS_METADATA_DB")
        .map(PathBuf::from)
        .map_err(|_| "NIAGADS_METADATA_DB must point to the track metadata database".to_string())?;
    if !db_path.exists() {
        return Err(format!("metadata database not found: {}", db_path.display()));
    }

    let metadata = Arc::new(SqliteMetadataStore::new(
        db_path,
        config.max_metadata_sessions,
        config.metadata_checkout_timeout,
    ));
    let remote = Arc::new(
        FilerApiClient::new(&filer_url, config.remote_timeout)
            .map_err(|e| format!("filer client failed: {e}"))?,
    );
    let cache = ResponseCache::new(cache_backend(&config)?, config.cache_timeout, config.cache_ttl);
    let helper = FilerRouteHelper::new(metadata, remote, cache, &config);
    let state = AppState::new(helper, config);
    let app = build_router(state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| format!("bind {bind_addr} failed: {e}"))?;
    info!(filer = %filer_url, "niagads-server listening on {bind_addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await
        .map_err(|e| format!("server failed: {e}"))
}

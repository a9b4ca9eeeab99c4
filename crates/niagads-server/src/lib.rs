// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! HTTP service for paged, cached FILER track data.

use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::Router;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

pub mod cache;
mod config;
pub mod helpers;
mod http;
mod middleware;

pub use cache::{
    CacheBackend, CursorCache, MemoryCache, RedisCache, RedisPolicy, ResolvedPage, ResponseCache,
};
pub use config::{validate_startup_config, ApiConfig};
pub use helpers::{
    FilerRouteHelper, RequestContext, ServiceError, TrackDataResponse, TrackMetadataResponse,
};

pub const CRATE_NAME: &str = "niagads-server";

#[derive(Debug)]
pub struct CacheError(pub String);

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for CacheError {}

#[derive(Clone)]
pub struct AppState {
    pub helper: Arc<FilerRouteHelper>,
    pub config: Arc<ApiConfig>,
    pub(crate) request_id_seed: Arc<AtomicU64>,
}

impl AppState {
    #[must_use]
    pub fn new(helper: FilerRouteHelper, config: ApiConfig) -> Self {
        Self {
            helper: Arc::new(helper),
            config: Arc::new(config),
            request_id_seed: Arc::new(AtomicU64::new(1)),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(http::handlers::healthz_handler))
        .route("/version", get(http::handlers::version_handler))
        .route("/filer/data", get(http::handlers::track_data_handler))
        .route(
            "/filer/data/search",
            get(http::handlers::search_track_data_handler),
        )
        .route("/filer/track", get(http::handlers::track_metadata_handler))
        .route(
            "/filer/track/:track",
            get(http::handlers::track_metadata_by_id_handler),
        )
        .route(
            "/filer/metadata/search",
            get(http::handlers::search_track_metadata_handler),
        )
        .route(
            "/filer/metadata/filter/:field",
            get(http::handlers::filter_summary_handler),
        )
        .route("/filer/qtl/:track", get(http::handlers::feature_qtl_handler))
        .route("/filer/collection", get(http::handlers::collections_handler))
        .route(
            "/filer/collection/:collection",
            get(http::handlers::collection_track_metadata_handler),
        )
        .layer(from_fn_with_state(
            state.clone(),
            middleware::request_tracing::request_tracing_middleware,
        ))
        .with_state(state)
}

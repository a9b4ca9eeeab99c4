// SPDX-License-Identifier: Apache-2.0

//! Route helpers: one async use case per route, composed from the metadata
//! store, the remote track data source and the caches.

mod data;
mod external;
mod metadata;

use crate::cache::{CursorCache, ResponseCache};
use crate::config::ApiConfig;
use niagads_api::{ApiError, ApiErrorCode};
use niagads_core::{CacheKey, CacheKeyError};
use niagads_model::{
    BedFeature, Collection, PagedResponse, RequestData, SimpleResponse, Track, TrackOverlap,
    TrackSummary,
};
use niagads_query::{PaginationError, PaginationErrorCode};
use niagads_store::{
    FilterValueSummary, MetadataStore, RemoteTrackDataSource, StoreError, StoreErrorCode,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub const NO_MATCHING_TRACKS: &str = "No tracks meet the specified metadata filter criteria.";
pub const NO_OVERLAPPING_FEATURES: &str = "No overlapping features found in the query region.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    pub code: ApiErrorCode,
    pub message: String,
}

impl ServiceError {
    #[must_use]
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn into_api_error(self, request_id: &str) -> ApiError {
        ApiError::new(self.code, self.message, serde_json::json!({}), request_id)
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ServiceError {}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        let code = match err.code {
            StoreErrorCode::InvalidTrackId => ApiErrorCode::InvalidTrackId,
            StoreErrorCode::InvalidCollection => ApiErrorCode::NotFound,
            StoreErrorCode::Database => ApiErrorCode::MetadataStore,
            StoreErrorCode::RemoteSource => ApiErrorCode::RemoteSource,
            StoreErrorCode::Unavailable => ApiErrorCode::NotReady,
            _ => ApiErrorCode::Internal,
        };
        Self::new(code, err.message)
    }
}

impl From<PaginationError> for ServiceError {
    fn from(err: PaginationError) -> Self {
        let code = match err.code {
            PaginationErrorCode::InvalidPage => ApiErrorCode::InvalidPage,
            _ => ApiErrorCode::Internal,
        };
        Self::new(code, err.message)
    }
}

impl From<CacheKeyError> for ServiceError {
    fn from(err: CacheKeyError) -> Self {
        Self::new(ApiErrorCode::Internal, err.0)
    }
}

/// Identity of one incoming request: its id, path and raw query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: String,
    pub path: String,
    pub parameters: BTreeMap<String, String>,
}

impl RequestContext {
    #[must_use]
    pub fn new(
        request_id: impl Into<String>,
        path: impl Into<String>,
        parameters: BTreeMap<String, String>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            path: path.into(),
            parameters,
        }
    }

    pub fn cache_key(&self) -> Result<CacheKey, ServiceError> {
        let pairs = self
            .parameters
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()));
        Ok(CacheKey::from_request(&self.path, pairs)?)
    }

    #[must_use]
    pub fn request_data(&self) -> RequestData {
        RequestData::new(&self.request_id, &self.path, self.parameters.clone())
    }
}

/// One page of track data, shaped by the requested content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrackDataResponse {
    Features(PagedResponse<BedFeature>),
    Counts(PagedResponse<TrackOverlap>),
    Ids(PagedResponse<String>),
    Summary(PagedResponse<TrackSummary>),
    Urls(PagedResponse<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackCount {
    pub num_tracks: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrackMetadataResponse {
    Full(PagedResponse<Track>),
    Summary(PagedResponse<TrackSummary>),
    Ids(PagedResponse<String>),
    Urls(PagedResponse<String>),
    Counts(SimpleResponse<TrackCount>),
}

pub type CollectionsResponse = SimpleResponse<Vec<Collection>>;
pub type FilterSummaryResponse = SimpleResponse<Vec<FilterValueSummary>>;

/// Responses carrying the request echo, refreshed on cache hits.
trait Envelope {
    fn request_mut(&mut self) -> &mut RequestData;

    /// Swaps in the current request's identity, keeping any cached message.
    fn refresh(mut self, ctx: &RequestContext) -> Self
    where
        Self: Sized,
    {
        let request = self.request_mut();
        let message = request.message.take();
        *request = ctx.request_data();
        request.message = message;
        self
    }
}

impl<T> Envelope for PagedResponse<T> {
    fn request_mut(&mut self) -> &mut RequestData {
        &mut self.request
    }
}

impl<T> Envelope for SimpleResponse<T> {
    fn request_mut(&mut self) -> &mut RequestData {
        &mut self.request
    }
}

impl Envelope for TrackDataResponse {
    fn request_mut(&mut self) -> &mut RequestData {
        match self {
            Self::Features(r) => &mut r.request,
            Self::Counts(r) => &mut r.request,
            Self::Ids(r) | Self::Urls(r) => &mut r.request,
            Self::Summary(r) => &mut r.request,
        }
    }
}

impl Envelope for TrackMetadataResponse {
    fn request_mut(&mut self) -> &mut RequestData {
        match self {
            Self::Full(r) => &mut r.request,
            Self::Summary(r) => &mut r.request,
            Self::Ids(r) | Self::Urls(r) => &mut r.request,
            Self::Counts(r) => &mut r.request,
        }
    }
}

/// Orchestrates the FILER use cases.
///
/// Holds no per-request state: every use case takes a [`RequestContext`] and
/// checks out its own metadata session, released when the call returns.
pub struct FilerRouteHelper {
    metadata: Arc<dyn MetadataStore>,
    remote: Arc<dyn RemoteTrackDataSource>,
    cache: ResponseCache,
    cursors: CursorCache,
    page_size: u64,
    tracks_per_request: usize,
}

impl FilerRouteHelper {
    #[must_use]
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        remote: Arc<dyn RemoteTrackDataSource>,
        cache: ResponseCache,
        config: &ApiConfig,
    ) -> Self {
        Self {
            metadata,
            remote,
            cursors: CursorCache::new(cache.clone()),
            cache,
            page_size: config.page_size.max(1),
            tracks_per_request: config.tracks_per_request.max(1),
        }
    }

    async fn cached<T>(&self, key: &CacheKey, ctx: &RequestContext) -> Option<T>
    where
        T: Envelope + serde::de::DeserializeOwned,
    {
        self.cache
            .get::<T>(key.namespace, &key.encrypt())
            .await
            .map(|hit| hit.refresh(ctx))
    }

    async fn store<T: Serialize>(&self, key: &CacheKey, response: &T) {
        self.cache.set(key.namespace, &key.encrypt(), response).await;
    }
}

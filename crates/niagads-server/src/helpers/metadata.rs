// SPDX-License-Identifier: Apache-2.0

use super::{
    CollectionsResponse, FilerRouteHelper, FilterSummaryResponse, RequestContext, ServiceError,
    TrackCount, TrackMetadataResponse,
};
use niagads_api::{
    CollectionParameters, FilterSummaryParameters, MetadataSearchParameters,
    TrackMetadataParameters,
};
use niagads_model::{
    PagedResponse, PaginationCursor, RequestData, ResponseContent, SimpleResponse, Track,
    TrackSummary,
};
use niagads_query::{page_window, slice_records};
use niagads_store::MetadataQuery;
use tracing::debug;

fn shape(
    content: ResponseContent,
    request: RequestData,
    pagination: PaginationCursor,
    tracks: Vec<Track>,
) -> TrackMetadataResponse {
    match content {
        ResponseContent::Full => TrackMetadataResponse::Full(PagedResponse {
            request,
            pagination,
            data: tracks,
        }),
        ResponseContent::Summary => TrackMetadataResponse::Summary(PagedResponse {
            request,
            pagination,
            data: tracks
                .iter()
                .map(|t| TrackSummary::from_track(t, None))
                .collect(),
        }),
        ResponseContent::Ids => TrackMetadataResponse::Ids(PagedResponse {
            request,
            pagination,
            data: tracks.into_iter().map(|t| t.track_id).collect(),
        }),
        ResponseContent::Urls => TrackMetadataResponse::Urls(PagedResponse {
            request,
            pagination,
            data: tracks.into_iter().filter_map(|t| t.url).collect(),
        }),
        ResponseContent::Counts => TrackMetadataResponse::Counts(SimpleResponse {
            request,
            data: TrackCount {
                num_tracks: pagination.total_num_records.unwrap_or(0),
            },
        }),
    }
}

impl FilerRouteHelper {
    /// Metadata for an explicit track list; unknown ids are an error.
    pub async fn get_track_metadata(
        &self,
        ctx: &RequestContext,
        params: &TrackMetadataParameters,
    ) -> Result<TrackMetadataResponse, ServiceError> {
        let key = ctx.cache_key()?;
        if let Some(hit) = self.cached::<TrackMetadataResponse>(&key, ctx).await {
            debug!(request_id = %ctx.request_id, "track metadata cache hit");
            return Ok(hit);
        }
        let tracks = {
            let mut session = self.metadata.checkout().await?;
            session.get_track_metadata(&params.tracks, true)?
        };
        let total = tracks.len() as u64;
        let pagination = PaginationCursor {
            paged_num_records: Some(total),
            total_num_records: Some(total),
            ..PaginationCursor::default()
        };
        let response = shape(
            params.response.content,
            ctx.request_data(),
            pagination,
            tracks,
        );
        self.store(&key, &response).await;
        Ok(response)
    }

    pub async fn get_collection_track_metadata(
        &self,
        ctx: &RequestContext,
        params: &CollectionParameters,
    ) -> Result<TrackMetadataResponse, ServiceError> {
        let key = ctx.cache_key()?;
        if let Some(hit) = self.cached::<TrackMetadataResponse>(&key, ctx).await {
            return Ok(hit);
        }
        let tracks = {
            let mut session = self.metadata.checkout().await?;
            session.get_collection_track_metadata(&params.collection)?
        };
        let (range, pagination) = page_window(params.page, self.page_size, tracks.len() as u64)?;
        let response = shape(
            params.response.content,
            ctx.request_data(),
            pagination,
            slice_records(tracks, range),
        );
        self.store(&key, &response).await;
        Ok(response)
    }

    pub async fn get_collections(
        &self,
        ctx: &RequestContext,
    ) -> Result<CollectionsResponse, ServiceError> {
        let key = ctx.cache_key()?;
        if let Some(hit) = self.cached::<CollectionsResponse>(&key, ctx).await {
            return Ok(hit);
        }
        let collections = {
            let mut session = self.metadata.checkout().await?;
            session.get_collections()?
        };
        let response = SimpleResponse {
            request: ctx.request_data(),
            data: collections,
        };
        self.store(&key, &response).await;
        Ok(response)
    }

    /// Metadata-only search within one assembly, paged in the store with limit/offset.
    pub async fn search_track_metadata(
        &self,
        ctx: &RequestContext,
        params: &MetadataSearchParameters,
    ) -> Result<TrackMetadataResponse, ServiceError> {
        let key = ctx.cache_key()?;
        if let Some(hit) = self.cached::<TrackMetadataResponse>(&key, ctx).await {
            debug!(request_id = %ctx.request_id, "metadata search cache hit");
            return Ok(hit);
        }
        let mut query = MetadataQuery {
            filters: params.filters.clone(),
            keyword: params.keyword.clone(),
            ..MetadataQuery::new(params.assembly)
        };

        let mut session = self.metadata.checkout().await?;
        let total = session.count_track_metadata(&query)?;
        let (tracks, pagination) = if params.response.content == ResponseContent::Counts {
            let pagination = PaginationCursor {
                total_num_records: Some(total),
                ..PaginationCursor::default()
            };
            (Vec::new(), pagination)
        } else {
            let (range, pagination) = page_window(params.page, self.page_size, total)?;
            query.limit = Some(range.len());
            query.offset = Some(range.start);
            (session.query_track_metadata(&query)?, pagination)
        };
        drop(session);

        let response = shape(
            params.response.content,
            ctx.request_data(),
            pagination,
            tracks,
        );
        self.store(&key, &response).await;
        Ok(response)
    }

    /// Distinct values of a filterable field, for building search forms.
    pub async fn get_filter_summary(
        &self,
        ctx: &RequestContext,
        params: &FilterSummaryParameters,
    ) -> Result<FilterSummaryResponse, ServiceError> {
        let key = ctx.cache_key()?;
        if let Some(hit) = self.cached::<FilterSummaryResponse>(&key, ctx).await {
            return Ok(hit);
        }
        let values = {
            let mut session = self.metadata.checkout().await?;
            session.get_track_filter_summary(params.field, params.include_counts)?
        };
        let response = SimpleResponse {
            request: ctx.request_data(),
            data: values,
        };
        self.store(&key, &response).await;
        Ok(response)
    }
}

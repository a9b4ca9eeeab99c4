// SPDX-License-Identifier: Apache-2.0

use super::{
    FilerRouteHelper, RequestContext, ServiceError, TrackDataResponse, NO_MATCHING_TRACKS,
    NO_OVERLAPPING_FEATURES,
};
use futures::future::try_join_all;
use niagads_api::{
    ApiErrorCode, FeatureLocation, QtlParameters, SearchDataParameters, TrackDataParameters,
};
use niagads_core::CacheKey;
use niagads_model::{
    Assembly, BedFeature, GenomeBuild, PagedResponse, ResponseContent, Span, Track, TrackOverlap,
    TrackSummary,
};
use niagads_query::{chunk_tracks, page_window, slice_records, sort_descending, DataPaginationCursor};
use niagads_store::MetadataQuery;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Everything needed to turn per-track counts into one page of output.
struct PageRequest<'a> {
    ctx: &'a RequestContext,
    key: &'a CacheKey,
    span: &'a Span,
    assembly: Assembly,
    page: u64,
    content: ResponseContent,
}

fn empty_response(content: ResponseContent, ctx: &RequestContext, message: &str) -> TrackDataResponse {
    let request = ctx.request_data();
    match content {
        ResponseContent::Full => TrackDataResponse::Features(PagedResponse::empty(request, message)),
        ResponseContent::Counts => TrackDataResponse::Counts(PagedResponse::empty(request, message)),
        ResponseContent::Ids => TrackDataResponse::Ids(PagedResponse::empty(request, message)),
        ResponseContent::Summary => {
            TrackDataResponse::Summary(PagedResponse::empty(request, message))
        }
        ResponseContent::Urls => TrackDataResponse::Urls(PagedResponse::empty(request, message)),
    }
}

fn single_assembly(build: GenomeBuild) -> Result<Assembly, ServiceError> {
    match build {
        GenomeBuild::Single(assembly) => Ok(assembly),
        GenomeBuild::Mixed(map) => {
            let listing: Vec<String> = map
                .iter()
                .map(|(track, assembly)| format!("{track}: {assembly}"))
                .collect();
            Err(ServiceError::new(
                ApiErrorCode::MultipleAssemblies,
                format!(
                    "Tracks map to multiple assemblies; please query GRCh37 and GRCh38 data independently ({})",
                    listing.join(", ")
                ),
            ))
        }
    }
}

impl FilerRouteHelper {
    /// Features, counts or track listings for an explicit track list over a span.
    pub async fn get_track_data(
        &self,
        ctx: &RequestContext,
        params: &TrackDataParameters,
    ) -> Result<TrackDataResponse, ServiceError> {
        let key = ctx.cache_key()?;
        if let Some(hit) = self.cached::<TrackDataResponse>(&key, ctx).await {
            debug!(request_id = %ctx.request_id, "track data cache hit");
            return Ok(hit);
        }

        let mut tracks = params.tracks.clone();
        tracks.sort();
        let mut session = self.metadata.checkout().await?;
        let assembly = single_assembly(session.get_genome_build(&tracks, true)?)?;
        let overlaps = self.overlap_counts(&tracks, &params.span, assembly).await?;

        let request = PageRequest {
            ctx,
            key: &key,
            span: &params.span,
            assembly,
            page: params.page,
            content: params.response.content,
        };
        let response = self
            .page_track_data(&request, overlaps, |ids| {
                session.get_track_metadata(ids, false)
            })
            .await?;
        drop(session);
        self.store(&key, &response).await;
        Ok(response)
    }

    /// QTL records of one track around a sequence feature.
    ///
    /// Spans and positional variants resolve locally and page like any other
    /// track data request. Genes and refSNP ids need a lookup FILER does not
    /// provide and are refused.
    pub async fn get_feature_qtls(
        &self,
        ctx: &RequestContext,
        params: &QtlParameters,
    ) -> Result<TrackDataResponse, ServiceError> {
        let span = match &params.location {
            FeatureLocation::Span(span) | FeatureLocation::Variant { span, .. } => span.clone(),
            FeatureLocation::RefSnp(id) => {
                return Err(ServiceError::new(
                    ApiErrorCode::NotImplemented,
                    format!("Mapping variants by refSNP id is not yet supported ({id}); use chr:pos:ref:alt"),
                ))
            }
            FeatureLocation::Gene(id) => {
                return Err(ServiceError::new(
                    ApiErrorCode::NotImplemented,
                    format!("Gene QTL lookups are not yet supported ({id}); query the gene's span instead"),
                ))
            }
        };
        debug!(
            request_id = %ctx.request_id,
            track = %params.track,
            location = ?params.location,
            "qtl lookup"
        );
        let data = TrackDataParameters {
            tracks: vec![params.track.clone()],
            span,
            page: params.page,
            response: params.response,
        };
        self.get_track_data(ctx, &data).await
    }

    /// Track data for every track with hits in the span that also matches
    /// the metadata filter and keyword, when given.
    pub async fn search_track_data(
        &self,
        ctx: &RequestContext,
        params: &SearchDataParameters,
    ) -> Result<TrackDataResponse, ServiceError> {
        let key = ctx.cache_key()?;
        if let Some(hit) = self.cached::<TrackDataResponse>(&key, ctx).await {
            debug!(request_id = %ctx.request_id, "search data cache hit");
            return Ok(hit);
        }
        let content = params.response.content;

        let mut session = self.metadata.checkout().await?;
        let matching: Option<Vec<Track>> = if params.has_metadata_filters() {
            let query = MetadataQuery {
                filters: params.filters.clone(),
                keyword: params.keyword.clone(),
                ..MetadataQuery::new(params.assembly)
            };
            let tracks = session.query_track_metadata(&query)?;
            if tracks.is_empty() {
                return Ok(empty_response(content, ctx, NO_MATCHING_TRACKS));
            }
            Some(tracks)
        } else {
            None
        };

        let informative = self
            .informative_tracks(&params.span, params.assembly)
            .await?;
        if informative.is_empty() {
            return Ok(empty_response(content, ctx, NO_OVERLAPPING_FEATURES));
        }

        let targets: Vec<TrackOverlap> = match &matching {
            Some(tracks) => {
                let ids: HashSet<&str> = tracks.iter().map(|t| t.track_id.as_str()).collect();
                informative
                    .into_iter()
                    .filter(|t| ids.contains(t.track_id.as_str()))
                    .collect()
            }
            None => informative,
        };
        if targets.is_empty() {
            return Ok(empty_response(content, ctx, NO_OVERLAPPING_FEATURES));
        }

        let request = PageRequest {
            ctx,
            key: &key,
            span: &params.span,
            assembly: params.assembly,
            page: params.page,
            content,
        };
        let response = self
            .page_track_data(&request, targets, |ids| match &matching {
                Some(tracks) => Ok(tracks
                    .iter()
                    .filter(|t| ids.contains(&t.track_id))
                    .cloned()
                    .collect()),
                None => session.get_track_metadata(ids, false),
            })
            .await?;
        drop(session);
        self.store(&key, &response).await;
        Ok(response)
    }

    /// Pages `overlaps` according to the requested content.
    ///
    /// FULL pages over the concatenated features through the cursor table;
    /// the other modes page over the tracks themselves, largest first.
    async fn page_track_data<F>(
        &self,
        request: &PageRequest<'_>,
        overlaps: Vec<TrackOverlap>,
        lookup_metadata: F,
    ) -> Result<TrackDataResponse, ServiceError>
    where
        F: FnOnce(&[String]) -> Result<Vec<Track>, niagads_store::StoreError>,
    {
        let ctx = request.ctx;
        if request.content == ResponseContent::Full {
            let fingerprint = request.key.no_page()?;
            let resolved = self
                .cursors
                .get_or_compute(&fingerprint, &overlaps, self.page_size, request.page)
                .await?;
            if resolved.total_num_records == 0 {
                return Ok(empty_response(
                    ResponseContent::Full,
                    ctx,
                    NO_OVERLAPPING_FEATURES,
                ));
            }
            let data = self
                .page_features(&resolved.cursor, request.span, request.assembly)
                .await?;
            let mut pagination = resolved.cursor.pagination(resolved.total_num_records);
            pagination.paged_num_records = Some(data.len() as u64);
            return Ok(TrackDataResponse::Features(PagedResponse {
                request: ctx.request_data(),
                pagination,
                data,
            }));
        }

        let sorted = sort_descending(&overlaps);
        let (range, pagination) = page_window(request.page, self.page_size, sorted.len() as u64)?;
        let rows = slice_records(sorted, range);
        let request_data = ctx.request_data();
        let response = match request.content {
            ResponseContent::Counts => TrackDataResponse::Counts(PagedResponse {
                request: request_data,
                pagination,
                data: rows,
            }),
            ResponseContent::Ids => TrackDataResponse::Ids(PagedResponse {
                request: request_data,
                pagination,
                data: rows.into_iter().map(|t| t.track_id).collect(),
            }),
            ResponseContent::Summary | ResponseContent::Urls | ResponseContent::Full => {
                let ids: Vec<String> = rows.iter().map(|t| t.track_id.clone()).collect();
                let metadata: HashMap<String, Track> = lookup_metadata(&ids)?
                    .into_iter()
                    .map(|t| (t.track_id.clone(), t))
                    .collect();
                let summaries: Vec<TrackSummary> = rows
                    .iter()
                    .filter_map(|row| {
                        metadata
                            .get(&row.track_id)
                            .map(|t| TrackSummary::from_track(t, Some(row.num_overlaps)))
                    })
                    .collect();
                if request.content == ResponseContent::Urls {
                    TrackDataResponse::Urls(PagedResponse {
                        request: request_data,
                        pagination,
                        data: summaries.into_iter().filter_map(|s| s.url).collect(),
                    })
                } else {
                    TrackDataResponse::Summary(PagedResponse {
                        request: request_data,
                        pagination,
                        data: summaries,
                    })
                }
            }
        };
        Ok(response)
    }

    /// Fetches the features of the page's tracks in parallel chunks and cuts
    /// each track to its slice, in cursor order.
    async fn page_features(
        &self,
        cursor: &DataPaginationCursor,
        span: &Span,
        assembly: Assembly,
    ) -> Result<Vec<BedFeature>, ServiceError> {
        let ids = cursor.track_ids();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let chunks = chunk_tracks(&ids, self.tracks_per_request);
        info!(
            chunks = chunks.len(),
            tracks = ids.len(),
            page = cursor.page,
            "fetching page features"
        );
        let fetched = try_join_all(
            chunks
                .iter()
                .map(|chunk| self.overlap_features(chunk, span, assembly)),
        )
        .await?;

        let mut by_track: HashMap<String, Vec<BedFeature>> = fetched
            .into_iter()
            .flatten()
            .map(|t| (t.track_id, t.features))
            .collect();
        let mut data = Vec::new();
        for slice in &cursor.tracks {
            let features = by_track.remove(&slice.track_id).unwrap_or_default();
            if (features.len() as u64) < slice.range.end {
                warn!(
                    track = %slice.track_id,
                    returned = features.len(),
                    counted = slice.range.end,
                    "remote returned fewer features than it counted"
                );
            }
            data.extend(
                slice_records(features, slice.range)
                    .into_iter()
                    .map(|f| f.with_track(&slice.track_id)),
            );
        }
        Ok(data)
    }
}

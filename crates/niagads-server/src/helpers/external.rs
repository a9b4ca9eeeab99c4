// SPDX-License-Identifier: Apache-2.0

//! Remote FILER calls, each cached in the external API namespace.

use super::{FilerRouteHelper, ServiceError};
use niagads_core::{CacheKey, CacheNamespace};
use niagads_model::{Assembly, Span, TrackOverlap};
use niagads_store::TrackFeatures;
use tracing::debug;

const NAMESPACE: CacheNamespace = CacheNamespace::FilerExternalApi;

fn overlaps_key(tracks: &[String], span: &Span, assembly: Assembly, counts_only: bool) -> String {
    CacheKey::new(
        format!(
            "/get_overlaps?assembly={}&countsOnly={counts_only}&span={span}&tracks={}",
            assembly.as_str(),
            tracks.join(",")
        ),
        NAMESPACE,
    )
    .encrypt()
}

fn informative_tracks_key(span: &Span, assembly: Assembly) -> String {
    let raw = format!(
        "/get_overlapping_tracks_by_coord?assembly={}&span={span}",
        assembly.as_str()
    );
    CacheKey::new(raw.replace(':', "_"), NAMESPACE).encrypt()
}

impl FilerRouteHelper {
    pub(super) async fn overlap_counts(
        &self,
        tracks: &[String],
        span: &Span,
        assembly: Assembly,
    ) -> Result<Vec<TrackOverlap>, ServiceError> {
        let key = overlaps_key(tracks, span, assembly, true);
        if let Some(hit) = self.cache.get(NAMESPACE, &key).await {
            debug!(tracks = tracks.len(), "overlap counts cache hit");
            return Ok(hit);
        }
        let counts = self.remote.get_overlap_counts(tracks, span, assembly).await?;
        self.cache.set(NAMESPACE, &key, &counts).await;
        Ok(counts)
    }

    pub(super) async fn overlap_features(
        &self,
        tracks: &[String],
        span: &Span,
        assembly: Assembly,
    ) -> Result<Vec<TrackFeatures>, ServiceError> {
        let key = overlaps_key(tracks, span, assembly, false);
        if let Some(hit) = self.cache.get(NAMESPACE, &key).await {
            debug!(tracks = tracks.len(), "overlap features cache hit");
            return Ok(hit);
        }
        let features = self
            .remote
            .get_overlap_features(tracks, span, assembly)
            .await?;
        self.cache.set(NAMESPACE, &key, &features).await;
        Ok(features)
    }

    pub(super) async fn informative_tracks(
        &self,
        span: &Span,
        assembly: Assembly,
    ) -> Result<Vec<TrackOverlap>, ServiceError> {
        let key = informative_tracks_key(span, assembly);
        if let Some(hit) = self.cache.get(NAMESPACE, &key).await {
            debug!("informative tracks cache hit");
            return Ok(hit);
        }
        let tracks = self.remote.get_informative_tracks(span, assembly).await?;
        self.cache.set(NAMESPACE, &key, &tracks).await;
        Ok(tracks)
    }
}

// SPDX-License-Identifier: Apache-2.0

use crate::StoreError;
use async_trait::async_trait;
use niagads_core::constants::MAX_TRACKS_FOR_FEATURE_COUNTING;
use niagads_model::{Assembly, BedFeature, Span, TrackOverlap};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, instrument};

/// Features of one track overlapping the queried span, in remote order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackFeatures {
    pub track_id: String,
    pub features: Vec<BedFeature>,
}

/// Genomic feature repository queried per span.
#[async_trait]
pub trait RemoteTrackDataSource: Send + Sync + 'static {
    /// One entry per requested track, zero counts included.
    async fn get_overlap_counts(
        &self,
        tracks: &[String],
        span: &Span,
        assembly: Assembly,
    ) -> Result<Vec<TrackOverlap>, StoreError>;

    async fn get_overlap_features(
        &self,
        tracks: &[String],
        span: &Span,
        assembly: Assembly,
    ) -> Result<Vec<TrackFeatures>, StoreError>;

    /// Every track with at least one hit in `span`, not restricted by metadata.
    async fn get_informative_tracks(
        &self,
        span: &Span,
        assembly: Assembly,
    ) -> Result<Vec<TrackOverlap>, StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilerEndpoint {
    Overlaps,
    InformativeTracks,
}

impl FilerEndpoint {
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Overlaps => "get_overlaps.php",
            Self::InformativeTracks => "get_overlapping_tracks_by_coord.php",
        }
    }
}

#[derive(Debug, Deserialize)]
struct OverlapRecord {
    #[serde(rename = "Identifier")]
    identifier: String,
    #[serde(default)]
    features: Vec<BedFeature>,
}

#[derive(Debug, Deserialize)]
struct InformativeTrackRecord {
    #[serde(rename = "Identifier")]
    identifier: String,
    #[serde(rename = "numOverlaps")]
    num_overlaps: u64,
}

/// HTTP client for the FILER API. No retries: span queries are expensive upstream.
#[derive(Clone)]
pub struct FilerApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl FilerApiClient {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| StoreError::remote(format!("http client init failed: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    #[instrument(name = "filer_fetch", skip(self, params), fields(endpoint = endpoint.path()))]
    async fn fetch(
        &self,
        endpoint: FilerEndpoint,
        params: &[(&str, String)],
    ) -> Result<Value, StoreError> {
        let url = format!("{}/{}", self.base_url, endpoint.path());
        let mut query: Vec<(&str, String)> = vec![("outputFormat", "json".to_string())];
        query.extend(params.iter().cloned());
        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| StoreError::remote(format!("FILER request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::remote(format!(
                "FILER request to {url} failed with status {status}"
            )));
        }
        let body: Value = response.json().await.map_err(|e| {
            StoreError::remote(format!("Unable to parse FILER response from {url}: {e}"))
        })?;
        if let Some(message) = body.get("message").and_then(Value::as_str) {
            return Err(StoreError::remote(format!("FILER error: {message}")));
        }
        debug!(url = %url, "FILER response received");
        Ok(body)
    }

    async fn fetch_overlaps(
        &self,
        tracks: &[String],
        span: &Span,
    ) -> Result<Vec<OverlapRecord>, StoreError> {
        let body = self
            .fetch(
                FilerEndpoint::Overlaps,
                &[("trackIDs", tracks.join(",")), ("region", span.to_string())],
            )
            .await?;
        serde_json::from_value(body)
            .map_err(|e| StoreError::remote(format!("malformed FILER overlaps response: {e}")))
    }
}

#[async_trait]
impl RemoteTrackDataSource for FilerApiClient {
    async fn get_overlap_counts(
        &self,
        tracks: &[String],
        span: &Span,
        assembly: Assembly,
    ) -> Result<Vec<TrackOverlap>, StoreError> {
        if tracks.is_empty() {
            return Ok(Vec::new());
        }
        if tracks.len() <= MAX_TRACKS_FOR_FEATURE_COUNTING {
            let records = self.fetch_overlaps(tracks, span).await?;
            let mut counts: Vec<TrackOverlap> = records
                .into_iter()
                .map(|r| TrackOverlap::new(r.identifier, r.features.len() as u64))
                .collect();
            let returned: HashSet<String> = counts.iter().map(|c| c.track_id.clone()).collect();
            counts.extend(
                tracks
                    .iter()
                    .filter(|t| !returned.contains(*t))
                    .map(|t| TrackOverlap::new(t.clone(), 0)),
            );
            return Ok(counts);
        }

        let informative = self.get_informative_tracks(span, assembly).await?;
        let requested: HashSet<&str> = tracks.iter().map(String::as_str).collect();
        let mut counts: Vec<TrackOverlap> = informative
            .into_iter()
            .filter(|t| requested.contains(t.track_id.as_str()))
            .collect();
        let hit: HashSet<String> = counts.iter().map(|c| c.track_id.clone()).collect();
        counts.extend(
            tracks
                .iter()
                .filter(|t| !hit.contains(*t))
                .map(|t| TrackOverlap::new(t.clone(), 0)),
        );
        Ok(counts)
    }

    async fn get_overlap_features(
        &self,
        tracks: &[String],
        span: &Span,
        _assembly: Assembly,
    ) -> Result<Vec<TrackFeatures>, StoreError> {
        if tracks.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .fetch_overlaps(tracks, span)
            .await?
            .into_iter()
            .map(|r| TrackFeatures {
                track_id: r.identifier,
                features: r.features,
            })
            .collect())
    }

    async fn get_informative_tracks(
        &self,
        span: &Span,
        assembly: Assembly,
    ) -> Result<Vec<TrackOverlap>, StoreError> {
        let body = self
            .fetch(
                FilerEndpoint::InformativeTracks,
                &[
                    ("genomeBuild", assembly.filer_genome_build().to_string()),
                    ("region", span.to_string()),
                ],
            )
            .await?;
        let records: Vec<InformativeTrackRecord> = serde_json::from_value(body).map_err(|e| {
            StoreError::remote(format!("malformed FILER informative tracks response: {e}"))
        })?;
        Ok(records
            .into_iter()
            .map(|r| TrackOverlap::new(r.identifier, r.num_overlaps))
            .collect())
    }
}

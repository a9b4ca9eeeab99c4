// SPDX-License-Identifier: Apache-2.0

//! In-process collaborators for tests and local runs without a database or FILER.

use crate::filer::{RemoteTrackDataSource, TrackFeatures};
use crate::metadata::{FilterValueSummary, MetadataQuery, MetadataSession, MetadataStore};
use crate::{StoreError, StoreErrorCode};
use async_trait::async_trait;
use niagads_model::{Assembly, BedFeature, Collection, GenomeBuild, Span, Track, TrackOverlap};
use niagads_query::{FilterField, FilterOp, MetadataFilter, BIOSAMPLE_FIELDS};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
struct FakeMetadata {
    tracks: Vec<Track>,
    collections: Vec<(Collection, Vec<String>)>,
}

#[derive(Debug, Default)]
struct SessionCounters {
    checkouts: AtomicU64,
    active: AtomicU64,
}

/// Metadata store over an in-memory track list.
///
/// Keyword search matches `description` and `antibody_target`.
#[derive(Debug, Clone, Default)]
pub struct FakeMetadataStore {
    data: Arc<FakeMetadata>,
    counters: Arc<SessionCounters>,
}

impl FakeMetadataStore {
    #[must_use]
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            data: Arc::new(FakeMetadata {
                tracks,
                collections: Vec::new(),
            }),
            counters: Arc::default(),
        }
    }

    #[must_use]
    pub fn with_collection(self, name: &str, description: &str, track_ids: &[&str]) -> Self {
        let tracks = self.data.tracks.clone();
        let mut collections: Vec<(Collection, Vec<String>)> = self
            .data
            .collections
            .iter()
            .map(|(c, ids)| (c.clone(), ids.clone()))
            .collect();
        collections.push((
            Collection {
                name: name.to_string(),
                description: Some(description.to_string()),
                num_tracks: track_ids.len() as u64,
            },
            track_ids.iter().map(ToString::to_string).collect(),
        ));
        Self {
            data: Arc::new(FakeMetadata {
                tracks,
                collections,
            }),
            counters: self.counters,
        }
    }

    #[must_use]
    pub fn checkouts(&self) -> u64 {
        self.counters.checkouts.load(Ordering::SeqCst)
    }

    /// Sessions checked out and not yet dropped.
    #[must_use]
    pub fn active_sessions(&self) -> u64 {
        self.counters.active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataStore for FakeMetadataStore {
    async fn checkout(&self) -> Result<Box<dyn MetadataSession>, StoreError> {
        self.counters.checkouts.fetch_add(1, Ordering::SeqCst);
        self.counters.active.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            data: Arc::clone(&self.data),
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct FakeSession {
    data: Arc<FakeMetadata>,
    counters: Arc<SessionCounters>,
}

impl Drop for FakeSession {
    fn drop(&mut self) {
        self.counters.active.fetch_sub(1, Ordering::SeqCst);
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn column_value(track: &Track, field: FilterField) -> Option<&str> {
    match field {
        FilterField::Biosample => None,
        FilterField::Antibody => track.antibody_target.as_deref(),
        FilterField::Assay => track.assay.as_deref(),
        FilterField::Feature => track.feature_type.as_deref(),
        FilterField::Analysis => track.analysis.as_deref(),
        FilterField::Classification => track.classification.as_deref(),
        FilterField::Category => track.data_category.as_deref(),
        FilterField::Datasource => track.data_source.as_deref(),
    }
}

fn biosample_matches(track: &Track, value: &str) -> bool {
    let Some(characteristics) = track.biosample_characteristics.as_ref() else {
        return false;
    };
    BIOSAMPLE_FIELDS.iter().any(|key| {
        characteristics
            .get(*key)
            .and_then(Value::as_str)
            .is_some_and(|v| contains_ci(v, value))
    })
}

fn filter_matches(track: &Track, filter: &MetadataFilter) -> bool {
    if filter.field == FilterField::Biosample {
        let hit = biosample_matches(track, &filter.value);
        return match filter.op {
            FilterOp::Neq => !hit,
            FilterOp::Eq | FilterOp::Like => hit,
        };
    }
    // absent values never satisfy any operator, as with SQL NULL
    let Some(actual) = column_value(track, filter.field) else {
        return false;
    };
    match filter.op {
        FilterOp::Eq => actual == filter.value,
        FilterOp::Neq => actual != filter.value,
        FilterOp::Like => contains_ci(actual, &filter.value),
    }
}

fn query_matches(track: &Track, query: &MetadataQuery) -> bool {
    let assembly_ok = track
        .genome_build
        .as_deref()
        .and_then(|raw| Assembly::parse(raw).ok())
        == Some(query.assembly);
    let keyword_ok = match query.keyword.as_deref().map(str::trim) {
        Some(keyword) if !keyword.is_empty() => [&track.description, &track.antibody_target]
            .iter()
            .any(|v| v.as_deref().is_some_and(|v| contains_ci(v, keyword))),
        _ => true,
    };
    assembly_ok && keyword_ok && query.filters.iter().all(|f| filter_matches(track, f))
}

impl FakeSession {
    fn find(&self, track_id: &str) -> Option<&Track> {
        self.data.tracks.iter().find(|t| t.track_id == track_id)
    }

    fn sorted_matches(&self, query: &MetadataQuery) -> Vec<Track> {
        let mut hits: Vec<Track> = self
            .data
            .tracks
            .iter()
            .filter(|t| query_matches(t, query))
            .cloned()
            .collect();
        hits.sort_by(|a, b| a.track_id.cmp(&b.track_id));
        hits
    }
}

impl MetadataSession for FakeSession {
    fn validate_tracks(&mut self, tracks: &[String]) -> Result<(), StoreError> {
        let mut seen = BTreeSet::new();
        let missing: Vec<String> = tracks
            .iter()
            .filter(|t| self.find(t).is_none() && seen.insert(t.as_str()))
            .cloned()
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(StoreError::invalid_tracks(&missing))
        }
    }

    fn validate_collection(&mut self, name: &str) -> Result<i64, StoreError> {
        self.data
            .collections
            .iter()
            .position(|(c, _)| c.name.eq_ignore_ascii_case(name))
            .map(|idx| idx as i64 + 1)
            .ok_or_else(|| {
                StoreError::new(
                    StoreErrorCode::InvalidCollection,
                    format!("Invalid collection: {name}"),
                )
            })
    }

    fn get_genome_build(
        &mut self,
        tracks: &[String],
        validate: bool,
    ) -> Result<GenomeBuild, StoreError> {
        if tracks.is_empty() {
            return Err(StoreError::new(
                StoreErrorCode::InvalidTrackId,
                "no track identifiers provided",
            ));
        }
        if validate {
            self.validate_tracks(tracks)?;
        }
        let mut builds = BTreeMap::new();
        for track in tracks.iter().filter_map(|t| self.find(t)) {
            let assembly = track
                .genome_build
                .as_deref()
                .and_then(|raw| Assembly::parse(raw).ok())
                .ok_or_else(|| {
                    StoreError::new(
                        StoreErrorCode::Database,
                        format!("track {} has no recognized genome build", track.track_id),
                    )
                })?;
            builds.insert(track.track_id.clone(), assembly);
        }
        let mut distinct = builds
            .values()
            .copied()
            .collect::<BTreeSet<Assembly>>()
            .into_iter();
        match (distinct.next(), distinct.next()) {
            (None, _) => Err(StoreError::invalid_tracks(tracks)),
            (Some(assembly), None) => Ok(GenomeBuild::Single(assembly)),
            _ => Ok(GenomeBuild::Mixed(builds)),
        }
    }

    fn get_track_metadata(
        &mut self,
        tracks: &[String],
        validate: bool,
    ) -> Result<Vec<Track>, StoreError> {
        if validate {
            self.validate_tracks(tracks)?;
        }
        let wanted: BTreeSet<&str> = tracks.iter().map(String::as_str).collect();
        let mut found: Vec<Track> = self
            .data
            .tracks
            .iter()
            .filter(|t| wanted.contains(t.track_id.as_str()))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.track_id.cmp(&b.track_id));
        Ok(found)
    }

    fn get_collection_track_metadata(&mut self, name: &str) -> Result<Vec<Track>, StoreError> {
        let idx = self.validate_collection(name)?;
        let ids = usize::try_from(idx - 1)
            .ok()
            .and_then(|i| self.data.collections.get(i))
            .map(|(_, ids)| ids.clone())
            .unwrap_or_default();
        self.get_track_metadata(&ids, false)
    }

    fn get_collections(&mut self) -> Result<Vec<Collection>, StoreError> {
        Ok(self
            .data
            .collections
            .iter()
            .map(|(c, _)| c.clone())
            .collect())
    }

    fn query_track_metadata(&mut self, query: &MetadataQuery) -> Result<Vec<Track>, StoreError> {
        let offset = usize::try_from(query.offset.unwrap_or(0)).unwrap_or(usize::MAX);
        let limit = query
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        Ok(self
            .sorted_matches(query)
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect())
    }

    fn count_track_metadata(&mut self, query: &MetadataQuery) -> Result<u64, StoreError> {
        Ok(self.sorted_matches(query).len() as u64)
    }

    fn get_track_filter_summary(
        &mut self,
        field: FilterField,
        include_counts: bool,
    ) -> Result<Vec<FilterValueSummary>, StoreError> {
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for track in &self.data.tracks {
            let value = if field == FilterField::Biosample {
                track
                    .biosample_characteristics
                    .as_ref()
                    .and_then(|b| b.get("tissue_category"))
                    .and_then(Value::as_str)
            } else {
                column_value(track, field)
            };
            if let Some(value) = value {
                *counts.entry(value.to_string()).or_default() += 1;
            }
        }
        Ok(counts
            .into_iter()
            .map(|(value, n)| FilterValueSummary {
                value,
                num_tracks: include_counts.then_some(n),
            })
            .collect())
    }
}

#[derive(Debug, Default)]
struct FakeTrackData {
    /// Insertion order doubles as the informative-track order.
    features: Vec<(String, Vec<BedFeature>)>,
    latency: HashMap<String, Duration>,
}

/// Remote source serving canned features, ignoring the assembly.
#[derive(Debug, Clone, Default)]
pub struct FakeTrackDataSource {
    data: Arc<Mutex<FakeTrackData>>,
    batches: Arc<Mutex<Vec<Vec<String>>>>,
    informative_calls: Arc<AtomicU64>,
    failing: Arc<AtomicBool>,
}

impl FakeTrackDataSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `features` for `track_id`; only those overlapping the queried span are served.
    #[must_use]
    pub fn with_track(self, track_id: &str, features: Vec<BedFeature>) -> Self {
        if let Ok(mut data) = self.data.lock() {
            data.features.push((track_id.to_string(), features));
        }
        self
    }

    /// Delays any batch that contains `track_id`.
    #[must_use]
    pub fn with_latency(self, track_id: &str, delay: Duration) -> Self {
        if let Ok(mut data) = self.data.lock() {
            data.latency.insert(track_id.to_string(), delay);
        }
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Track batches received by feature and count requests, in arrival order.
    #[must_use]
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().map(|b| b.clone()).unwrap_or_default()
    }

    #[must_use]
    pub fn informative_calls(&self) -> u64 {
        self.informative_calls.load(Ordering::SeqCst)
    }

    fn check_failing(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::remote("FILER error: service unavailable"))
        } else {
            Ok(())
        }
    }

    fn overlapping(&self, span: &Span) -> Vec<(String, Vec<BedFeature>)> {
        let Ok(data) = self.data.lock() else {
            return Vec::new();
        };
        let start = i64::try_from(span.start).unwrap_or(i64::MAX);
        let end = i64::try_from(span.end).unwrap_or(i64::MAX);
        data.features
            .iter()
            .map(|(track_id, features)| {
                let hits = features
                    .iter()
                    .filter(|f| {
                        f.chrom == span.chromosome.as_str()
                            && f.chrom_start <= end
                            && f.chrom_end >= start
                    })
                    .cloned()
                    .collect();
                (track_id.clone(), hits)
            })
            .collect()
    }

    async fn record_batch(&self, tracks: &[String]) -> Result<(), StoreError> {
        let delay = self
            .data
            .lock()
            .ok()
            .and_then(|d| tracks.iter().filter_map(|t| d.latency.get(t)).max().copied());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Ok(mut batches) = self.batches.lock() {
            batches.push(tracks.to_vec());
        }
        self.check_failing()
    }
}

#[async_trait]
impl RemoteTrackDataSource for FakeTrackDataSource {
    async fn get_overlap_counts(
        &self,
        tracks: &[String],
        span: &Span,
        _assembly: Assembly,
    ) -> Result<Vec<TrackOverlap>, StoreError> {
        self.record_batch(tracks).await?;
        let served: HashMap<String, usize> = self
            .overlapping(span)
            .into_iter()
            .map(|(id, hits)| (id, hits.len()))
            .collect();
        Ok(tracks
            .iter()
            .map(|t| TrackOverlap::new(t.clone(), served.get(t).copied().unwrap_or(0) as u64))
            .collect())
    }

    async fn get_overlap_features(
        &self,
        tracks: &[String],
        span: &Span,
        _assembly: Assembly,
    ) -> Result<Vec<TrackFeatures>, StoreError> {
        self.record_batch(tracks).await?;
        let wanted: BTreeSet<&str> = tracks.iter().map(String::as_str).collect();
        Ok(self
            .overlapping(span)
            .into_iter()
            .filter(|(id, _)| wanted.contains(id.as_str()))
            .map(|(track_id, features)| TrackFeatures { track_id, features })
            .collect())
    }

    async fn get_informative_tracks(
        &self,
        span: &Span,
        _assembly: Assembly,
    ) -> Result<Vec<TrackOverlap>, StoreError> {
        self.informative_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failing()?;
        Ok(self
            .overlapping(span)
            .into_iter()
            .filter(|(_, hits)| !hits.is_empty())
            .map(|(id, hits)| TrackOverlap::new(id, hits.len() as u64))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str, build: &str, assay: &str) -> Track {
        serde_json::from_value(serde_json::json!({
            "track_id": id,
            "description": null,
            "genome_build": build,
            "biosample_characteristics": {"tissue_category": "Brain", "biosample_term": "astrocyte"},
            "assay": assay
        }))
        .expect("track fixture")
    }

    #[tokio::test]
    async fn sessions_release_on_drop() {
        let store = FakeMetadataStore::new(vec![track("NGEN1", "GRCh38", "ChIP-seq")]);
        {
            let mut session = store.checkout().await.expect("checkout");
            assert_eq!(store.active_sessions(), 1);
            session
                .validate_tracks(&["NGEN1".to_string()])
                .expect("known track");
        }
        assert_eq!(store.active_sessions(), 0);
        assert_eq!(store.checkouts(), 1);
    }

    #[tokio::test]
    async fn biosample_neq_excludes_any_key_match() {
        let store = FakeMetadataStore::new(vec![
            track("NGEN1", "GRCh38", "ChIP-seq"),
            track("NGEN2", "hg19", "DNase-seq"),
        ]);
        let mut session = store.checkout().await.expect("checkout");
        let mut query = MetadataQuery::new(Assembly::GRCh38);
        query.filters = niagads_query::parse_filter_expression("biosample neq astro")
            .expect("filter");
        assert!(session.query_track_metadata(&query).expect("query").is_empty());
        query.filters.clear();
        assert_eq!(session.count_track_metadata(&query).expect("count"), 1);
    }

    #[tokio::test]
    async fn informative_tracks_follow_registration_order() {
        let feature = |start: i64| BedFeature {
            chrom: "chr1".to_string(),
            chrom_start: start,
            chrom_end: start + 10,
            name: None,
            score: None,
            strand: None,
            track_id: None,
            extras: serde_json::Map::new(),
        };
        let source = FakeTrackDataSource::new()
            .with_track("B", vec![feature(100)])
            .with_track("A", vec![feature(100), feature(200)])
            .with_track("C", vec![feature(9_000)]);
        let span = Span::parse("chr1:1-1000").expect("span");
        let informative = source
            .get_informative_tracks(&span, Assembly::GRCh38)
            .await
            .expect("informative");
        assert_eq!(
            informative,
            vec![TrackOverlap::new("B", 1), TrackOverlap::new("A", 2)]
        );
    }
}

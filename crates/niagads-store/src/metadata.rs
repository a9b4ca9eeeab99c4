// SPDX-License-Identifier: Apache-2.0

use crate::StoreError;
use async_trait::async_trait;
use niagads_model::{Assembly, Collection, GenomeBuild, Track};
use niagads_query::{FilterField, MetadataFilter};
use serde::{Deserialize, Serialize};

/// Metadata search restricted to one assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataQuery {
    pub assembly: Assembly,
    pub filters: Vec<MetadataFilter>,
    pub keyword: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl MetadataQuery {
    #[must_use]
    pub fn new(assembly: Assembly) -> Self {
        Self {
            assembly,
            filters: Vec::new(),
            keyword: None,
            limit: None,
            offset: None,
        }
    }
}

/// Distinct values of a filter field, optionally with track counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterValueSummary {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_tracks: Option<u64>,
}

/// A checked-out metadata connection. Held for one request and released on drop.
pub trait MetadataSession: Send {
    fn validate_tracks(&mut self, tracks: &[String]) -> Result<(), StoreError>;

    fn validate_collection(&mut self, name: &str) -> Result<i64, StoreError>;

    /// `Mixed` when the tracks span more than one assembly.
    fn get_genome_build(&mut self, tracks: &[String], validate: bool)
        -> Result<GenomeBuild, StoreError>;

    /// Metadata for `tracks`, ordered by track id.
    fn get_track_metadata(&mut self, tracks: &[String], validate: bool)
        -> Result<Vec<Track>, StoreError>;

    fn get_collection_track_metadata(&mut self, name: &str) -> Result<Vec<Track>, StoreError>;

    fn get_collections(&mut self) -> Result<Vec<Collection>, StoreError>;

    fn query_track_metadata(&mut self, query: &MetadataQuery) -> Result<Vec<Track>, StoreError>;

    fn count_track_metadata(&mut self, query: &MetadataQuery) -> Result<u64, StoreError>;

    fn get_track_filter_summary(
        &mut self,
        field: FilterField,
        include_counts: bool,
    ) -> Result<Vec<FilterValueSummary>, StoreError>;
}

#[async_trait]
pub trait MetadataStore: Send + Sync + 'static {
    async fn checkout(&self) -> Result<Box<dyn MetadataSession>, StoreError>;
}

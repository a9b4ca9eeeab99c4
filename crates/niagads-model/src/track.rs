// SPDX-License-Identifier: Apache-2.0

use crate::Assembly;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Hit count of one track for a span and assembly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackOverlap {
    pub track_id: String,
    pub num_overlaps: u64,
}

impl TrackOverlap {
    #[must_use]
    pub fn new(track_id: impl Into<String>, num_overlaps: u64) -> Self {
        Self {
            track_id: track_id.into(),
            num_overlaps,
        }
    }
}

/// Assemblies a set of tracks belongs to. `Mixed` is an error condition for data queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenomeBuild {
    Single(Assembly),
    Mixed(BTreeMap<String, Assembly>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub track_id: String,
    pub description: Option<String>,
    pub genome_build: Option<String>,
    pub feature_type: Option<String>,
    pub biosample_characteristics: Option<Value>,
    pub biological_replicates: Option<String>,
    pub technical_replicates: Option<String>,
    pub antibody_target: Option<String>,
    pub assay: Option<String>,
    pub analysis: Option<String>,
    pub classification: Option<String>,
    pub data_category: Option<String>,
    pub output_type: Option<String>,
    pub is_lifted: Option<bool>,
    pub experiment_info: Option<String>,
    pub data_source: Option<String>,
    pub data_source_version: Option<String>,
    pub download_url: Option<String>,
    pub download_date: Option<String>,
    pub release_date: Option<String>,
    pub experiment_id: Option<String>,
    pub project: Option<String>,
    pub file_name: Option<String>,
    pub url: Option<String>,
    pub md5sum: Option<String>,
    pub bp_covered: Option<i64>,
    pub number_of_intervals: Option<i64>,
    pub file_size: Option<i64>,
    pub file_format: Option<String>,
    pub file_schema: Option<String>,
    pub is_shard: Option<bool>,
    pub shard_parent_track_id: Option<String>,
}

impl Track {
    #[must_use]
    pub fn index_url(&self) -> Option<String> {
        self.url.as_ref().map(|u| format!("{u}.tbi"))
    }
}

/// Track metadata joined with its hit count, the row type of summary pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSummary {
    pub track_id: String,
    pub description: Option<String>,
    pub genome_build: Option<String>,
    pub feature_type: Option<String>,
    pub biosample: Option<String>,
    pub antibody_target: Option<String>,
    pub assay: Option<String>,
    pub data_source: Option<String>,
    pub data_category: Option<String>,
    pub url: Option<String>,
    pub num_overlaps: Option<u64>,
}

impl TrackSummary {
    #[must_use]
    pub fn from_track(track: &Track, num_overlaps: Option<u64>) -> Self {
        let biosample = track
            .biosample_characteristics
            .as_ref()
            .and_then(|b| b.get("biosample_display").or_else(|| b.get("biosample_term")))
            .and_then(Value::as_str)
            .map(ToString::to_string);
        Self {
            track_id: track.track_id.clone(),
            description: track.description.clone(),
            genome_build: track.genome_build.clone(),
            feature_type: track.feature_type.clone(),
            biosample,
            antibody_target: track.antibody_target.clone(),
            assay: track.assay.clone(),
            data_source: track.data_source.clone(),
            data_category: track.data_category.clone(),
            url: track.url.clone(),
            num_overlaps,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub name: String,
    pub description: Option<String>,
    pub num_tracks: u64,
}

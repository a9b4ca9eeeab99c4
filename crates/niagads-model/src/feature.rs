// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One BED record returned by the remote source. Columns beyond the six BED
/// basics are kept in `extras` in key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BedFeature {
    pub chrom: String,
    #[serde(rename = "chromStart")]
    pub chrom_start: i64,
    #[serde(rename = "chromEnd")]
    pub chrom_end: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub score: Option<Value>,
    #[serde(default)]
    pub strand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_id: Option<String>,
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

impl BedFeature {
    #[must_use]
    pub fn with_track(mut self, track_id: &str) -> Self {
        self.track_id = Some(track_id.to_string());
        self
    }
}

// SPDX-License-Identifier: Apache-2.0

use crate::{BedFeature, Track, TrackOverlap, TrackSummary};
use serde_json::Value;

const NULL_STR: &str = ".";

/// Tab-delimited rendering for TEXT and BED responses.
pub trait TextRow {
    fn field_names(&self) -> Vec<String>;
    fn text_row(&self) -> String;
}

/// Header line (from the first row) followed by one line per row. No rows, no output.
#[must_use]
pub fn render_text<T: TextRow>(rows: &[T], include_header: bool) -> String {
    let mut out = String::new();
    if let (true, Some(first)) = (include_header, rows.first()) {
        out.push('#');
        out.push_str(&first.field_names().join("\t"));
        out.push('\n');
    }
    for row in rows {
        out.push_str(&row.text_row());
        out.push('\n');
    }
    out
}

fn text_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => NULL_STR.to_string(),
        Some(Value::String(s)) if s.is_empty() => NULL_STR.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn text_opt(value: Option<&str>) -> String {
    value.filter(|v| !v.is_empty()).unwrap_or(NULL_STR).to_string()
}

impl TextRow for BedFeature {
    fn field_names(&self) -> Vec<String> {
        let mut names: Vec<String> = ["chrom", "chromStart", "chromEnd", "name", "score", "strand"]
            .iter()
            .map(ToString::to_string)
            .collect();
        names.extend(self.extras.keys().cloned());
        names.push("track_id".to_string());
        names
    }

    fn text_row(&self) -> String {
        let mut cols = vec![
            self.chrom.clone(),
            self.chrom_start.to_string(),
            self.chrom_end.to_string(),
            text_opt(self.name.as_deref()),
            text_value(self.score.as_ref()),
            text_opt(self.strand.as_deref()),
        ];
        cols.extend(self.extras.values().map(|v| text_value(Some(v))));
        cols.push(text_opt(self.track_id.as_deref()));
        cols.join("\t")
    }
}

impl TextRow for TrackOverlap {
    fn field_names(&self) -> Vec<String> {
        vec!["track_id".to_string(), "num_overlaps".to_string()]
    }

    fn text_row(&self) -> String {
        format!("{}\t{}", self.track_id, self.num_overlaps)
    }
}

impl TextRow for String {
    fn field_names(&self) -> Vec<String> {
        vec!["value".to_string()]
    }

    fn text_row(&self) -> String {
        self.clone()
    }
}

impl TextRow for TrackSummary {
    fn field_names(&self) -> Vec<String> {
        [
            "track_id",
            "description",
            "genome_build",
            "feature_type",
            "biosample",
            "antibody_target",
            "assay",
            "data_source",
            "data_category",
            "url",
            "num_overlaps",
        ]
        .iter()
        .map(ToString::to_string)
        .collect()
    }

    fn text_row(&self) -> String {
        [
            self.track_id.clone(),
            text_opt(self.description.as_deref()),
            text_opt(self.genome_build.as_deref()),
            text_opt(self.feature_type.as_deref()),
            text_opt(self.biosample.as_deref()),
            text_opt(self.antibody_target.as_deref()),
            text_opt(self.assay.as_deref()),
            text_opt(self.data_source.as_deref()),
            text_opt(self.data_category.as_deref()),
            text_opt(self.url.as_deref()),
            self.num_overlaps
                .map_or_else(|| NULL_STR.to_string(), |n| n.to_string()),
        ]
        .join("\t")
    }
}

impl TextRow for Track {
    fn field_names(&self) -> Vec<String> {
        [
            "track_id",
            "description",
            "genome_build",
            "feature_type",
            "biosample_characteristics",
            "antibody_target",
            "assay",
            "analysis",
            "classification",
            "data_category",
            "output_type",
            "data_source",
            "data_source_version",
            "project",
            "file_name",
            "url",
        ]
        .iter()
        .map(ToString::to_string)
        .collect()
    }

    fn text_row(&self) -> String {
        [
            self.track_id.clone(),
            text_opt(self.description.as_deref()),
            text_opt(self.genome_build.as_deref()),
            text_opt(self.feature_type.as_deref()),
            text_value(self.biosample_characteristics.as_ref()),
            text_opt(self.antibody_target.as_deref()),
            text_opt(self.assay.as_deref()),
            text_opt(self.analysis.as_deref()),
            text_opt(self.classification.as_deref()),
            text_opt(self.data_category.as_deref()),
            text_opt(self.output_type.as_deref()),
            text_opt(self.data_source.as_deref()),
            text_opt(self.data_source_version.as_deref()),
            text_opt(self.project.as_deref()),
            text_opt(self.file_name.as_deref()),
            text_opt(self.url.as_deref()),
        ]
        .join("\t")
    }
}

// SPDX-License-Identifier: Apache-2.0

//! Typed parameter sets, one per route family, parsed from the raw query map.

use crate::errors::{ApiError, ApiErrorCode};
use niagads_model::{Assembly, Chromosome, ResponseContent, ResponseFormat, ResponseView, Span};
use niagads_query::{parse_filter_expression, FilterField, MetadataFilter};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

pub const MAX_KEYWORD_BYTES: usize = 256;

/// Formats served by track data routes; VCF is reserved for variant routes.
pub const DATA_FORMATS: [ResponseFormat; 3] =
    [ResponseFormat::Json, ResponseFormat::Text, ResponseFormat::Bed];
pub const METADATA_FORMATS: [ResponseFormat; 2] = [ResponseFormat::Json, ResponseFormat::Text];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseConfiguration {
    pub content: ResponseContent,
    pub format: ResponseFormat,
    pub view: ResponseView,
}

impl Default for ResponseConfiguration {
    fn default() -> Self {
        Self {
            content: ResponseContent::Full,
            format: ResponseFormat::Json,
            view: ResponseView::Default,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackDataParameters {
    pub tracks: Vec<String>,
    pub span: Span,
    pub page: u64,
    pub response: ResponseConfiguration,
}

/// Sequence feature named by `loc`: a span, a positional variant
/// `chr:pos:ref:alt`, a refSNP id, or anything else taken as a gene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureLocation {
    Span(Span),
    Variant { id: String, span: Span },
    RefSnp(String),
    Gene(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QtlParameters {
    pub track: String,
    pub location: FeatureLocation,
    pub page: u64,
    pub response: ResponseConfiguration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchDataParameters {
    pub assembly: Assembly,
    pub span: Span,
    pub filters: Vec<MetadataFilter>,
    pub keyword: Option<String>,
    pub page: u64,
    pub response: ResponseConfiguration,
}

impl SearchDataParameters {
    #[must_use]
    pub fn has_metadata_filters(&self) -> bool {
        !self.filters.is_empty() || self.keyword.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataSearchParameters {
    pub assembly: Assembly,
    pub filters: Vec<MetadataFilter>,
    pub keyword: Option<String>,
    pub page: u64,
    pub response: ResponseConfiguration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackMetadataParameters {
    pub tracks: Vec<String>,
    pub response: ResponseConfiguration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionParameters {
    pub collection: String,
    pub page: u64,
    pub response: ResponseConfiguration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterSummaryParameters {
    pub field: FilterField,
    pub include_counts: bool,
}

fn non_empty<'a>(query: &'a BTreeMap<String, String>, name: &str) -> Option<&'a str> {
    query
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

/// `page` defaults to 1 and must be a positive integer.
pub fn parse_page(query: &BTreeMap<String, String>) -> Result<u64, ApiError> {
    let Some(raw) = non_empty(query, "page") else {
        return Ok(1);
    };
    match raw.parse::<u64>() {
        Ok(page) if page > 0 => Ok(page),
        _ => Err(ApiError::invalid_param(
            "page",
            raw,
            "Pages should be positive integers",
        )),
    }
}

pub fn parse_response_configuration(
    query: &BTreeMap<String, String>,
    allowed_content: &[ResponseContent],
    allowed_formats: &[ResponseFormat],
) -> Result<ResponseConfiguration, ApiError> {
    let mut config = ResponseConfiguration::default();
    if let Some(raw) = non_empty(query, "content") {
        config.content = ResponseContent::parse(raw)
            .ok()
            .filter(|c| allowed_content.contains(c))
            .ok_or_else(|| {
                ApiError::invalid_param("content", raw, allowed_list(allowed_content, |c| c.as_str()))
            })?;
    }
    if let Some(raw) = non_empty(query, "format") {
        config.format = ResponseFormat::parse(raw)
            .ok()
            .filter(|f| allowed_formats.contains(f))
            .ok_or_else(|| {
                ApiError::invalid_param("format", raw, allowed_list(allowed_formats, |f| f.as_str()))
            })?;
    }
    if let Some(raw) = non_empty(query, "view") {
        config.view = ResponseView::parse(raw).map_err(|_| {
            ApiError::invalid_param("view", raw, allowed_list(ResponseView::ALL, |v| v.as_str()))
        })?;
        if config.view != ResponseView::Default {
            return Err(ApiError::invalid_param(
                "view",
                raw,
                "Only the DEFAULT view is supported",
            ));
        }
    }
    Ok(config)
}

fn allowed_list<T: Copy>(values: &[T], name: impl Fn(T) -> &'static str) -> String {
    let names: Vec<&str> = values.iter().map(|v| name(*v)).collect();
    format!("Allowed values are: {}", names.join(", "))
}

fn track_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("valid regex"))
}

/// Comma-separated identifiers; duplicates are dropped keeping first occurrence.
fn parse_track_list(query: &BTreeMap<String, String>) -> Result<Vec<String>, ApiError> {
    let raw = non_empty(query, "track").ok_or_else(|| ApiError::missing_param("track"))?;
    let mut seen = BTreeSet::new();
    let mut tracks = Vec::new();
    for id in raw.split(',').map(str::trim).filter(|id| !id.is_empty()) {
        let id = valid_track_id(id)?;
        if seen.insert(id.clone()) {
            tracks.push(id);
        }
    }
    if tracks.is_empty() {
        return Err(ApiError::missing_param("track"));
    }
    Ok(tracks)
}

fn valid_track_id(id: &str) -> Result<String, ApiError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ApiError::missing_param("track"));
    }
    if !track_id_pattern().is_match(id) {
        return Err(ApiError::invalid_param("track", id, "Malformed track identifier"));
    }
    Ok(id.to_string())
}

fn ref_snp_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)^rs\d+$").expect("valid regex"))
}

/// A variant occupies the single base ending at `pos`.
fn parse_variant(raw: &str) -> Option<FeatureLocation> {
    let mut parts = raw.split(':');
    let (chrom, pos, reference, alt) = (parts.next()?, parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let is_allele = |s: &str| !s.is_empty() && s.bytes().all(|b| b"ACGTacgt".contains(&b));
    if !is_allele(reference) || !is_allele(alt) || !pos.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let chromosome = Chromosome::parse(chrom).ok()?;
    let end = pos.parse::<u64>().ok().filter(|p| *p > 0)?;
    let id = format!(
        "{}:{end}:{}:{}",
        chromosome.as_str(),
        reference.to_ascii_uppercase(),
        alt.to_ascii_uppercase()
    );
    Some(FeatureLocation::Variant {
        id,
        span: Span {
            chromosome,
            start: end - 1,
            end,
        },
    })
}

/// Spans win over variants, variants over refSNP ids; the rest are genes.
pub fn parse_feature_location(raw: &str) -> Result<FeatureLocation, ApiError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ApiError::missing_param("loc"));
    }
    if let Ok(span) = Span::parse(raw) {
        return Ok(FeatureLocation::Span(span));
    }
    if let Some(variant) = parse_variant(raw) {
        return Ok(variant);
    }
    if ref_snp_pattern().is_match(raw) {
        return Ok(FeatureLocation::RefSnp(raw.to_ascii_lowercase()));
    }
    if raw.contains(':') {
        return Err(ApiError::invalid_param(
            "loc",
            raw,
            "Expected a gene, a refSNP id, chr:pos:ref:alt, or chrN:start-end",
        ));
    }
    Ok(FeatureLocation::Gene(raw.to_string()))
}

fn parse_span(query: &BTreeMap<String, String>) -> Result<Span, ApiError> {
    let raw = non_empty(query, "span").ok_or_else(|| ApiError::missing_param("span"))?;
    Span::parse(raw).map_err(|e| ApiError::invalid_span(raw, e.to_string()))
}

fn parse_assembly(query: &BTreeMap<String, String>) -> Result<Assembly, ApiError> {
    match non_empty(query, "assembly") {
        None => Ok(Assembly::GRCh38),
        Some(raw) => Assembly::parse(raw).map_err(|_| {
            ApiError::invalid_param("assembly", raw, "Allowed values are: GRCh37, GRCh38, hg19, hg38")
        }),
    }
}

fn parse_filters(query: &BTreeMap<String, String>) -> Result<Vec<MetadataFilter>, ApiError> {
    match non_empty(query, "filter") {
        None => Ok(Vec::new()),
        Some(raw) => {
            parse_filter_expression(raw).map_err(|e| ApiError::invalid_filter(raw, e.to_string()))
        }
    }
}

/// Keywords are matched as text; markup characters are escaped.
fn parse_keyword(query: &BTreeMap<String, String>) -> Result<Option<String>, ApiError> {
    let Some(raw) = non_empty(query, "keyword") else {
        return Ok(None);
    };
    if raw.len() > MAX_KEYWORD_BYTES {
        return Err(ApiError::invalid_param(
            "keyword",
            raw,
            format!("Keywords are limited to {MAX_KEYWORD_BYTES} bytes"),
        ));
    }
    let mut cleaned = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => cleaned.push_str("&amp;"),
            '<' => cleaned.push_str("&lt;"),
            '>' => cleaned.push_str("&gt;"),
            '"' => cleaned.push_str("&quot;"),
            '\'' => cleaned.push_str("&#39;"),
            c if c.is_control() => {}
            c => cleaned.push(c),
        }
    }
    Ok(Some(cleaned))
}

pub fn parse_track_data_params(
    query: &BTreeMap<String, String>,
) -> Result<TrackDataParameters, ApiError> {
    Ok(TrackDataParameters {
        tracks: parse_track_list(query)?,
        span: parse_span(query)?,
        page: parse_page(query)?,
        response: parse_response_configuration(query, ResponseContent::ALL, &DATA_FORMATS)?,
    })
}

pub fn parse_qtl_params(
    track: &str,
    query: &BTreeMap<String, String>,
) -> Result<QtlParameters, ApiError> {
    let loc = non_empty(query, "loc").ok_or_else(|| ApiError::missing_param("loc"))?;
    Ok(QtlParameters {
        track: valid_track_id(track)?,
        location: parse_feature_location(loc)?,
        page: parse_page(query)?,
        response: parse_response_configuration(query, ResponseContent::ALL, &DATA_FORMATS)?,
    })
}

/// Filter and keyword are optional; without them every informative track qualifies.
pub fn parse_search_data_params(
    query: &BTreeMap<String, String>,
) -> Result<SearchDataParameters, ApiError> {
    Ok(SearchDataParameters {
        assembly: parse_assembly(query)?,
        span: parse_span(query)?,
        filters: parse_filters(query)?,
        keyword: parse_keyword(query)?,
        page: parse_page(query)?,
        response: parse_response_configuration(query, ResponseContent::ALL, &DATA_FORMATS)?,
    })
}

pub fn parse_metadata_search_params(
    query: &BTreeMap<String, String>,
) -> Result<MetadataSearchParameters, ApiError> {
    let filters = parse_filters(query)?;
    let keyword = parse_keyword(query)?;
    if filters.is_empty() && keyword.is_none() {
        return Err(ApiError::new(
            ApiErrorCode::InvalidParameter,
            "must specify either a `filter` and/or a `keyword` to search",
            serde_json::json!({"parameter": ["filter", "keyword"], "reason": "missing"}),
            "req-unknown",
        ));
    }
    let response = metadata_response(query)?;
    Ok(MetadataSearchParameters {
        assembly: parse_assembly(query)?,
        filters,
        keyword,
        page: parse_page(query)?,
        response,
    })
}

/// Counts of metadata queries are a single number and have no text rendering.
fn metadata_response(query: &BTreeMap<String, String>) -> Result<ResponseConfiguration, ApiError> {
    let response = parse_response_configuration(query, ResponseContent::ALL, &METADATA_FORMATS)?;
    if response.content == ResponseContent::Counts && response.format != ResponseFormat::Json {
        return Err(ApiError::invalid_param(
            "format",
            response.format.as_str(),
            "COUNTS content is only available as JSON",
        ));
    }
    Ok(response)
}

pub fn parse_track_metadata_params(
    query: &BTreeMap<String, String>,
) -> Result<TrackMetadataParameters, ApiError> {
    Ok(TrackMetadataParameters {
        tracks: parse_track_list(query)?,
        response: metadata_response(query)?,
    })
}

pub fn parse_collection_params(
    collection: &str,
    query: &BTreeMap<String, String>,
) -> Result<CollectionParameters, ApiError> {
    let collection = collection.trim();
    if collection.is_empty() {
        return Err(ApiError::missing_param("collection"));
    }
    Ok(CollectionParameters {
        collection: collection.to_string(),
        page: parse_page(query)?,
        response: metadata_response(query)?,
    })
}

pub fn parse_filter_summary_params(
    field: &str,
    query: &BTreeMap<String, String>,
) -> Result<FilterSummaryParameters, ApiError> {
    let field = FilterField::parse(field.trim()).ok_or_else(|| {
        ApiError::invalid_param(
            "field",
            field,
            allowed_list(&FilterField::ALL, |f| f.as_str()),
        )
    })?;
    let include_counts = match non_empty(query, "counts") {
        None => false,
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            _ => return Err(ApiError::invalid_param("counts", raw, "Expected a boolean")),
        },
    };
    Ok(FilterSummaryParameters {
        field,
        include_counts,
    })
}

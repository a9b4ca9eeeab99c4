// SPDX-License-Identifier: Apache-2.0

use niagads_api::{
    map_error, parse_collection_params, parse_filter_summary_params, parse_metadata_search_params,
    parse_page, parse_search_data_params, parse_track_data_params, parse_track_metadata_params,
    ApiError, ApiErrorCode,
};
use niagads_model::{Assembly, ResponseContent, ResponseFormat};
use niagads_query::FilterField;
use std::collections::BTreeMap;

fn query(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

#[test]
fn track_data_defaults_to_full_json_page_one() {
    let params = parse_track_data_params(&query(&[
        ("track", "NGEN000611,NGEN000612"),
        ("span", "19:1038997-1066572"),
    ]))
    .expect("params");
    assert_eq!(params.tracks, vec!["NGEN000611", "NGEN000612"]);
    assert_eq!(params.span.to_string(), "chr19:1038997-1066572");
    assert_eq!(params.page, 1);
    assert_eq!(params.response.content, ResponseContent::Full);
    assert_eq!(params.response.format, ResponseFormat::Json);
}

#[test]
fn page_must_be_a_positive_integer() {
    for bad in ["0", "-1", "two", "1.5"] {
        let err = parse_page(&query(&[("page", bad)])).expect_err(bad);
        assert_eq!(err.code, ApiErrorCode::InvalidParameter);
        assert_eq!(map_error(&err).status_code, 400);
    }
    assert_eq!(parse_page(&query(&[("page", "3")])).expect("page"), 3);
}

#[test]
fn spans_are_validated_with_a_readable_message() {
    let err = parse_track_data_params(&query(&[("track", "T1"), ("span", "chr99:1-10")]))
        .expect_err("bad chromosome");
    assert_eq!(err.code, ApiErrorCode::InvalidSpan);
    assert!(err.message.contains("chr99:1-10"));

    let err = parse_track_data_params(&query(&[("track", "T1"), ("span", "chr1:10-1")]))
        .expect_err("inverted span");
    assert_eq!(err.code, ApiErrorCode::InvalidSpan);
}

#[test]
fn non_default_views_and_unknown_formats_are_rejected() {
    let base = [("track", "T1"), ("span", "1:1-10")];
    let mut with_view = base.to_vec();
    with_view.push(("view", "table"));
    let err = parse_track_data_params(&query(&with_view)).expect_err("table view");
    assert_eq!(err.details["parameter"], "view");

    let mut with_vcf = base.to_vec();
    with_vcf.push(("format", "vcf"));
    assert!(parse_track_data_params(&query(&with_vcf)).is_err());

    let mut with_bed = base.to_vec();
    with_bed.push(("format", "bed"));
    let params = parse_track_data_params(&query(&with_bed)).expect("bed");
    assert_eq!(params.response.format, ResponseFormat::Bed);
}

#[test]
fn metadata_counts_require_json() {
    let err = parse_track_metadata_params(&query(&[
        ("track", "T1"),
        ("content", "counts"),
        ("format", "text"),
    ]))
    .expect_err("text counts");
    assert_eq!(err.code, ApiErrorCode::InvalidParameter);
    assert!(parse_metadata_search_params(&query(&[("keyword", "brain"), ("format", "bed")])).is_err());
}

#[test]
fn metadata_search_needs_a_filter_or_keyword() {
    let err = parse_metadata_search_params(&query(&[("assembly", "hg19")])).expect_err("no criteria");
    assert_eq!(err.code, ApiErrorCode::InvalidParameter);

    let params = parse_metadata_search_params(&query(&[
        ("assembly", "hg19"),
        ("filter", "assay eq ChIP-seq"),
    ]))
    .expect("params");
    assert_eq!(params.assembly, Assembly::GRCh37);
    assert_eq!(params.filters.len(), 1);
}

#[test]
fn search_data_accepts_missing_criteria_and_rejects_bad_filters() {
    let params = parse_search_data_params(&query(&[("span", "chr1:1-100")])).expect("params");
    assert!(!params.has_metadata_filters());
    assert_eq!(params.assembly, Assembly::GRCh38);

    let err = parse_search_data_params(&query(&[("span", "chr1:1-100"), ("filter", "tissue eq x")]))
        .expect_err("bad filter");
    assert_eq!(err.code, ApiErrorCode::InvalidFilter);
    assert!(err.message.contains("Unable to parse `filter` expression"));
}

#[test]
fn collection_and_filter_summary_params() {
    let params = parse_collection_params("ADSP-FunGen", &query(&[("page", "2")])).expect("collection");
    assert_eq!(params.collection, "ADSP-FunGen");
    assert_eq!(params.page, 2);

    let summary = parse_filter_summary_params("datasource", &query(&[("counts", "true")]))
        .expect("summary");
    assert_eq!(summary.field, FilterField::Datasource);
    assert!(summary.include_counts);
    assert!(parse_filter_summary_params("tissue", &query(&[])).is_err());
}

#[test]
fn error_envelope_round_trips_and_maps_status() {
    let err = ApiError::invalid_param("page", "0", "Pages should be positive integers")
        .with_request_id("req-0000000000000001");
    let encoded = serde_json::to_string(&err).expect("encode");
    let decoded: ApiError = serde_json::from_str(&encoded).expect("decode");
    assert_eq!(decoded, err);

    let remote = ApiError::new(ApiErrorCode::RemoteSource, "upstream", serde_json::json!({}), "r");
    assert_eq!(map_error(&remote).status_code, 502);
    let mixed = ApiError::new(ApiErrorCode::MultipleAssemblies, "split", serde_json::json!({}), "r");
    assert_eq!(map_error(&mixed).status_code, 422);
    let store = ApiError::new(ApiErrorCode::MetadataStore, "db", serde_json::json!({}), "r");
    assert_eq!(map_error(&store).status_code, 500);
    let gene = ApiError::new(ApiErrorCode::NotImplemented, "gene", serde_json::json!({}), "r");
    assert_eq!(map_error(&gene).status_code, 501);
}

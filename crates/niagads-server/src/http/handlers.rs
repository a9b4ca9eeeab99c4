// SPDX-License-Identifier: Apache-2.0

use super::request_tracing::propagated_request_id;
use super::response::{
    api_error_response, json_response, service_error_response, track_data_response,
    track_metadata_response, version_payload,
};
use crate::helpers::RequestContext;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use niagads_api::{
    parse_collection_params, parse_filter_summary_params, parse_metadata_search_params,
    parse_qtl_params, parse_search_data_params, parse_track_data_params,
    parse_track_metadata_params,
};
use std::collections::BTreeMap;

type QueryMap = BTreeMap<String, String>;

fn request_id(headers: &HeaderMap) -> String {
    propagated_request_id(headers).unwrap_or_else(|| "req-unknown".to_string())
}

pub(crate) async fn healthz_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub(crate) async fn version_handler() -> impl IntoResponse {
    Json(version_payload())
}

pub(crate) async fn track_data_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
    Query(query): Query<QueryMap>,
) -> Response {
    let request_id = request_id(&headers);
    let params = match parse_track_data_params(&query) {
        Ok(params) => params,
        Err(err) => return api_error_response(err.with_request_id(&request_id)),
    };
    let ctx = RequestContext::new(&request_id, uri.path(), query);
    match state.helper.get_track_data(&ctx, &params).await {
        Ok(resp) => track_data_response(&resp, params.response.format, &headers, &request_id),
        Err(err) => service_error_response(err, &request_id),
    }
}

pub(crate) async fn search_track_data_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
    Query(query): Query<QueryMap>,
) -> Response {
    let request_id = request_id(&headers);
    let params = match parse_search_data_params(&query) {
        Ok(params) => params,
        Err(err) => return api_error_response(err.with_request_id(&request_id)),
    };
    let ctx = RequestContext::new(&request_id, uri.path(), query);
    match state.helper.search_track_data(&ctx, &params).await {
        Ok(resp) => track_data_response(&resp, params.response.format, &headers, &request_id),
        Err(err) => service_error_response(err, &request_id),
    }
}

pub(crate) async fn feature_qtl_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
    Path(track): Path<String>,
    Query(query): Query<QueryMap>,
) -> Response {
    let request_id = request_id(&headers);
    let params = match parse_qtl_params(&track, &query) {
        Ok(params) => params,
        Err(err) => return api_error_response(err.with_request_id(&request_id)),
    };
    let ctx = RequestContext::new(&request_id, uri.path(), query);
    match state.helper.get_feature_qtls(&ctx, &params).await {
        Ok(resp) => track_data_response(&resp, params.response.format, &headers, &request_id),
        Err(err) => service_error_response(err, &request_id),
    }
}

async fn track_metadata(state: AppState, headers: HeaderMap, path: &str, query: QueryMap) -> Response {
    let request_id = request_id(&headers);
    let params = match parse_track_metadata_params(&query) {
        Ok(params) => params,
        Err(err) => return api_error_response(err.with_request_id(&request_id)),
    };
    let ctx = RequestContext::new(&request_id, path, query);
    match state.helper.get_track_metadata(&ctx, &params).await {
        Ok(resp) => track_metadata_response(&resp, params.response.format, &headers, &request_id),
        Err(err) => service_error_response(err, &request_id),
    }
}

pub(crate) async fn track_metadata_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
    Query(query): Query<QueryMap>,
) -> Response {
    track_metadata(state, headers, uri.path(), query).await
}

pub(crate) async fn track_metadata_by_id_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
    Path(track): Path<String>,
    Query(mut query): Query<QueryMap>,
) -> Response {
    query.insert("track".to_string(), track);
    track_metadata(state, headers, uri.path(), query).await
}

pub(crate) async fn search_track_metadata_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
    Query(query): Query<QueryMap>,
) -> Response {
    let request_id = request_id(&headers);
    let params = match parse_metadata_search_params(&query) {
        Ok(params) => params,
        Err(err) => return api_error_response(err.with_request_id(&request_id)),
    };
    let ctx = RequestContext::new(&request_id, uri.path(), query);
    match state.helper.search_track_metadata(&ctx, &params).await {
        Ok(resp) => track_metadata_response(&resp, params.response.format, &headers, &request_id),
        Err(err) => service_error_response(err, &request_id),
    }
}

pub(crate) async fn filter_summary_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
    Path(field): Path<String>,
    Query(query): Query<QueryMap>,
) -> Response {
    let request_id = request_id(&headers);
    let params = match parse_filter_summary_params(&field, &query) {
        Ok(params) => params,
        Err(err) => return api_error_response(err.with_request_id(&request_id)),
    };
    let ctx = RequestContext::new(&request_id, uri.path(), query);
    match state.helper.get_filter_summary(&ctx, &params).await {
        Ok(resp) => json_response(&resp, &headers, &request_id),
        Err(err) => service_error_response(err, &request_id),
    }
}

pub(crate) async fn collections_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let request_id = request_id(&headers);
    let ctx = RequestContext::new(&request_id, uri.path(), QueryMap::new());
    match state.helper.get_collections(&ctx).await {
        Ok(resp) => json_response(&resp, &headers, &request_id),
        Err(err) => service_error_response(err, &request_id),
    }
}

pub(crate) async fn collection_track_metadata_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
    Path(collection): Path<String>,
    Query(query): Query<QueryMap>,
) -> Response {
    let request_id = request_id(&headers);
    let params = match parse_collection_params(&collection, &query) {
        Ok(params) => params,
        Err(err) => return api_error_response(err.with_request_id(&request_id)),
    };
    let ctx = RequestContext::new(&request_id, uri.path(), query);
    match state
        .helper
        .get_collection_track_metadata(&ctx, &params)
        .await
    {
        Ok(resp) => track_metadata_response(&resp, params.response.format, &headers, &request_id),
        Err(err) => service_error_response(err, &request_id),
    }
}

// SPDX-License-Identifier: Apache-2.0

//! Rendering of envelopes and errors into HTTP responses.

use crate::helpers::{ServiceError, TrackDataResponse, TrackMetadataResponse};
use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use niagads_api::{map_error, ApiError, ApiErrorCode};
use niagads_core::sha256_hex;
use niagads_model::{render_text, PagedResponse, ResponseFormat, TextRow};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, warn};

pub(crate) fn api_error_response(err: ApiError) -> Response {
    let status = StatusCode::from_u16(map_error(&err).status_code)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!(code = ?err.code, message = %err.message, "request failed");
    } else {
        warn!(code = ?err.code, message = %err.message, "request rejected");
    }
    (status, Json(json!({ "error": err }))).into_response()
}

pub(crate) fn service_error_response(err: ServiceError, request_id: &str) -> Response {
    api_error_response(err.into_api_error(request_id))
}

fn internal_error(message: String, request_id: &str) -> Response {
    api_error_response(ApiError::new(
        ApiErrorCode::Internal,
        message,
        json!({}),
        request_id,
    ))
}

fn if_none_match(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::IF_NONE_MATCH).and_then(|v| v.to_str().ok())
}

/// JSON body with an ETag over everything but the request echo, which
/// differs between otherwise identical responses.
pub(crate) fn json_response<T: Serialize>(
    payload: &T,
    headers: &HeaderMap,
    request_id: &str,
) -> Response {
    let mut value = match serde_json::to_value(payload) {
        Ok(value) => value,
        Err(err) => return internal_error(format!("json serialization failed: {err}"), request_id),
    };
    let request = value.as_object_mut().and_then(|o| o.remove("request"));
    let etag = format!("\"{}\"", sha256_hex(value.to_string().as_bytes()));
    if let (Some(obj), Some(request)) = (value.as_object_mut(), request) {
        obj.insert("request".to_string(), request);
    }

    if if_none_match(headers) == Some(etag.as_str()) {
        let mut resp = StatusCode::NOT_MODIFIED.into_response();
        if let Ok(v) = HeaderValue::from_str(&etag) {
            resp.headers_mut().insert(header::ETAG, v);
        }
        return resp;
    }

    let body = match serde_json::to_vec(&value) {
        Ok(body) => body,
        Err(err) => return internal_error(format!("json serialization failed: {err}"), request_id),
    };
    let mut resp = Response::new(Body::from(body));
    resp.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    if let Ok(v) = HeaderValue::from_str(&etag) {
        resp.headers_mut().insert(header::ETAG, v);
    }
    resp
}

fn text_response(body: String) -> Response {
    let mut resp = Response::new(Body::from(body));
    resp.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    resp
}

fn render_page<T: Serialize + TextRow>(
    page: &PagedResponse<T>,
    format: ResponseFormat,
    headers: &HeaderMap,
    request_id: &str,
) -> Response {
    match format {
        ResponseFormat::Text => text_response(render_text(&page.data, true)),
        ResponseFormat::Bed => text_response(render_text(&page.data, false)),
        _ => json_response(page, headers, request_id),
    }
}

pub(crate) fn track_data_response(
    response: &TrackDataResponse,
    format: ResponseFormat,
    headers: &HeaderMap,
    request_id: &str,
) -> Response {
    match response {
        TrackDataResponse::Features(page) => render_page(page, format, headers, request_id),
        TrackDataResponse::Counts(page) => render_page(page, format, headers, request_id),
        TrackDataResponse::Ids(page) | TrackDataResponse::Urls(page) => {
            render_page(page, format, headers, request_id)
        }
        TrackDataResponse::Summary(page) => render_page(page, format, headers, request_id),
    }
}

pub(crate) fn track_metadata_response(
    response: &TrackMetadataResponse,
    format: ResponseFormat,
    headers: &HeaderMap,
    request_id: &str,
) -> Response {
    match response {
        TrackMetadataResponse::Full(page) => render_page(page, format, headers, request_id),
        TrackMetadataResponse::Summary(page) => render_page(page, format, headers, request_id),
        TrackMetadataResponse::Ids(page) | TrackMetadataResponse::Urls(page) => {
            render_page(page, format, headers, request_id)
        }
        TrackMetadataResponse::Counts(count) => json_response(count, headers, request_id),
    }
}

#[must_use]
pub(crate) fn version_payload() -> Value {
    json!({
        "name": crate::CRATE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
    })
}

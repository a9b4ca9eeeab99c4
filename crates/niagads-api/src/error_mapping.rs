// SPDX-License-Identifier: Apache-2.0

use crate::{ApiError, ApiErrorCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiErrorMapping {
    pub status_code: u16,
}

#[must_use]
pub fn map_error(error: &ApiError) -> ApiErrorMapping {
    let status_code = match error.code {
        ApiErrorCode::InvalidParameter
        | ApiErrorCode::InvalidSpan
        | ApiErrorCode::InvalidFilter
        | ApiErrorCode::InvalidPage
        | ApiErrorCode::InvalidTrackId => 400,
        ApiErrorCode::NotFound => 404,
        ApiErrorCode::MultipleAssemblies => 422,
        ApiErrorCode::RemoteSource => 502,
        ApiErrorCode::NotImplemented => 501,
        ApiErrorCode::NotReady => 503,
        _ => 500,
    };
    ApiErrorMapping { status_code }
}

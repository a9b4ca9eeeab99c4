// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ApiErrorCode {
    InvalidParameter,
    InvalidSpan,
    InvalidFilter,
    InvalidPage,
    InvalidTrackId,
    MultipleAssemblies,
    NotFound,
    RemoteSource,
    MetadataStore,
    NotReady,
    NotImplemented,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
    pub details: Value,
    pub request_id: String,
}

impl ApiError {
    #[must_use]
    pub fn new(
        code: ApiErrorCode,
        message: impl Into<String>,
        details: Value,
        request_id: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            request_id: request_id.into(),
        }
    }

    #[must_use]
    pub fn invalid_param(name: &str, value: &str, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::new(
            ApiErrorCode::InvalidParameter,
            format!("Invalid value specified for `{name}`: {value}. {reason}"),
            json!({"parameter": name, "value": value, "reason": reason}),
            "req-unknown",
        )
    }

    #[must_use]
    pub fn missing_param(name: &str) -> Self {
        Self::new(
            ApiErrorCode::InvalidParameter,
            format!("missing required parameter: `{name}`"),
            json!({"parameter": name, "reason": "missing"}),
            "req-unknown",
        )
    }

    #[must_use]
    pub fn invalid_span(value: &str, message: impl Into<String>) -> Self {
        Self::new(
            ApiErrorCode::InvalidSpan,
            message,
            json!({"parameter": "span", "value": value}),
            "req-unknown",
        )
    }

    #[must_use]
    pub fn invalid_filter(value: &str, message: impl Into<String>) -> Self {
        Self::new(
            ApiErrorCode::InvalidFilter,
            message,
            json!({"parameter": "filter", "value": value}),
            "req-unknown",
        )
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

const _: fn() = || {
    fn assert_traits<T: Serialize + for<'de> Deserialize<'de>>() {}
    assert_traits::<ApiErrorCode>();
    assert_traits::<ApiError>();
};

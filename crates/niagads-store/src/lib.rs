// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Collaborators of the track data service: the relational track metadata
//! store and the remote FILER feature API, each behind a trait with an
//! in-process fake for tests.

mod fake;
mod filer;
mod metadata;
mod sqlite;

pub use fake::{FakeMetadataStore, FakeTrackDataSource};
pub use filer::{FilerApiClient, FilerEndpoint, RemoteTrackDataSource, TrackFeatures};
pub use metadata::{FilterValueSummary, MetadataQuery, MetadataSession, MetadataStore};
pub use sqlite::{SqliteMetadataStore, METADATA_SCHEMA_SQL};

use std::fmt::{Display, Formatter};

pub const CRATE_NAME: &str = "niagads-store";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreErrorCode {
    InvalidTrackId,
    InvalidCollection,
    Database,
    RemoteSource,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    pub code: StoreErrorCode,
    pub message: String,
}

impl StoreError {
    #[must_use]
    pub fn new(code: StoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub(crate) fn database(err: impl Display) -> Self {
        Self::new(StoreErrorCode::Database, err.to_string())
    }

    pub(crate) fn remote(message: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::RemoteSource, message)
    }

    pub(crate) fn invalid_tracks(missing: &[String]) -> Self {
        Self::new(
            StoreErrorCode::InvalidTrackId,
            format!("Invalid track identifiers found: {}", missing.join(", ")),
        )
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for StoreError {}

// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Typed data model for FILER track queries: genome coordinates, per-track
//! hit counts, BED features, track metadata and the paged response envelopes.

mod feature;
mod genome;
mod render;
mod response;
mod track;

pub use feature::BedFeature;
pub use genome::{Assembly, Chromosome, Span};
pub use render::{render_text, TextRow};
pub use response::{
    PagedResponse, PaginationCursor, RequestData, ResponseContent, ResponseFormat, ResponseView,
    SimpleResponse,
};
pub use track::{Collection, GenomeBuild, Track, TrackOverlap, TrackSummary};

use std::fmt::{Display, Formatter};

pub const CRATE_NAME: &str = "niagads-model";

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    Empty(&'static str),
    InvalidValue(&'static str, String),
    InvalidFormat(String),
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty(name) => write!(f, "{name} must not be empty"),
            Self::InvalidValue(name, value) => write!(f, "invalid value for `{name}`: {value}"),
            Self::InvalidFormat(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for ParseError {}

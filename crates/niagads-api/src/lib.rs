// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Request parameter contracts and the error envelope of the FILER routes.

mod error_mapping;
mod errors;
pub mod params;

pub use error_mapping::{map_error, ApiErrorMapping};
pub use errors::{ApiError, ApiErrorCode};
pub use params::{
    parse_collection_params, parse_feature_location, parse_filter_summary_params,
    parse_metadata_search_params, parse_page, parse_qtl_params, parse_response_configuration,
    parse_search_data_params, parse_track_data_params, parse_track_metadata_params,
    CollectionParameters, FeatureLocation, FilterSummaryParameters, MetadataSearchParameters,
    QtlParameters, ResponseConfiguration, SearchDataParameters, TrackDataParameters,
    TrackMetadataParameters,
};

pub const CRATE_NAME: &str = "niagads-api";

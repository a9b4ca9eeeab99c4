// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Pure query-side computation: cross-track cursor pagination over per-track
//! hit counts, request batching, and the metadata filter-expression grammar.

mod batch;
mod filters;
mod pagination;

pub use batch::chunk_tracks;
pub use filters::{
    parse_filter_expression, FilterField, FilterOp, FilterParseError, MetadataFilter,
    BIOSAMPLE_FIELDS,
};
pub use pagination::{
    build_cursor_table, cumulative_sum, page_window, resolve_page, slice_records,
    slice_result_by_page, sort_descending, total_num_pages, CursorMarker, CursorTable,
    DataPaginationCursor, PagePosition, PaginationError, PaginationErrorCode, Range, TrackSlice,
};

pub const CRATE_NAME: &str = "niagads-query";

// SPDX-License-Identifier: Apache-2.0

//! Pages over the virtual concatenation of several tracks' results.
//!
//! Tracks are ordered by descending hit count (stable, so the remote source's
//! order breaks ties). Page `p` covers logical records `[(p-1)*size, p*size)`
//! of that concatenation. The cursor table stores one `track:offset` marker
//! per page boundary, so a page can be resolved into per-track slices without
//! fetching any track that does not contribute to it.

use niagads_model::{PaginationCursor, TrackOverlap};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum PaginationErrorCode {
    InvalidPage,
    InvalidPageSize,
    InvalidRange,
    InvalidCursor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationError {
    pub code: PaginationErrorCode,
    pub message: String,
}

impl PaginationError {
    #[must_use]
    pub fn new(code: PaginationErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    fn invalid_page(page: u64, total_num_pages: u64) -> Self {
        Self::new(
            PaginationErrorCode::InvalidPage,
            format!(
                "Request `page` {page} does not exist; this query generates a maximum of {total_num_pages} page(s)"
            ),
        )
    }
}

impl Display for PaginationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaginationError {}

/// End-exclusive slice `[start, end)` over a record sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: u64,
    pub end: u64,
}

impl Range {
    pub fn new(start: u64, end: u64) -> Result<Self, PaginationError> {
        if start > end {
            return Err(PaginationError::new(
                PaginationErrorCode::InvalidRange,
                format!("range start {start} exceeds end {end}"),
            ));
        }
        Ok(Self { start, end })
    }

    #[must_use]
    pub const fn len(&self) -> u64 {
        self.end - self.start
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Position in the sorted track list: `track` indexes the list, `offset` counts
/// records into that track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CursorMarker {
    pub track: usize,
    pub offset: u64,
}

impl CursorMarker {
    #[must_use]
    pub const fn new(track: usize, offset: u64) -> Self {
        Self { track, offset }
    }

    pub fn parse(raw: &str) -> Result<Self, PaginationError> {
        let invalid = || {
            PaginationError::new(
                PaginationErrorCode::InvalidCursor,
                format!("cursor marker must be `track:offset`, got `{raw}`"),
            )
        };
        let (track, offset) = raw.split_once(':').ok_or_else(invalid)?;
        Ok(Self {
            track: track.parse().map_err(|_| invalid())?,
            offset: offset.parse().map_err(|_| invalid())?,
        })
    }
}

impl Display for CursorMarker {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.track, self.offset)
    }
}

/// Page boundary markers; entry `p-1` starts page `p` and entry `p` ends it.
/// Always holds `total_num_pages + 1` markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Vec<String>", try_from = "Vec<String>")]
pub struct CursorTable {
    markers: Vec<CursorMarker>,
}

impl CursorTable {
    pub fn from_markers(markers: Vec<CursorMarker>) -> Result<Self, PaginationError> {
        if markers.len() < 2 {
            return Err(PaginationError::new(
                PaginationErrorCode::InvalidCursor,
                "cursor table needs at least a start and an end marker",
            ));
        }
        if markers.windows(2).any(|w| w[0] > w[1]) {
            return Err(PaginationError::new(
                PaginationErrorCode::InvalidCursor,
                "cursor table markers must be non-decreasing",
            ));
        }
        Ok(Self { markers })
    }

    #[must_use]
    pub fn markers(&self) -> &[CursorMarker] {
        &self.markers
    }

    #[must_use]
    pub fn total_num_pages(&self) -> u64 {
        (self.markers.len() - 1) as u64
    }

    /// The table still describes `sorted` if the end marker is its last track and full count.
    #[must_use]
    pub fn matches(&self, sorted: &[TrackOverlap]) -> bool {
        let Some(end) = self.markers.last() else {
            return false;
        };
        match sorted.last() {
            None => *end == CursorMarker::new(0, 0),
            Some(last) => end.track == sorted.len() - 1 && end.offset == last.num_overlaps,
        }
    }
}

impl From<CursorTable> for Vec<String> {
    fn from(table: CursorTable) -> Self {
        table.markers.iter().map(ToString::to_string).collect()
    }
}

impl TryFrom<Vec<String>> for CursorTable {
    type Error = PaginationError;

    fn try_from(raw: Vec<String>) -> Result<Self, Self::Error> {
        let markers = raw
            .iter()
            .map(|m| CursorMarker::parse(m))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_markers(markers)
    }
}

/// Stable sort by `num_overlaps`, largest first.
#[must_use]
pub fn sort_descending(overlaps: &[TrackOverlap]) -> Vec<TrackOverlap> {
    let mut sorted = overlaps.to_vec();
    sorted.sort_by(|a, b| b.num_overlaps.cmp(&a.num_overlaps));
    sorted
}

/// `cumulative[i]` is the number of records in tracks `0..=i`.
#[must_use]
pub fn cumulative_sum(sorted: &[TrackOverlap]) -> Vec<u64> {
    sorted
        .iter()
        .scan(0_u64, |acc, t| {
            *acc += t.num_overlaps;
            Some(*acc)
        })
        .collect()
}

/// `ceil(total / page_size)`, never less than one page.
#[must_use]
pub fn total_num_pages(total_result_size: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        return 1;
    }
    total_result_size.div_ceil(page_size).max(1)
}

fn check_page_size(page_size: u64) -> Result<(), PaginationError> {
    if page_size == 0 {
        return Err(PaginationError::new(
            PaginationErrorCode::InvalidPageSize,
            "page size must be positive",
        ));
    }
    Ok(())
}

/// Logical record range of `page` within a result of `total_result_size` records.
pub fn slice_result_by_page(
    page: u64,
    page_size: u64,
    total_result_size: u64,
) -> Result<Range, PaginationError> {
    check_page_size(page_size)?;
    let pages = total_num_pages(total_result_size, page_size);
    if page == 0 || page > pages {
        return Err(PaginationError::invalid_page(page, pages));
    }
    let start = (page - 1) * page_size;
    Range::new(
        start.min(total_result_size),
        (page * page_size).min(total_result_size),
    )
}

/// Range and pagination summary for a page over an already ordered, in-memory result.
pub fn page_window(
    page: u64,
    page_size: u64,
    total_result_size: u64,
) -> Result<(Range, PaginationCursor), PaginationError> {
    let range = slice_result_by_page(page, page_size, total_result_size)?;
    Ok((
        range,
        PaginationCursor {
            page,
            total_num_pages: total_num_pages(total_result_size, page_size),
            paged_num_records: Some(range.len()),
            total_num_records: Some(total_result_size),
        },
    ))
}

/// Builds the boundary table for tracks already in [`sort_descending`] order.
///
/// The marker ending page `k` sits at logical position `x = k*page_size`, in the
/// first track whose cumulative count reaches `x`, at offset `x` minus the
/// records held by the tracks before it. The final marker is always the last
/// track at its full count. An empty track list yields `["0:0", "0:0"]`.
pub fn build_cursor_table(
    sorted: &[TrackOverlap],
    page_size: u64,
) -> Result<CursorTable, PaginationError> {
    check_page_size(page_size)?;
    let Some(last) = sorted.last() else {
        return CursorTable::from_markers(vec![CursorMarker::new(0, 0); 2]);
    };

    let cumulative = cumulative_sum(sorted);
    let total = cumulative[cumulative.len() - 1];
    let pages = total_num_pages(total, page_size);

    let mut markers = Vec::with_capacity(pages as usize + 1);
    markers.push(CursorMarker::new(0, 0));
    let mut track = 0_usize;
    for boundary in 1..pages {
        let position = boundary * page_size;
        // position < total, so some track always reaches it
        while cumulative[track] < position {
            track += 1;
        }
        let track_start = cumulative[track] - sorted[track].num_overlaps;
        markers.push(CursorMarker::new(track, position - track_start));
    }
    markers.push(CursorMarker::new(sorted.len() - 1, last.num_overlaps));
    CursorTable::from_markers(markers)
}

/// Slice of one track's records contributing to a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSlice {
    pub track_id: String,
    pub range: Range,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagePosition {
    /// Index into [`DataPaginationCursor::tracks`].
    pub key: usize,
    pub offset: u64,
}

/// A page resolved against the cursor table: the tracks to fetch, in order,
/// and the record range of each that belongs to the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPaginationCursor {
    pub page: u64,
    pub total_num_pages: u64,
    pub tracks: Vec<TrackSlice>,
    pub start: PagePosition,
    pub end: PagePosition,
}

impl DataPaginationCursor {
    #[must_use]
    pub fn track_ids(&self) -> Vec<String> {
        self.tracks.iter().map(|t| t.track_id.clone()).collect()
    }

    #[must_use]
    pub fn paged_num_records(&self) -> u64 {
        self.tracks.iter().map(|t| t.range.len()).sum()
    }

    #[must_use]
    pub fn pagination(&self, total_num_records: u64) -> PaginationCursor {
        PaginationCursor {
            page: self.page,
            total_num_pages: self.total_num_pages,
            paged_num_records: Some(self.paged_num_records()),
            total_num_records: Some(total_num_records),
        }
    }
}

/// Resolves `page` into per-track slices.
///
/// Tracks between the page's start and end markers are included; the first is
/// cut at the start offset and the last at the end offset. Tracks left with no
/// records (a page starting exactly at the end of a track, or zero-count tracks)
/// are dropped.
pub fn resolve_page(
    table: &CursorTable,
    sorted: &[TrackOverlap],
    page: u64,
) -> Result<DataPaginationCursor, PaginationError> {
    let total_num_pages = table.total_num_pages();
    if page == 0 || page > total_num_pages {
        return Err(PaginationError::invalid_page(page, total_num_pages));
    }
    let start = table.markers[(page - 1) as usize];
    let end = table.markers[page as usize];

    let mut tracks = Vec::new();
    if !sorted.is_empty() {
        if end.track >= sorted.len() {
            return Err(PaginationError::new(
                PaginationErrorCode::InvalidCursor,
                format!(
                    "cursor marker {end} is outside the {} track result",
                    sorted.len()
                ),
            ));
        }
        for (index, track) in sorted
            .iter()
            .enumerate()
            .take(end.track + 1)
            .skip(start.track)
        {
            let from = if index == start.track { start.offset } else { 0 };
            let to = if index == end.track {
                end.offset
            } else {
                track.num_overlaps
            };
            let range = Range::new(from, to.min(track.num_overlaps).max(from))?;
            if !range.is_empty() {
                tracks.push(TrackSlice {
                    track_id: track.track_id.clone(),
                    range,
                });
            }
        }
    }

    let start_pos = PagePosition {
        key: 0,
        offset: tracks.first().map_or(0, |t| t.range.start),
    };
    let end_pos = PagePosition {
        key: tracks.len().saturating_sub(1),
        offset: tracks.last().map_or(0, |t| t.range.end),
    };
    Ok(DataPaginationCursor {
        page,
        total_num_pages,
        tracks,
        start: start_pos,
        end: end_pos,
    })
}

/// Applies `range` to an in-memory record list, clamping to its length.
#[must_use]
pub fn slice_records<T>(records: Vec<T>, range: Range) -> Vec<T> {
    let len = records.len();
    let start = usize::try_from(range.start).map_or(len, |s| s.min(len));
    let end = usize::try_from(range.end).map_or(len, |e| e.min(len)).max(start);
    records
        .into_iter()
        .skip(start)
        .take(end - start)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlaps(counts: &[(&str, u64)]) -> Vec<TrackOverlap> {
        counts.iter().map(|(t, n)| TrackOverlap::new(*t, *n)).collect()
    }

    fn marker_strings(table: &CursorTable) -> Vec<String> {
        table.clone().into()
    }

    #[test]
    fn page_count_boundaries() {
        assert_eq!(total_num_pages(0, 100), 1);
        assert_eq!(total_num_pages(99, 100), 1);
        assert_eq!(total_num_pages(100, 100), 1);
        assert_eq!(total_num_pages(101, 100), 2);
        assert_eq!(total_num_pages(400, 100), 4);
    }

    #[test]
    fn sort_is_stable_for_ties() {
        let sorted = sort_descending(&overlaps(&[("a", 1), ("b", 5), ("c", 1), ("d", 5)]));
        let ids: Vec<_> = sorted.iter().map(|t| t.track_id.as_str()).collect();
        assert_eq!(ids, ["b", "d", "a", "c"]);
    }

    #[test]
    fn cursor_table_for_mixed_track_sizes() {
        let sorted = sort_descending(&overlaps(&[("C", 50), ("A", 250), ("B", 100)]));
        assert_eq!(cumulative_sum(&sorted), vec![250, 350, 400]);
        let table = build_cursor_table(&sorted, 100).expect("table");
        assert_eq!(
            marker_strings(&table),
            ["0:0", "0:100", "0:200", "1:50", "2:50"]
        );
        assert_eq!(table.total_num_pages(), 4);
    }

    #[test]
    fn pages_resolve_to_expected_track_slices() {
        let sorted = sort_descending(&overlaps(&[("A", 250), ("B", 100), ("C", 50)]));
        let table = build_cursor_table(&sorted, 100).expect("table");
        let slices = |page| {
            resolve_page(&table, &sorted, page)
                .expect("page")
                .tracks
                .into_iter()
                .map(|t| (t.track_id, t.range.start, t.range.end))
                .collect::<Vec<_>>()
        };
        assert_eq!(slices(1), vec![("A".to_string(), 0, 100)]);
        assert_eq!(slices(2), vec![("A".to_string(), 100, 200)]);
        assert_eq!(
            slices(3),
            vec![("A".to_string(), 200, 250), ("B".to_string(), 0, 50)]
        );
        assert_eq!(
            slices(4),
            vec![("B".to_string(), 50, 100), ("C".to_string(), 0, 50)]
        );
    }

    #[test]
    fn page_beyond_total_is_rejected() {
        let sorted = sort_descending(&overlaps(&[("A", 250), ("B", 100), ("C", 50)]));
        let table = build_cursor_table(&sorted, 100).expect("table");
        let err = resolve_page(&table, &sorted, 5).expect_err("page 5");
        assert_eq!(err.code, PaginationErrorCode::InvalidPage);
        assert_eq!(
            resolve_page(&table, &sorted, 0).expect_err("page 0").code,
            PaginationErrorCode::InvalidPage
        );
    }

    #[test]
    fn empty_overlaps_resolve_to_single_empty_page() {
        let table = build_cursor_table(&[], 100).expect("table");
        assert_eq!(marker_strings(&table), ["0:0", "0:0"]);
        let page = resolve_page(&table, &[], 1).expect("page 1");
        assert!(page.tracks.is_empty());
        assert_eq!(page.total_num_pages, 1);
        assert_eq!(page.paged_num_records(), 0);
    }

    #[test]
    fn exact_multiple_does_not_add_a_trailing_page() {
        let sorted = overlaps(&[("A", 100)]);
        let table = build_cursor_table(&sorted, 100).expect("table");
        assert_eq!(marker_strings(&table), ["0:0", "0:100"]);
    }

    #[test]
    fn one_past_a_multiple_spills_one_record() {
        let sorted = sort_descending(&overlaps(&[("A", 60), ("B", 41)]));
        let table = build_cursor_table(&sorted, 100).expect("table");
        assert_eq!(table.total_num_pages(), 2);
        let second = resolve_page(&table, &sorted, 2).expect("page 2");
        assert_eq!(second.paged_num_records(), 1);
        assert_eq!(second.track_ids(), vec!["B".to_string()]);
        assert_eq!(second.start.offset, 40);
        assert_eq!(second.end.offset, 41);
    }

    #[test]
    fn page_starting_at_track_end_skips_exhausted_track() {
        let sorted = overlaps(&[("A", 100), ("B", 100)]);
        let table = build_cursor_table(&sorted, 100).expect("table");
        assert_eq!(marker_strings(&table), ["0:0", "0:100", "1:100"]);
        let second = resolve_page(&table, &sorted, 2).expect("page 2");
        assert_eq!(second.track_ids(), vec!["B".to_string()]);
        assert_eq!(second.start, PagePosition { key: 0, offset: 0 });
        assert_eq!(second.end, PagePosition { key: 0, offset: 100 });
    }

    #[test]
    fn zero_count_tracks_never_appear_in_pages() {
        let sorted = sort_descending(&overlaps(&[("A", 3), ("Z", 0), ("B", 2)]));
        let table = build_cursor_table(&sorted, 10).expect("table");
        let page = resolve_page(&table, &sorted, 1).expect("page");
        assert_eq!(page.track_ids(), vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn table_round_trips_through_json() {
        let sorted = overlaps(&[("A", 250)]);
        let table = build_cursor_table(&sorted, 100).expect("table");
        let json = serde_json::to_string(&table).expect("json");
        assert_eq!(json, r#"["0:0","0:100","0:200","0:250"]"#);
        let back: CursorTable = serde_json::from_str(&json).expect("parse");
        assert_eq!(back, table);
        assert!(back.matches(&sorted));
        assert!(!back.matches(&overlaps(&[("A", 251)])));
    }

    #[test]
    fn malformed_tables_are_rejected() {
        assert!(serde_json::from_str::<CursorTable>(r#"["0:0"]"#).is_err());
        assert!(serde_json::from_str::<CursorTable>(r#"["0:0","x"]"#).is_err());
        assert!(serde_json::from_str::<CursorTable>(r#"["1:0","0:5"]"#).is_err());
    }

    #[test]
    fn in_memory_pages_use_end_exclusive_ranges() {
        let (range, cursor) = page_window(3, 2, 5).expect("window");
        assert_eq!(range, Range { start: 4, end: 5 });
        assert_eq!(cursor.total_num_pages, 3);
        assert_eq!(cursor.paged_num_records, Some(1));
        assert_eq!(slice_records(vec![1, 2, 3, 4, 5], range), vec![5]);
        assert!(slice_result_by_page(4, 2, 5).is_err());
        assert_eq!(
            slice_result_by_page(1, 2, 0).expect("empty"),
            Range { start: 0, end: 0 }
        );
    }
}

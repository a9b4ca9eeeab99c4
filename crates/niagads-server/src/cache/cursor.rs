// SPDX-License-Identifier: Apache-2.0

use super::ResponseCache;
use niagads_core::{CacheKey, CacheKeyQualifier, CacheNamespace};
use niagads_model::TrackOverlap;
use niagads_query::{
    build_cursor_table, resolve_page, sort_descending, total_num_pages, CursorTable,
    DataPaginationCursor, PaginationError,
};
use tracing::debug;

const NAMESPACE: CacheNamespace = CacheNamespace::QueryCache;

/// A page resolved against the cached (or freshly built) cursor table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPage {
    pub cursor: DataPaginationCursor,
    pub total_num_records: u64,
    pub sorted: Vec<TrackOverlap>,
    /// Whether the cursor table and result size were rebuilt and rewritten.
    pub recomputed: bool,
}

/// Cursor table and total result size, cached as a pair under keys derived
/// from the unpaged request key.
#[derive(Clone)]
pub struct CursorCache {
    cache: ResponseCache,
}

impl CursorCache {
    #[must_use]
    pub fn new(cache: ResponseCache) -> Self {
        Self { cache }
    }

    /// Resolves `page` for the result identified by `fingerprint`.
    ///
    /// Both entries are rebuilt and rewritten together whenever either is
    /// missing, undecodable or inconsistent with `overlaps`, so readers never
    /// see a table from one result paired with the size of another.
    pub async fn get_or_compute(
        &self,
        fingerprint: &str,
        overlaps: &[TrackOverlap],
        page_size: u64,
        page: u64,
    ) -> Result<ResolvedPage, PaginationError> {
        let cursor_key = CacheKey::qualified(fingerprint, CacheKeyQualifier::Cursor, page_size);
        let size_key = CacheKey::qualified(fingerprint, CacheKeyQualifier::ResultSize, page_size);
        let sorted = sort_descending(overlaps);
        let size: u64 = sorted.iter().map(|t| t.num_overlaps).sum();

        let (cached_table, cached_size) = tokio::join!(
            self.cache.get::<CursorTable>(NAMESPACE, &cursor_key),
            self.cache.get::<u64>(NAMESPACE, &size_key),
        );

        let consistent = match (&cached_table, cached_size) {
            (Some(table), Some(cached)) => {
                table.matches(&sorted)
                    && table.total_num_pages() == total_num_pages(size, page_size)
                    && cached == size
            }
            _ => false,
        };

        let (table, total, recomputed) = match (cached_table, cached_size) {
            (Some(table), Some(cached)) if consistent => (table, cached, false),
            _ => {
                debug!(fingerprint, "rebuilding pagination cursor");
                let table = build_cursor_table(&sorted, page_size)?;
                tokio::join!(
                    self.cache.set(NAMESPACE, &cursor_key, &table),
                    self.cache.set(NAMESPACE, &size_key, &size),
                );
                (table, size, true)
            }
        };

        let cursor = resolve_page(&table, &sorted, page)?;
        Ok(ResolvedPage {
            cursor,
            total_num_records: total,
            sorted,
            recomputed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheBackend, MemoryCache};
    use std::sync::Arc;
    use std::time::Duration;

    fn overlaps(counts: &[(&str, u64)]) -> Vec<TrackOverlap> {
        counts
            .iter()
            .map(|(id, n)| TrackOverlap::new(*id, *n))
            .collect()
    }

    fn cursor_cache(backend: Arc<MemoryCache>) -> CursorCache {
        CursorCache::new(ResponseCache::new(
            backend,
            Duration::from_secs(1),
            Duration::from_secs(60),
        ))
    }

    #[tokio::test]
    async fn second_request_reuses_the_cached_pair() {
        let backend = Arc::new(MemoryCache::new(16));
        let cache = cursor_cache(backend.clone());
        let data = overlaps(&[("A", 3), ("B", 5), ("C", 0)]);

        let first = cache.get_or_compute("raw", &data, 4, 1).await.expect("page 1");
        assert!(first.recomputed);
        assert_eq!(first.total_num_records, 8);
        assert_eq!(first.cursor.track_ids(), vec!["B"]);

        let second = cache.get_or_compute("raw", &data, 4, 2).await.expect("page 2");
        assert!(!second.recomputed);
        assert_eq!(second.cursor.track_ids(), vec!["B", "A"]);
        assert_eq!(backend.len(), 2);
    }

    #[tokio::test]
    async fn missing_size_rebuilds_both_entries() {
        let backend = Arc::new(MemoryCache::new(16));
        let cache = cursor_cache(backend.clone());
        let data = overlaps(&[("A", 10)]);
        cache.get_or_compute("raw", &data, 4, 1).await.expect("seed");

        let size_key = CacheKey::qualified("raw", CacheKeyQualifier::ResultSize, 4);
        backend.delete(NAMESPACE, &size_key).await.expect("delete");

        let page = cache.get_or_compute("raw", &data, 4, 3).await.expect("page 3");
        assert!(page.recomputed);
        assert_eq!(page.cursor.paged_num_records(), 2);
        assert!(backend.exists(NAMESPACE, &size_key).await.expect("exists"));
    }

    #[tokio::test]
    async fn stale_table_is_rebuilt() {
        let backend = Arc::new(MemoryCache::new(16));
        let cache = cursor_cache(backend);
        cache
            .get_or_compute("raw", &overlaps(&[("A", 10)]), 4, 1)
            .await
            .expect("seed");
        let page = cache
            .get_or_compute("raw", &overlaps(&[("A", 10), ("B", 6)]), 4, 4)
            .await
            .expect("page 4");
        assert!(page.recomputed);
        assert_eq!(page.total_num_records, 16);
        assert_eq!(page.cursor.track_ids(), vec!["B"]);
    }

    #[tokio::test]
    async fn page_size_change_does_not_reuse_the_table() {
        let backend = Arc::new(MemoryCache::new(16));
        let cache = cursor_cache(backend.clone());
        let data = overlaps(&[("A", 250), ("B", 100), ("C", 50)]);
        cache.get_or_compute("raw", &data, 100, 1).await.expect("seed");

        // 400 records make four pages at both sizes.
        let page = cache.get_or_compute("raw", &data, 101, 4).await.expect("page 4");
        assert!(page.recomputed);
        assert_eq!(page.cursor.paged_num_records(), 97);
        assert_eq!(page.cursor.track_ids(), vec!["B", "C"]);
        assert_eq!(backend.len(), 4);
    }

    #[tokio::test]
    async fn out_of_range_page_is_an_error() {
        let cache = cursor_cache(Arc::new(MemoryCache::new(16)));
        let err = cache
            .get_or_compute("raw", &overlaps(&[("A", 3)]), 4, 2)
            .await
            .expect_err("page 2 of 1");
        assert!(err.message.contains("maximum of 1 page"));
    }
}

// SPDX-License-Identifier: Apache-2.0

use super::CacheBackend;
use crate::CacheError;
use async_trait::async_trait;
use niagads_core::CacheNamespace;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Clone)]
struct MemoryEntry {
    body: Vec<u8>,
    created_at: Instant,
    ttl: Duration,
}

impl MemoryEntry {
    fn is_live(&self) -> bool {
        self.created_at.elapsed() <= self.ttl
    }
}

/// Process-local cache; when full, the oldest entry is evicted.
pub struct MemoryCache {
    max_entries: usize,
    entries: Mutex<HashMap<String, MemoryEntry>>,
}

impl MemoryCache {
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn slot(namespace: CacheNamespace, key: &str) -> String {
        format!("{}:{key}", namespace.as_str())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, MemoryEntry>>, CacheError> {
        self.entries
            .lock()
            .map_err(|_| CacheError("memory cache lock poisoned".to_string()))
    }

    /// Live entries across all namespaces.
    pub fn len(&self) -> usize {
        self.lock()
            .map(|entries| entries.values().filter(|e| e.is_live()).count())
            .unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(
        &self,
        namespace: CacheNamespace,
        key: &str,
    ) -> Result<Option<Vec<u8>>, CacheError> {
        let mut entries = self.lock()?;
        entries.retain(|_, v| v.is_live());
        Ok(entries.get(&Self::slot(namespace, key)).map(|e| e.body.clone()))
    }

    async fn set(
        &self,
        namespace: CacheNamespace,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let slot = Self::slot(namespace, key);
        let mut entries = self.lock()?;
        entries.retain(|_, v| v.is_live());
        if !entries.contains_key(&slot) && entries.len() >= self.max_entries {
            if let Some(victim) = entries
                .iter()
                .min_by_key(|(_, v)| v.created_at)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&victim);
            }
        }
        entries.insert(
            slot,
            MemoryEntry {
                body: value,
                created_at: Instant::now(),
                ttl,
            },
        );
        Ok(())
    }

    async fn exists(&self, namespace: CacheNamespace, key: &str) -> Result<bool, CacheError> {
        let entries = self.lock()?;
        Ok(entries
            .get(&Self::slot(namespace, key))
            .is_some_and(MemoryEntry::is_live))
    }

    async fn delete(&self, namespace: CacheNamespace, key: &str) -> Result<(), CacheError> {
        self.lock()?.remove(&Self::slot(namespace, key));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn namespaces_do_not_collide() {
        let cache = MemoryCache::new(8);
        let ttl = Duration::from_secs(60);
        cache
            .set(CacheNamespace::Filer, "k", b"filer".to_vec(), ttl)
            .await
            .expect("set");
        cache
            .set(CacheNamespace::QueryCache, "k", b"query".to_vec(), ttl)
            .await
            .expect("set");
        assert_eq!(
            cache.get(CacheNamespace::Filer, "k").await.expect("get"),
            Some(b"filer".to_vec())
        );
        cache.delete(CacheNamespace::Filer, "k").await.expect("delete");
        assert!(!cache.exists(CacheNamespace::Filer, "k").await.expect("exists"));
        assert!(cache.exists(CacheNamespace::QueryCache, "k").await.expect("exists"));
    }

    #[tokio::test]
    async fn expired_entries_are_misses_and_oldest_is_evicted() {
        let cache = MemoryCache::new(2);
        cache
            .set(CacheNamespace::Root, "gone", vec![1], Duration::ZERO)
            .await
            .expect("set");
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(cache.get(CacheNamespace::Root, "gone").await.expect("get"), None);

        let ttl = Duration::from_secs(60);
        for key in ["a", "b", "c"] {
            cache
                .set(CacheNamespace::Root, key, vec![0], ttl)
                .await
                .expect("set");
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        assert_eq!(cache.len(), 2);
        assert!(!cache.exists(CacheNamespace::Root, "a").await.expect("exists"));
    }
}

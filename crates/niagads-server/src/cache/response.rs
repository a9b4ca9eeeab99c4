// SPDX-License-Identifier: Apache-2.0

use super::CacheBackend;
use niagads_core::canonical::stable_json_bytes;
use niagads_core::CacheNamespace;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// JSON layer over a [`CacheBackend`].
///
/// Every operation is bounded by `op_timeout` and fails open: a slow or broken
/// backend reads as a miss and a failed write is dropped, with a warning.
#[derive(Clone)]
pub struct ResponseCache {
    backend: Arc<dyn CacheBackend>,
    op_timeout: Duration,
    ttl: Duration,
}

impl ResponseCache {
    #[must_use]
    pub fn new(backend: Arc<dyn CacheBackend>, op_timeout: Duration, ttl: Duration) -> Self {
        Self {
            backend,
            op_timeout,
            ttl,
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, namespace: CacheNamespace, key: &str) -> Option<T> {
        let bytes = match timeout(self.op_timeout, self.backend.get(namespace, key)).await {
            Ok(Ok(Some(bytes))) => bytes,
            Ok(Ok(None)) => return None,
            Ok(Err(err)) => {
                warn!(namespace = namespace.as_str(), key, error = %err, "cache read failed");
                return None;
            }
            Err(_) => {
                warn!(namespace = namespace.as_str(), key, "cache read timed out");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                debug!(namespace = namespace.as_str(), key, "cache hit");
                Some(value)
            }
            Err(err) => {
                warn!(namespace = namespace.as_str(), key, error = %err, "cached value undecodable");
                None
            }
        }
    }

    pub async fn set<T: Serialize>(&self, namespace: CacheNamespace, key: &str, value: &T) {
        let bytes = match stable_json_bytes(value) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(namespace = namespace.as_str(), key, error = %err, "cache value not serializable");
                return;
            }
        };
        match timeout(
            self.op_timeout,
            self.backend.set(namespace, key, bytes, self.ttl),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(namespace = namespace.as_str(), key, error = %err, "cache write failed");
            }
            Err(_) => warn!(namespace = namespace.as_str(), key, "cache write timed out"),
        }
    }

    pub async fn exists(&self, namespace: CacheNamespace, key: &str) -> bool {
        match timeout(self.op_timeout, self.backend.exists(namespace, key)).await {
            Ok(Ok(found)) => found,
            Ok(Err(err)) => {
                warn!(namespace = namespace.as_str(), key, error = %err, "cache exists failed");
                false
            }
            Err(_) => false,
        }
    }

    pub async fn delete(&self, namespace: CacheNamespace, key: &str) {
        match timeout(self.op_timeout, self.backend.delete(namespace, key)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(namespace = namespace.as_str(), key, error = %err, "cache delete failed");
            }
            Err(_) => warn!(namespace = namespace.as_str(), key, "cache delete timed out"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::CacheError;
    use async_trait::async_trait;
    use serde::Deserialize;

    struct BrokenBackend;

    #[async_trait]
    impl CacheBackend for BrokenBackend {
        async fn get(&self, _: CacheNamespace, _: &str) -> Result<Option<Vec<u8>>, CacheError> {
            Err(CacheError("down".to_string()))
        }
        async fn set(
            &self,
            _: CacheNamespace,
            _: &str,
            _: Vec<u8>,
            _: Duration,
        ) -> Result<(), CacheError> {
            Err(CacheError("down".to_string()))
        }
        async fn exists(&self, _: CacheNamespace, _: &str) -> Result<bool, CacheError> {
            Err(CacheError("down".to_string()))
        }
        async fn delete(&self, _: CacheNamespace, _: &str) -> Result<(), CacheError> {
            Err(CacheError("down".to_string()))
        }
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        id: String,
        count: u64,
    }

    #[tokio::test]
    async fn typed_values_round_trip_through_the_backend() {
        let cache = ResponseCache::new(
            Arc::new(MemoryCache::new(4)),
            Duration::from_secs(1),
            Duration::from_secs(60),
        );
        let value = Sample {
            id: "NGEN000611".to_string(),
            count: 7,
        };
        cache.set(CacheNamespace::Filer, "k", &value).await;
        assert_eq!(cache.get::<Sample>(CacheNamespace::Filer, "k").await, Some(value));
        assert_eq!(cache.get::<Vec<u64>>(CacheNamespace::Filer, "k").await, None);
    }

    #[tokio::test]
    async fn broken_backend_fails_open() {
        let cache = ResponseCache::new(
            Arc::new(BrokenBackend),
            Duration::from_secs(1),
            Duration::from_secs(60),
        );
        cache.set(CacheNamespace::Filer, "k", &1_u64).await;
        assert_eq!(cache.get::<u64>(CacheNamespace::Filer, "k").await, None);
        assert!(!cache.exists(CacheNamespace::Filer, "k").await);
        cache.delete(CacheNamespace::Filer, "k").await;
    }
}

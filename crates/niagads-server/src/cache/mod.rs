// SPDX-License-Identifier: Apache-2.0

//! Namespaced byte caches and the typed layers built on them.

mod cursor;
mod memory;
mod redis_backend;
mod response;

pub use cursor::{CursorCache, ResolvedPage};
pub use memory::MemoryCache;
pub use redis_backend::{RedisCache, RedisPolicy};
pub use response::ResponseCache;

use crate::CacheError;
use async_trait::async_trait;
use niagads_core::CacheNamespace;
use std::time::Duration;

/// Key/value store addressed by `(namespace, key)` with per-entry expiry.
#[async_trait]
pub trait CacheBackend: Send + Sync + 'static {
    async fn get(&self, namespace: CacheNamespace, key: &str)
        -> Result<Option<Vec<u8>>, CacheError>;

    async fn set(
        &self,
        namespace: CacheNamespace,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), CacheError>;

    async fn exists(&self, namespace: CacheNamespace, key: &str) -> Result<bool, CacheError>;

    async fn delete(&self, namespace: CacheNamespace, key: &str) -> Result<(), CacheError>;
}

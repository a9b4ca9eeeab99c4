// SPDX-License-Identifier: Apache-2.0

use super::CacheBackend;
use crate::CacheError;
use async_trait::async_trait;
use niagads_core::CacheNamespace;
use redis::AsyncCommands;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::warn;

#[derive(Clone, Debug)]
pub struct RedisPolicy {
    pub timeout: Duration,
    pub retry_attempts: usize,
    pub breaker_failure_threshold: u32,
    pub breaker_open_duration: Duration,
    pub max_key_bytes: usize,
}

impl Default for RedisPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(250),
            retry_attempts: 2,
            breaker_failure_threshold: 8,
            breaker_open_duration: Duration::from_millis(3000),
            max_key_bytes: 512,
        }
    }
}

#[derive(Default)]
struct RedisBreakerState {
    failure_count: u32,
    open_until: Option<Instant>,
}

/// Shared cache in Redis; keys are `<prefix>:<namespace>:<key>`.
#[derive(Clone)]
pub struct RedisCache {
    client: redis::Client,
    prefix: String,
    policy: RedisPolicy,
    breaker: Arc<Mutex<RedisBreakerState>>,
}

impl RedisCache {
    pub fn new(url: &str, prefix: &str, policy: RedisPolicy) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(|e| CacheError(e.to_string()))?;
        Ok(Self {
            client,
            prefix: prefix.to_string(),
            policy,
            breaker: Arc::new(Mutex::new(RedisBreakerState::default())),
        })
    }

    fn full_key(&self, namespace: CacheNamespace, key: &str) -> Result<String, CacheError> {
        if key.len() > self.policy.max_key_bytes {
            return Err(CacheError(format!(
                "cache key exceeds {} bytes",
                self.policy.max_key_bytes
            )));
        }
        Ok(format!("{}:{}:{key}", self.prefix, namespace.as_str()))
    }

    async fn breaker_check(&self) -> Result<(), CacheError> {
        let lock = self.breaker.lock().await;
        if let Some(until) = lock.open_until {
            if Instant::now() < until {
                return Err(CacheError("redis breaker open".to_string()));
            }
        }
        Ok(())
    }

    async fn record_failure(&self, msg: String) -> CacheError {
        let mut lock = self.breaker.lock().await;
        lock.failure_count += 1;
        if lock.failure_count >= self.policy.breaker_failure_threshold {
            lock.open_until = Some(Instant::now() + self.policy.breaker_open_duration);
            warn!(
                failures = lock.failure_count,
                "redis breaker opened after repeated failures"
            );
        }
        CacheError(msg)
    }

    async fn record_success(&self) {
        let mut lock = self.breaker.lock().await;
        lock.failure_count = 0;
        lock.open_until = None;
    }

    async fn with_retry<T, Fut, F>(&self, mut op: F) -> Result<T, String>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, String>>,
    {
        let attempts = self.policy.retry_attempts.max(1);
        let mut last = None;
        for i in 0..attempts {
            match timeout(self.policy.timeout, op()).await {
                Ok(Ok(v)) => return Ok(v),
                Ok(Err(e)) => last = Some(e),
                Err(_) => last = Some("redis timeout".to_string()),
            }
            if i + 1 < attempts {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        }
        Err(last.unwrap_or_else(|| "redis failure".to_string()))
    }

    async fn finish<T>(&self, result: Result<T, String>) -> Result<T, CacheError> {
        match result {
            Ok(v) => {
                self.record_success().await;
                Ok(v)
            }
            Err(e) => Err(self.record_failure(e).await),
        }
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, String> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn get(
        &self,
        namespace: CacheNamespace,
        key: &str,
    ) -> Result<Option<Vec<u8>>, CacheError> {
        self.breaker_check().await?;
        let cache_key = self.full_key(namespace, key)?;
        let result = self
            .with_retry(|| {
                let cache_key = cache_key.clone();
                async move {
                    let mut conn = self.connection().await?;
                    conn.get::<_, Option<Vec<u8>>>(cache_key)
                        .await
                        .map_err(|e| e.to_string())
                }
            })
            .await;
        self.finish(result).await
    }

    async fn set(
        &self,
        namespace: CacheNamespace,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.breaker_check().await?;
        let cache_key = self.full_key(namespace, key)?;
        let ttl_secs = ttl.as_secs().max(1);
        let result = self
            .with_retry(|| {
                let cache_key = cache_key.clone();
                let payload = value.clone();
                async move {
                    let mut conn = self.connection().await?;
                    let _: () = conn
                        .set_ex(cache_key, payload, ttl_secs)
                        .await
                        .map_err(|e| e.to_string())?;
                    Ok(())
                }
            })
            .await;
        self.finish(result).await
    }

    async fn exists(&self, namespace: CacheNamespace, key: &str) -> Result<bool, CacheError> {
        self.breaker_check().await?;
        let cache_key = self.full_key(namespace, key)?;
        let result = self
            .with_retry(|| {
                let cache_key = cache_key.clone();
                async move {
                    let mut conn = self.connection().await?;
                    conn.exists::<_, bool>(cache_key)
                        .await
                        .map_err(|e| e.to_string())
                }
            })
            .await;
        self.finish(result).await
    }

    async fn delete(&self, namespace: CacheNamespace, key: &str) -> Result<(), CacheError> {
        self.breaker_check().await?;
        let cache_key = self.full_key(namespace, key)?;
        let result = self
            .with_retry(|| {
                let cache_key = cache_key.clone();
                async move {
                    let mut conn = self.connection().await?;
                    let _: () = conn.del(cache_key).await.map_err(|e| e.to_string())?;
                    Ok(())
                }
            })
            .await;
        self.finish(result).await
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Distributed key-value cache.
//!
//! The cache holds two kinds of state:
//! - disposable projections of Postgres rows (cache-aside reads)
//! - authoritative short-lived records (session liveness, verification codes)
//!
//! Every primitive that needs atomicity (`set_if_absent`,
//! `increment_with_ttl`, `compare_and_delete`) is atomic in the backend
//! itself; callers never lock around cache access.

pub mod memory;
pub mod redis;

pub use self::memory::MemoryCache;
pub use self::redis::RedisCache;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

/// Cache failures. A miss is not an error: `get` returns `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    #[error("cache operation timed out")]
    Timeout,

    #[error("corrupt cache entry at {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Key-value cache with TTLs and atomic counter/compare primitives.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Fetch a value. `Ok(None)` is a miss (absent or expired).
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store a value, replacing any previous value and TTL.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Store a value only if the key is absent. Returns whether it was stored.
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, CacheError>;

    /// Remove a key. Returns whether a live key was removed.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Atomically increment a counter, creating it at 1 with `ttl` if absent.
    ///
    /// The TTL is only applied when the counter is created.
    async fn increment_with_ttl(&self, key: &str, ttl: Duration) -> Result<i64, CacheError>;

    /// Atomically delete `key` if its current value equals `expected`.
    ///
    /// Of several concurrent callers with the same `expected`, at most one
    /// observes `true`.
    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool, CacheError>;
}

/// Fetch and decode a JSON value.
pub async fn get_json<T: DeserializeOwned>(
    cache: &dyn Cache,
    key: &str,
) -> Result<Option<T>, CacheError> {
    let Some(raw) = cache.get(key).await? else {
        return Ok(None);
    };

    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| CacheError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })
}

/// Encode and store a JSON value.
pub async fn set_json<T: Serialize>(
    cache: &dyn Cache,
    key: &str,
    value: &T,
    ttl: Duration,
) -> Result<(), CacheError> {
    let raw = serde_json::to_string(value).map_err(|e| CacheError::Corrupt {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    cache.set(key, &raw, ttl).await
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cache-aside repositories.
//!
//! Reads look in the cache first and fall through to the store only on a
//! miss. Writes go to the store first and then delete the cached projection;
//! the cache is never updated in place.

pub mod daily_summary;
pub mod user;

pub use daily_summary::DailySummaryRepository;
pub use user::UserRepository;

use crate::cache::{self, Cache};
use crate::error::{AppError, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Lifetime of a cached entity projection.
pub const ENTITY_TTL: Duration = Duration::from_secs(15 * 60);

/// Shared read-through / invalidate logic for one entity type.
#[derive(Clone)]
pub struct CacheAside {
    cache: Arc<dyn Cache>,
    ttl: Duration,
}

impl CacheAside {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self::with_ttl(cache, ENTITY_TTL)
    }

    pub fn with_ttl(cache: Arc<dyn Cache>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    /// Return the cached value for `key`, or load it and populate the cache.
    ///
    /// A cache error other than a miss is returned without consulting the
    /// loader. A failure to populate after a successful load is logged and
    /// the loaded value still returned.
    pub async fn read_through<T, F, Fut>(&self, key: &str, load: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(hit) = cache::get_json::<T>(self.cache.as_ref(), key).await? {
            tracing::debug!(key, "Cache hit");
            return Ok(hit);
        }

        tracing::debug!(key, "Cache miss");
        let value = load().await?;

        if let Err(e) = cache::set_json(self.cache.as_ref(), key, &value, self.ttl).await {
            tracing::warn!(key, error = %e, "Failed to populate cache");
        }

        Ok(value)
    }

    /// Drop the cached projection for `key`.
    pub async fn invalidate(&self, key: &str) -> Result<()> {
        self.cache.delete(key).await.map_err(AppError::from)?;
        Ok(())
    }
}

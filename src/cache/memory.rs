// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process cache backed by `DashMap`.
//!
//! Used by tests and single-instance development runs. Each primitive holds
//! the shard lock for its key for the whole read-modify-write, which gives
//! the same per-key atomicity Redis provides.

use super::{Cache, CacheError};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
struct CachedEntry {
    value: String,
    expires_at: Instant,
}

impl CachedEntry {
    fn new(value: String, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-memory cache with per-entry expiry.
#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<DashMap<String, CachedEntry>>,
    ops: Arc<AtomicUsize>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cache operations served so far.
    pub fn op_count(&self) -> usize {
        self.ops.load(Ordering::SeqCst)
    }

    /// Whether a live (non-expired) entry exists. Does not count as an op.
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .map(|entry| !entry.is_expired())
            .unwrap_or(false)
    }

    fn record_op(&self) {
        self.ops.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.record_op();

        // Drop expired entries on read so `contains` stays accurate
        let removed = self.entries.remove_if(key, |_, entry| entry.is_expired());
        if removed.is_some() {
            return Ok(None);
        }

        Ok(self.entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.record_op();
        self.entries
            .insert(key.to_string(), CachedEntry::new(value.to_string(), ttl));
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        self.record_op();
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if !occupied.get().is_expired() {
                    return Ok(false);
                }
                occupied.insert(CachedEntry::new(value.to_string(), ttl));
                Ok(true)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(CachedEntry::new(value.to_string(), ttl));
                Ok(true)
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        self.record_op();
        Ok(self
            .entries
            .remove(key)
            .map(|(_, entry)| !entry.is_expired())
            .unwrap_or(false))
    }

    async fn increment_with_ttl(&self, key: &str, ttl: Duration) -> Result<i64, CacheError> {
        self.record_op();
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) if !occupied.get().is_expired() => {
                let current: i64 =
                    occupied
                        .get()
                        .value
                        .parse()
                        .map_err(|e: std::num::ParseIntError| CacheError::Corrupt {
                            key: key.to_string(),
                            reason: e.to_string(),
                        })?;
                let next = current + 1;
                occupied.get_mut().value = next.to_string();
                Ok(next)
            }
            Entry::Occupied(mut occupied) => {
                occupied.insert(CachedEntry::new("1".to_string(), ttl));
                Ok(1)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(CachedEntry::new("1".to_string(), ttl));
                Ok(1)
            }
        }
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool, CacheError> {
        self.record_op();
        let removed = self
            .entries
            .remove_if(key, |_, entry| !entry.is_expired() && entry.value == expected);
        Ok(removed.is_some())
    }
}

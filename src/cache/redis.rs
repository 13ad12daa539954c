// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Redis cache backend over a `deadpool-redis` connection pool.

use super::{Cache, CacheError};
use async_trait::async_trait;
use deadpool_redis::{Config as PoolConfig, Connection, Pool, Runtime};
use redis::AsyncCommands;
use std::future::Future;
use std::time::Duration;

/// INCR, attaching the TTL only when the counter was just created.
const INCREMENT_WITH_TTL: &str = r"
local n = redis.call('INCR', KEYS[1])
if n == 1 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
return n
";

/// DEL only if the stored value still matches.
const COMPARE_AND_DELETE: &str = r"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
";

#[derive(Clone)]
pub struct RedisCache {
    pool: Pool,
    op_timeout: Duration,
    increment_script: redis::Script,
    compare_delete_script: redis::Script,
}

impl RedisCache {
    pub fn new(pool: Pool, op_timeout: Duration) -> Self {
        Self {
            pool,
            op_timeout,
            increment_script: redis::Script::new(INCREMENT_WITH_TTL),
            compare_delete_script: redis::Script::new(COMPARE_AND_DELETE),
        }
    }

    /// Build a pool for `url` and verify a connection can be checked out.
    pub async fn connect(url: &str, op_timeout: Duration) -> Result<Self, CacheError> {
        let mut config = PoolConfig::from_url(url);
        if let Some(ref mut pool_config) = config.pool {
            pool_config.timeouts.wait = Some(op_timeout);
            pool_config.timeouts.create = Some(op_timeout);
            pool_config.timeouts.recycle = Some(op_timeout);
        }

        let pool = config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;

        let cache = Self::new(pool, op_timeout);
        let _ = cache.conn().await?;
        tracing::info!("Connected to Redis");

        Ok(cache)
    }

    async fn conn(&self) -> Result<Connection, CacheError> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))
    }

    /// Run one cache round trip under the per-operation deadline.
    async fn bounded<T, F>(&self, op: &'static str, key: &str, fut: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => {
                if let Err(ref e) = result {
                    tracing::warn!(op, key, error = %e, "Redis operation failed");
                }
                result
            }
            Err(_) => {
                tracing::warn!(
                    op,
                    key,
                    timeout_ms = self.op_timeout.as_millis() as u64,
                    "Redis operation timed out"
                );
                Err(CacheError::Timeout)
            }
        }
    }
}

fn redis_err(e: redis::RedisError) -> CacheError {
    CacheError::Unavailable(e.to_string())
}

fn ttl_millis(ttl: Duration) -> u64 {
    // PX 0 is rejected by Redis
    (ttl.as_millis() as u64).max(1)
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.bounded("get", key, async {
            let mut conn = self.conn().await?;
            conn.get::<_, Option<String>>(key).await.map_err(redis_err)
        })
        .await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.bounded("set", key, async {
            let mut conn = self.conn().await?;
            conn.pset_ex::<_, _, ()>(key, value, ttl_millis(ttl))
                .await
                .map_err(redis_err)
        })
        .await
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        self.bounded("set_if_absent", key, async {
            let mut conn = self.conn().await?;
            let reply: Option<String> = redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("NX")
                .arg("PX")
                .arg(ttl_millis(ttl))
                .query_async(&mut conn)
                .await
                .map_err(redis_err)?;
            Ok(reply.is_some())
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        self.bounded("delete", key, async {
            let mut conn = self.conn().await?;
            let removed: i64 = conn.del(key).await.map_err(redis_err)?;
            Ok(removed > 0)
        })
        .await
    }

    async fn increment_with_ttl(&self, key: &str, ttl: Duration) -> Result<i64, CacheError> {
        self.bounded("increment_with_ttl", key, async {
            let mut conn = self.conn().await?;
            let count: i64 = self
                .increment_script
                .key(key)
                .arg(ttl_millis(ttl))
                .invoke_async(&mut conn)
                .await
                .map_err(redis_err)?;
            Ok(count)
        })
        .await
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool, CacheError> {
        self.bounded("compare_and_delete", key, async {
            let mut conn = self.conn().await?;
            let removed: i64 = self
                .compare_delete_script
                .key(key)
                .arg(expected)
                .invoke_async(&mut conn)
                .await
                .map_err(redis_err)?;
            Ok(removed > 0)
        })
        .await
    }
}

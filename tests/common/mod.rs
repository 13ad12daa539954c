// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use std::sync::Arc;
use std::time::Duration;
use swingtrack::cache::{Cache, CacheError, MemoryCache};
use swingtrack::config::Config;
use swingtrack::db::MemoryStore;
use swingtrack::routes::create_router;
use swingtrack::services::{CodeSettings, MemorySmsSender};
use swingtrack::{AppState, Backends};

#[allow(dead_code)]
pub const TEST_UA: &str = "SwingTrack/2.1 (iPhone; iOS 17.4)";

/// Check if an integration backend is configured via environment variable.
#[allow(dead_code)]
pub fn env_available(name: &str) -> bool {
    std::env::var(name).is_ok()
}

/// Skip test with message if the named environment variable is not set.
#[macro_export]
macro_rules! require_env {
    ($name:expr) => {
        if !crate::common::env_available($name) {
            eprintln!("⚠️  Skipping: {} not set", $name);
            return;
        }
    };
}

/// Router plus handles on every in-memory collaborator.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub cache: MemoryCache,
    pub store: MemoryStore,
    pub sms: MemorySmsSender,
}

/// Create a test app with in-memory dependencies.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with(CodeSettings::default())
}

#[allow(dead_code)]
pub fn create_test_app_with(code_settings: CodeSettings) -> TestApp {
    let cache = MemoryCache::new();
    let store = MemoryStore::new();
    let sms = MemorySmsSender::new();

    let state = Arc::new(
        AppState::with_code_settings(
            Config::test_default(),
            Backends {
                cache: Arc::new(cache.clone()),
                users: Arc::new(store.clone()),
                summaries: Arc::new(store.clone()),
                sms: Arc::new(sms.clone()),
            },
            code_settings,
        )
        .unwrap(),
    );

    TestApp {
        router: create_router(state.clone()),
        state,
        cache,
        store,
        sms,
    }
}

/// Create a test app whose cache always fails.
#[allow(dead_code)]
pub fn create_app_with_failing_cache(failure: fn() -> CacheError) -> (axum::Router, MemoryStore) {
    let store = MemoryStore::new();
    let state = Arc::new(
        AppState::new(
            Config::test_default(),
            Backends {
                cache: Arc::new(FailingCache::new(failure)),
                users: Arc::new(store.clone()),
                summaries: Arc::new(store.clone()),
                sms: Arc::new(MemorySmsSender::new()),
            },
        )
        .unwrap(),
    );
    (create_router(state), store)
}

/// Create a test app from an explicit config and cache.
#[allow(dead_code)]
pub fn create_app_with_cache(config: Config, cache: Arc<dyn Cache>) -> axum::Router {
    let store = MemoryStore::new();
    let state = Arc::new(
        AppState::new(
            config,
            Backends {
                cache,
                users: Arc::new(store.clone()),
                summaries: Arc::new(store),
                sms: Arc::new(MemorySmsSender::new()),
            },
        )
        .unwrap(),
    );
    create_router(state)
}

/// A cache that stalls for `delay` before every operation.
#[allow(dead_code)]
pub struct SlowCache {
    pub inner: MemoryCache,
    pub delay: Duration,
}

#[async_trait]
impl Cache for SlowCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        tokio::time::sleep(self.delay).await;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        tokio::time::sleep(self.delay).await;
        self.inner.set(key, value, ttl).await
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        tokio::time::sleep(self.delay).await;
        self.inner.set_if_absent(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        tokio::time::sleep(self.delay).await;
        self.inner.delete(key).await
    }

    async fn increment_with_ttl(&self, key: &str, ttl: Duration) -> Result<i64, CacheError> {
        tokio::time::sleep(self.delay).await;
        self.inner.increment_with_ttl(key, ttl).await
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool, CacheError> {
        tokio::time::sleep(self.delay).await;
        self.inner.compare_and_delete(key, expected).await
    }
}

/// A cache whose every operation fails with the given error.
#[allow(dead_code)]
pub struct FailingCache {
    failure: fn() -> CacheError,
}

#[allow(dead_code)]
impl FailingCache {
    pub fn new(failure: fn() -> CacheError) -> Self {
        Self { failure }
    }

    pub fn unavailable() -> CacheError {
        CacheError::Unavailable("connection refused".to_string())
    }

    pub fn timeout() -> CacheError {
        CacheError::Timeout
    }
}

#[async_trait]
impl Cache for FailingCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err((self.failure)())
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
        Err((self.failure)())
    }

    async fn set_if_absent(
        &self,
        _key: &str,
        _value: &str,
        _ttl: Duration,
    ) -> Result<bool, CacheError> {
        Err((self.failure)())
    }

    async fn delete(&self, _key: &str) -> Result<bool, CacheError> {
        Err((self.failure)())
    }

    async fn increment_with_ttl(&self, _key: &str, _ttl: Duration) -> Result<i64, CacheError> {
        Err((self.failure)())
    }

    async fn compare_and_delete(&self, _key: &str, _expected: &str) -> Result<bool, CacheError> {
        Err((self.failure)())
    }
}

/// A cache that reads normally but refuses writes (`set` only).
#[allow(dead_code)]
pub struct ReadOnlyCache {
    pub inner: MemoryCache,
}

#[async_trait]
impl Cache for ReadOnlyCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.inner.get(key).await
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("read-only replica".to_string()))
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        self.inner.set_if_absent(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        self.inner.delete(key).await
    }

    async fn increment_with_ttl(&self, key: &str, ttl: Duration) -> Result<i64, CacheError> {
        self.inner.increment_with_ttl(key, ttl).await
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool, CacheError> {
        self.inner.compare_and_delete(key, expected).await
    }
}

/// Build a JSON POST request, optionally with a bearer token.
#[allow(dead_code)]
pub fn post_json(uri: &str, body: serde_json::Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::USER_AGENT, TEST_UA);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Build a GET request, optionally with a bearer token.
#[allow(dead_code)]
pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::USER_AGENT, TEST_UA);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[allow(dead_code)]
pub fn header_str(response: &Response<Body>, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

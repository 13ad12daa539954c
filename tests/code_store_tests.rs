// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

mod common;

use async_trait::async_trait;
use common::FailingCache;
use std::sync::Arc;
use std::time::Duration;
use swingtrack::cache::{Cache, CacheError, MemoryCache};
use swingtrack::services::{CodeError, CodeService, CodeSettings, CodeStore, MemorySmsSender};

const BIZ: &str = "login";
const PHONE: &str = "13912345678";

fn store() -> (CodeStore, MemoryCache) {
    let cache = MemoryCache::new();
    (
        CodeStore::new(Arc::new(cache.clone()), CodeSettings::default()),
        cache,
    )
}

fn short_settings() -> CodeSettings {
    CodeSettings {
        validity: Duration::from_millis(400),
        cooldown: Duration::from_millis(100),
        ..CodeSettings::default()
    }
}

/// Any code other than `code` of the same width.
fn wrong(code: &str) -> String {
    if code == "000000" {
        "111111".to_string()
    } else {
        "000000".to_string()
    }
}

#[tokio::test]
async fn test_correct_code_verifies_once() {
    let (codes, _) = store();
    let code = codes.send(BIZ, PHONE).await.unwrap();

    assert!(codes.verify(BIZ, PHONE, &code).await.unwrap());
    assert!(!codes.verify(BIZ, PHONE, &code).await.unwrap());
}

#[tokio::test]
async fn test_wrong_code_fails() {
    let (codes, _) = store();
    let code = codes.send(BIZ, PHONE).await.unwrap();
    assert!(!codes.verify(BIZ, PHONE, &wrong(&code)).await.unwrap());
    assert!(codes.verify(BIZ, PHONE, &code).await.unwrap());
}

#[tokio::test]
async fn test_verify_without_code_is_false() {
    let (codes, _) = store();
    assert!(!codes.verify(BIZ, PHONE, "123456").await.unwrap());
}

#[tokio::test]
async fn test_exhausted_attempts_lock_out_correct_code() {
    let (codes, _) = store();
    let code = codes.send(BIZ, PHONE).await.unwrap();
    let bad = wrong(&code);

    for _ in 0..3 {
        assert!(!codes.verify(BIZ, PHONE, &bad).await.unwrap());
    }
    assert!(matches!(
        codes.verify(BIZ, PHONE, &code).await,
        Err(CodeError::TooManyAttempts)
    ));
}

#[tokio::test]
async fn test_resend_within_cooldown_is_rate_limited() {
    let (codes, _) = store();
    codes.send(BIZ, PHONE).await.unwrap();
    assert!(matches!(
        codes.send(BIZ, PHONE).await,
        Err(CodeError::RateLimited)
    ));

    // Other phones and other business contexts are independent
    codes.send(BIZ, "13912345679").await.unwrap();
    codes.send("bind_phone", PHONE).await.unwrap();
}

#[tokio::test]
async fn test_resend_after_cooldown_replaces_code_and_resets_attempts() {
    let cache = MemoryCache::new();
    let codes = CodeStore::new(Arc::new(cache), short_settings());

    let first = codes.send(BIZ, PHONE).await.unwrap();
    for _ in 0..3 {
        assert!(!codes.verify(BIZ, PHONE, &wrong(&first)).await.unwrap());
    }

    tokio::time::sleep(Duration::from_millis(150)).await;
    let second = codes.send(BIZ, PHONE).await.unwrap();

    if first != second {
        assert!(!codes.verify(BIZ, PHONE, &first).await.unwrap());
    }
    assert!(codes.verify(BIZ, PHONE, &second).await.unwrap());
}

#[tokio::test]
async fn test_code_expires_after_validity() {
    let cache = MemoryCache::new();
    let codes = CodeStore::new(Arc::new(cache), short_settings());

    let code = codes.send(BIZ, PHONE).await.unwrap();
    tokio::time::sleep(Duration::from_millis(450)).await;
    assert!(!codes.verify(BIZ, PHONE, &code).await.unwrap());
}

#[tokio::test]
async fn test_concurrent_correct_verifies_succeed_exactly_once() {
    let (codes, _) = store();
    let code = codes.send(BIZ, PHONE).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..3 {
        let codes = codes.clone();
        let code = code.clone();
        handles.push(tokio::spawn(async move {
            codes.verify(BIZ, PHONE, &code).await.unwrap()
        }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);
}

#[tokio::test]
async fn test_concurrent_sends_issue_one_code() {
    let (codes, _) = store();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let codes = codes.clone();
        handles.push(tokio::spawn(async move { codes.send(BIZ, PHONE).await }));
    }

    let mut sent = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => sent += 1,
            Err(CodeError::RateLimited) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(sent, 1);
}

/// Memory cache whose deletes of attempt counters fail.
struct StickyCounterCache {
    inner: MemoryCache,
}

#[async_trait]
impl Cache for StickyCounterCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.inner.set(key, value, ttl).await
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
        if key.ends_with(":attempts") && self.inner.contains(key) {
            return Err(CacheError::Unavailable("connection reset".to_string()));
        }
        self.inner.delete(key).await
    }

    async fn increment_with_ttl(&self, key: &str, ttl: Duration) -> Result<i64, CacheError> {
        self.inner.increment_with_ttl(key, ttl).await
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool, CacheError> {
        self.inner.compare_and_delete(key, expected).await
    }
}

#[tokio::test]
async fn test_verify_succeeds_when_counter_reset_fails() {
    let inner = MemoryCache::new();
    let codes = CodeStore::new(
        Arc::new(StickyCounterCache {
            inner: inner.clone(),
        }),
        CodeSettings::default(),
    );

    let code = codes.send(BIZ, PHONE).await.unwrap();
    assert!(codes.verify(BIZ, PHONE, &code).await.unwrap());

    // Consumed even though the counter survived
    assert!(!inner.contains(&format!("phone_code:{BIZ}:{PHONE}")));
    assert!(inner.contains(&format!("phone_code:{BIZ}:{PHONE}:attempts")));
}

#[tokio::test]
async fn test_cache_outage_propagates() {
    let codes = CodeStore::new(
        Arc::new(FailingCache::new(FailingCache::unavailable)),
        CodeSettings::default(),
    );
    assert!(matches!(
        codes.send(BIZ, PHONE).await,
        Err(CodeError::Cache(_))
    ));
    assert!(matches!(
        codes.verify(BIZ, PHONE, "123456").await,
        Err(CodeError::Cache(_))
    ));
}

#[tokio::test]
async fn test_service_delivers_code_by_sms() {
    let sms = MemorySmsSender::new();
    let (store, _) = store();
    let service = CodeService::new(store, Arc::new(sms.clone()));

    service.send(BIZ, PHONE).await.unwrap();

    let sent = sms.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].phone, PHONE);
    assert_eq!(sent[0].params[1], "10");

    let code = sms.last_code_for(PHONE).unwrap();
    assert!(service.verify(BIZ, PHONE, &code).await.unwrap());
}

#[tokio::test]
async fn test_service_keeps_code_when_delivery_fails() {
    let cache = MemoryCache::new();
    let service = CodeService::new(
        CodeStore::new(Arc::new(cache.clone()), CodeSettings::default()),
        Arc::new(MemorySmsSender::failing()),
    );

    service.send(BIZ, PHONE).await.unwrap();
    assert!(cache.contains(&format!("phone_code:{BIZ}:{PHONE}")));
}

#[tokio::test]
async fn test_service_reports_exhausted_attempts_as_false() {
    let sms = MemorySmsSender::new();
    let (store, _) = store();
    let service = CodeService::new(store, Arc::new(sms.clone()));

    service.send(BIZ, PHONE).await.unwrap();
    let code = sms.last_code_for(PHONE).unwrap();
    for _ in 0..3 {
        assert!(!service.verify(BIZ, PHONE, &wrong(&code)).await.unwrap());
    }
    assert!(!service.verify(BIZ, PHONE, &code).await.unwrap());
}

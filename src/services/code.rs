// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Verification codes sent by SMS.
//!
//! Per (biz, phone) the cache holds three keys:
//! - `phone_code:{biz}:{phone}`: the current code, TTL = validity window
//! - `phone_code:{biz}:{phone}:attempts`: verify attempts against that code
//! - `phone_code:{biz}:{phone}:cooldown`: present while a resend is refused
//!
//! All read-modify-write steps use the cache's own atomic primitives, so
//! concurrent requests for the same phone need no further coordination.

use crate::cache::{Cache, CacheError};
use crate::error::{AppError, Result};
use crate::services::sms::{SmsSender, LOGIN_CODE_TEMPLATE};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use subtle::ConstantTimeEq;

#[derive(Debug, Clone)]
pub struct CodeSettings {
    pub digits: u32,
    pub validity: Duration,
    /// Must be shorter than `validity`
    pub cooldown: Duration,
    pub max_attempts: i64,
}

impl Default for CodeSettings {
    fn default() -> Self {
        Self {
            digits: 6,
            validity: Duration::from_secs(10 * 60),
            cooldown: Duration::from_secs(60),
            max_attempts: 3,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CodeError {
    #[error("a code was sent too recently")]
    RateLimited,

    #[error("too many verification attempts")]
    TooManyAttempts,

    #[error(transparent)]
    Cache(#[from] CacheError),
}

struct CodeKeys {
    code: String,
    attempts: String,
    cooldown: String,
}

impl CodeKeys {
    fn new(biz: &str, phone: &str) -> Self {
        let code = format!("phone_code:{biz}:{phone}");
        Self {
            attempts: format!("{code}:attempts"),
            cooldown: format!("{code}:cooldown"),
            code,
        }
    }
}

/// Stores and checks codes. Knows nothing about delivery.
#[derive(Clone)]
pub struct CodeStore {
    cache: Arc<dyn Cache>,
    settings: CodeSettings,
}

impl CodeStore {
    pub fn new(cache: Arc<dyn Cache>, settings: CodeSettings) -> Self {
        Self { cache, settings }
    }

    pub fn settings(&self) -> &CodeSettings {
        &self.settings
    }

    /// Issue a fresh code for (biz, phone), replacing any previous one.
    pub async fn send(&self, biz: &str, phone: &str) -> std::result::Result<String, CodeError> {
        let keys = CodeKeys::new(biz, phone);

        let acquired = self
            .cache
            .set_if_absent(&keys.cooldown, "1", self.settings.cooldown)
            .await?;
        if !acquired {
            return Err(CodeError::RateLimited);
        }

        let code = generate_code(self.settings.digits);
        self.cache
            .set(&keys.code, &code, self.settings.validity)
            .await?;
        self.cache.delete(&keys.attempts).await?;

        Ok(code)
    }

    /// Check `input` against the stored code.
    ///
    /// A matching code is consumed. Once `max_attempts` checks have been
    /// made against one code, every further check fails with
    /// `TooManyAttempts` until a new code is sent.
    pub async fn verify(
        &self,
        biz: &str,
        phone: &str,
        input: &str,
    ) -> std::result::Result<bool, CodeError> {
        let keys = CodeKeys::new(biz, phone);

        let attempts = self
            .cache
            .increment_with_ttl(&keys.attempts, self.settings.validity)
            .await?;
        if attempts > self.settings.max_attempts {
            return Err(CodeError::TooManyAttempts);
        }

        let Some(stored) = self.cache.get(&keys.code).await? else {
            return Ok(false);
        };

        if !bool::from(stored.as_bytes().ct_eq(input.as_bytes())) {
            return Ok(false);
        }

        // Only one concurrent verifier can claim the code
        if !self.cache.compare_and_delete(&keys.code, &stored).await? {
            return Ok(false);
        }

        // The code is already spent; a stale counter expires on its own
        if let Err(e) = self.cache.delete(&keys.attempts).await {
            tracing::warn!(biz, error = %e, "Failed to reset verification attempts");
        }
        Ok(true)
    }
}

/// Uniform zero-padded numeric code.
fn generate_code(digits: u32) -> String {
    let upper = 10u64.pow(digits);
    let n = rand::thread_rng().gen_range(0..upper);
    format!("{n:0width$}", width = digits as usize)
}

/// Code issuance plus SMS delivery.
#[derive(Clone)]
pub struct CodeService {
    store: CodeStore,
    sms: Arc<dyn SmsSender>,
}

impl CodeService {
    pub fn new(store: CodeStore, sms: Arc<dyn SmsSender>) -> Self {
        Self { store, sms }
    }

    /// Issue a code and hand it to the SMS sender.
    ///
    /// A delivery failure does not undo the stored code.
    pub async fn send(&self, biz: &str, phone: &str) -> Result<()> {
        let code = self.store.send(biz, phone).await?;

        let minutes = (self.store.settings().validity.as_secs() / 60).to_string();
        if let Err(e) = self
            .sms
            .send(LOGIN_CODE_TEMPLATE, &[code, minutes], phone)
            .await
        {
            tracing::warn!(biz, error = %e, "Failed to deliver verification code");
        } else {
            tracing::info!(biz, "Verification code sent");
        }

        Ok(())
    }

    /// `Ok(false)` for a wrong, expired, consumed or exhausted code.
    pub async fn verify(&self, biz: &str, phone: &str, input: &str) -> Result<bool> {
        match self.store.verify(biz, phone, input).await {
            Err(CodeError::TooManyAttempts) => {
                tracing::warn!(biz, "Verification attempts exhausted");
                Ok(false)
            }
            other => other.map_err(AppError::from),
        }
    }
}

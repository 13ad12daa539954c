// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! A `.env` file is honored for local development.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend origin allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Postgres connection string
    pub database_url: String,
    /// Redis connection string
    pub redis_url: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    /// Deadline for a single cache round trip
    pub cache_op_timeout: Duration,
    /// Deadline for a whole HTTP request
    pub request_timeout: Duration,
    /// Requests one client address may make per minute; 0 disables
    pub rate_limit_per_minute: u32,

    // --- Secrets ---
    /// Root key from which the access and refresh signing keys are derived
    pub jwt_signing_key: Vec<u8>,
    /// SMS gateway credentials; codes are only logged as sent when absent
    pub twilio: Option<TwilioConfig>,
}

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let jwt_signing_key = required("JWT_SIGNING_KEY")?.into_bytes();
        if jwt_signing_key.len() < 32 {
            return Err(ConfigError::Invalid {
                name: "JWT_SIGNING_KEY",
                reason: "must be at least 32 bytes".to_string(),
            });
        }

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: optional("PORT", 8080)?,
            database_url: required("DATABASE_URL")?,
            redis_url: required("REDIS_URL")?,
            access_token_ttl: Duration::from_secs(
                optional::<u64>("ACCESS_TOKEN_TTL_MINUTES", 30)? * 60,
            ),
            refresh_token_ttl: Duration::from_secs(
                optional::<u64>("REFRESH_TOKEN_TTL_DAYS", 7)? * 24 * 60 * 60,
            ),
            cache_op_timeout: Duration::from_millis(optional("CACHE_OP_TIMEOUT_MS", 500)?),
            request_timeout: Duration::from_secs(optional("REQUEST_TIMEOUT_SECS", 10)?),
            rate_limit_per_minute: optional("RATE_LIMIT_PER_MINUTE", 100)?,
            jwt_signing_key,
            twilio: twilio_from_env(),
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            database_url: "postgres://localhost/swingtrack_test".to_string(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            access_token_ttl: Duration::from_secs(30 * 60),
            refresh_token_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            cache_op_timeout: Duration::from_millis(500),
            request_timeout: Duration::from_secs(10),
            rate_limit_per_minute: 100,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!!".to_vec(),
            twilio: None,
        }
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .map_err(|_| ConfigError::Missing(name))
}

fn optional<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

fn twilio_from_env() -> Option<TwilioConfig> {
    Some(TwilioConfig {
        account_sid: env::var("TWILIO_ACCOUNT_SID").ok()?,
        auth_token: env::var("TWILIO_AUTH_TOKEN").ok()?,
        from_number: env::var("TWILIO_FROM_NUMBER").ok()?,
    })
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

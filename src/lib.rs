// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! SwingTrack: backend for a badminton training tracker.
//!
//! This crate provides user sign-in (password and SMS code), revocable
//! JWT sessions, and cached access to per-day training summaries.
//! Postgres is the source of truth; Redis holds sessions, verification
//! codes and short-lived read projections.

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod services;
pub mod time_utils;

use cache::Cache;
use config::Config;
use db::{DailySummaryStore, UserStore};
use middleware::rate_limit::{IpRateLimiter, RATE_LIMIT_WINDOW};
use repository::{DailySummaryRepository, UserRepository};
use services::{
    AuthError, CodeService, CodeSettings, CodeStore, SessionManager, SmsSender, UserService,
};
use std::sync::Arc;

/// External collaborators the application is composed from.
pub struct Backends {
    pub cache: Arc<dyn Cache>,
    pub users: Arc<dyn UserStore>,
    pub summaries: Arc<dyn DailySummaryStore>,
    pub sms: Arc<dyn SmsSender>,
}

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub sessions: SessionManager,
    pub users: UserService,
    pub codes: CodeService,
    pub summaries: DailySummaryRepository,
    pub limiter: IpRateLimiter,
}

impl AppState {
    pub fn new(config: Config, backends: Backends) -> Result<Self, AuthError> {
        Self::with_code_settings(config, backends, CodeSettings::default())
    }

    pub fn with_code_settings(
        config: Config,
        backends: Backends,
        code_settings: CodeSettings,
    ) -> Result<Self, AuthError> {
        let Backends {
            cache,
            users,
            summaries,
            sms,
        } = backends;

        Ok(Self {
            sessions: SessionManager::new(&config, cache.clone())?,
            users: UserService::new(UserRepository::new(users, cache.clone())),
            codes: CodeService::new(CodeStore::new(cache.clone(), code_settings), sms),
            summaries: DailySummaryRepository::new(summaries, cache.clone()),
            limiter: IpRateLimiter::new(cache, config.rate_limit_per_minute, RATE_LIMIT_WINDOW),
            config,
        })
    }
}

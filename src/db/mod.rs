// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Durable storage (Postgres). The store is the source of truth for users
//! and daily summaries; the cache only ever holds projections of it.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::models::{DailySummary, NewUser, User, UserUpdate};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Table names as constants.
pub mod tables {
    pub const USERS: &str = "users";
    pub const DAILY_SUMMARY: &str = "daily_summary";
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    /// A unique constraint (account, phone, username) rejected the write
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("database error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: &NewUser) -> Result<User, StoreError>;

    async fn find_by_id(&self, id: i64) -> Result<User, StoreError>;

    async fn find_by_account(&self, account: &str) -> Result<User, StoreError>;

    async fn find_by_phone(&self, phone: &str) -> Result<User, StoreError>;

    /// Write the `Some` fields of `update`. `NotFound` if no row has that id.
    async fn update_non_zero(&self, update: &UserUpdate) -> Result<(), StoreError>;
}

#[async_trait]
pub trait DailySummaryStore: Send + Sync {
    async fn find_by_user_and_date(
        &self,
        user_id: i64,
        date: NaiveDate,
    ) -> Result<DailySummary, StoreError>;

    /// Insert or replace the row for `(summary.user_id, summary.date)`.
    async fn upsert(&self, summary: &DailySummary) -> Result<(), StoreError>;

    /// Fold all days in `[start, end]` (inclusive) into one record dated
    /// `start`. Counters are summed and the peak swing speed kept. An empty
    /// range yields a zeroed record.
    async fn aggregate_range(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DailySummary, StoreError>;
}

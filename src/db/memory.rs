// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process store for tests and local development.

use super::{DailySummaryStore, StoreError, UserStore};
use crate::models::{DailySummary, NewUser, User, UserUpdate};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct UserTable {
    next_id: i64,
    rows: Vec<User>,
}

impl UserTable {
    fn find(&self, pred: impl Fn(&User) -> bool) -> Result<User, StoreError> {
        self.rows
            .iter()
            .find(|u| pred(u))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn taken(&self, except: i64, pred: impl Fn(&User) -> bool) -> bool {
        self.rows.iter().any(|u| u.id != except && pred(u))
    }
}

/// Mirrors the Postgres constraints: unique account, phone and username.
#[derive(Clone, Default)]
pub struct MemoryStore {
    users: Arc<Mutex<UserTable>>,
    summaries: Arc<DashMap<(i64, NaiveDate), DailySummary>>,
    reads: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of read queries served (lookups and aggregates).
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::SeqCst);
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, UserTable>, StoreError> {
        self.users
            .lock()
            .map_err(|_| StoreError::Backend("user table lock poisoned".to_string()))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert(&self, user: &NewUser) -> Result<User, StoreError> {
        let mut table = self.lock()?;

        if let Some(account) = &user.account {
            if table.taken(0, |u| u.account.as_ref() == Some(account)) {
                return Err(StoreError::DuplicateKey("users_account_key".to_string()));
            }
        }
        if let Some(phone) = &user.phone {
            if table.taken(0, |u| u.phone.as_ref() == Some(phone)) {
                return Err(StoreError::DuplicateKey("users_phone_key".to_string()));
            }
        }

        table.next_id += 1;
        let now = Utc::now();
        let row = User {
            id: table.next_id,
            username: None,
            account: user.account.clone(),
            phone: user.phone.clone(),
            password_hash: user.password_hash.clone(),
            nickname: None,
            weight_kg: 0,
            height_cm: 0,
            birthday: None,
            about_me: None,
            created_at: now,
            updated_at: now,
        };
        table.rows.push(row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: i64) -> Result<User, StoreError> {
        self.record_read();
        self.lock()?.find(|u| u.id == id)
    }

    async fn find_by_account(&self, account: &str) -> Result<User, StoreError> {
        self.record_read();
        self.lock()?.find(|u| u.account.as_deref() == Some(account))
    }

    async fn find_by_phone(&self, phone: &str) -> Result<User, StoreError> {
        self.record_read();
        self.lock()?.find(|u| u.phone.as_deref() == Some(phone))
    }

    async fn update_non_zero(&self, update: &UserUpdate) -> Result<(), StoreError> {
        let mut table = self.lock()?;

        if let Some(username) = &update.username {
            if table.taken(update.id, |u| u.username.as_ref() == Some(username)) {
                return Err(StoreError::DuplicateKey("users_username_key".to_string()));
            }
        }

        let row = table
            .rows
            .iter_mut()
            .find(|u| u.id == update.id)
            .ok_or(StoreError::NotFound)?;
        update.apply_to(row, Utc::now());
        Ok(())
    }
}

#[async_trait]
impl DailySummaryStore for MemoryStore {
    async fn find_by_user_and_date(
        &self,
        user_id: i64,
        date: NaiveDate,
    ) -> Result<DailySummary, StoreError> {
        self.record_read();
        self.summaries
            .get(&(user_id, date))
            .map(|s| s.clone())
            .ok_or(StoreError::NotFound)
    }

    async fn upsert(&self, summary: &DailySummary) -> Result<(), StoreError> {
        self.summaries
            .insert((summary.user_id, summary.date), summary.clone());
        Ok(())
    }

    async fn aggregate_range(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DailySummary, StoreError> {
        self.record_read();
        let mut total = DailySummary::empty(user_id, start);
        for entry in self.summaries.iter() {
            let (uid, date) = *entry.key();
            if uid == user_id && date >= start && date <= end {
                total.accumulate(entry.value());
            }
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[tokio::test]
    async fn test_unique_account_and_phone() {
        let store = MemoryStore::new();
        store
            .insert(&NewUser::with_account("alice", "hash"))
            .await
            .unwrap();
        store.insert(&NewUser::with_phone("13800000000")).await.unwrap();

        let dup_account = store.insert(&NewUser::with_account("alice", "other")).await;
        assert!(matches!(dup_account, Err(StoreError::DuplicateKey(_))));

        let dup_phone = store.insert(&NewUser::with_phone("13800000000")).await;
        assert!(matches!(dup_phone, Err(StoreError::DuplicateKey(_))));
    }

    #[tokio::test]
    async fn test_update_missing_user_is_not_found() {
        let store = MemoryStore::new();
        let update = UserUpdate {
            id: 42,
            nickname: Some("ghost".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            store.update_non_zero(&update).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_aggregate_range_is_inclusive() {
        let store = MemoryStore::new();
        for (d, swings, speed) in [
            ("2024-03-01", 10, 150),
            ("2024-03-02", 20, 190),
            ("2024-03-03", 30, 170),
            ("2024-03-04", 40, 300),
        ] {
            store
                .upsert(&DailySummary {
                    user_id: 1,
                    date: date(d),
                    total_swings: swings,
                    max_swing_speed: speed,
                    ..Default::default()
                })
                .await
                .unwrap();
        }

        let agg = store
            .aggregate_range(1, date("2024-03-01"), date("2024-03-03"))
            .await
            .unwrap();
        assert_eq!(agg.total_swings, 60);
        assert_eq!(agg.max_swing_speed, 190);

        let none = store
            .aggregate_range(2, date("2024-03-01"), date("2024-03-03"))
            .await
            .unwrap();
        assert_eq!(none, DailySummary::empty(2, date("2024-03-01")));
    }
}

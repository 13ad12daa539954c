// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Postgres-backed store using runtime-checked `sqlx` queries.

use super::tables::{DAILY_SUMMARY, USERS};
use super::{DailySummaryStore, StoreError, UserStore};
use crate::models::{DailySummary, NewUser, User, UserUpdate};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::LazyLock;
use std::time::Duration;

const USER_COLUMNS: &str = "id, username, account, phone, password_hash, nickname, \
                            weight_kg, height_cm, birthday, about_me, created_at, updated_at";

/// Counter columns of `daily_summary`, in struct order.
const SUMMARY_COUNTERS: [&str; 17] = [
    "duration_seconds",
    "max_swing_speed",
    "total_swings",
    "racket_rotations",
    "forehand_clear",
    "backhand_clear",
    "forehand_lift",
    "backhand_lift",
    "forehand_net",
    "backhand_net",
    "forehand_smash",
    "backhand_smash",
    "forehand_drop",
    "backhand_drop",
    "forehand_drive",
    "backhand_drive",
    "pickup_count",
];

static SELECT_SUMMARY: LazyLock<String> = LazyLock::new(|| {
    format!(
        "SELECT user_id, summary_date AS date, {} FROM {DAILY_SUMMARY} \
         WHERE user_id = $1 AND summary_date = $2",
        SUMMARY_COUNTERS.join(", ")
    )
});

static UPSERT_SUMMARY: LazyLock<String> = LazyLock::new(|| {
    let placeholders: Vec<String> = (0..SUMMARY_COUNTERS.len())
        .map(|i| format!("${}", i + 3))
        .collect();
    let updates: Vec<String> = SUMMARY_COUNTERS
        .iter()
        .map(|c| format!("{c} = EXCLUDED.{c}"))
        .collect();
    format!(
        "INSERT INTO {DAILY_SUMMARY} (user_id, summary_date, {}) VALUES ($1, $2, {}) \
         ON CONFLICT (user_id, summary_date) DO UPDATE SET {}, updated_at = now()",
        SUMMARY_COUNTERS.join(", "),
        placeholders.join(", "),
        updates.join(", ")
    )
});

static AGGREGATE_SUMMARY: LazyLock<String> = LazyLock::new(|| {
    let folds: Vec<String> = SUMMARY_COUNTERS
        .iter()
        .map(|c| {
            let agg = if *c == "max_swing_speed" { "MAX" } else { "SUM" };
            format!("COALESCE({agg}({c}), 0)::BIGINT AS {c}")
        })
        .collect();
    format!(
        "SELECT $1::BIGINT AS user_id, $2::DATE AS date, {} FROM {DAILY_SUMMARY} \
         WHERE user_id = $1 AND summary_date BETWEEN $2 AND $3",
        folds.join(", ")
    )
});

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await
            .map_err(backend)?;
        tracing::info!("Connected to Postgres");
        Ok(Self::new(pool))
    }

    /// Apply pending migrations from `migrations/`.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn find_user_where(&self, column: &str, value: &str) -> Result<User, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM {USERS} WHERE {column} = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .ok_or(StoreError::NotFound)
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::DuplicateKey(db.constraint().unwrap_or("unique").to_string())
        }
        sqlx::Error::RowNotFound => StoreError::NotFound,
        _ => StoreError::Backend(e.to_string()),
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert(&self, user: &NewUser) -> Result<User, StoreError> {
        let query = format!(
            "INSERT INTO {USERS} (account, phone, password_hash) VALUES ($1, $2, $3) \
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&user.account)
            .bind(&user.phone)
            .bind(&user.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(backend)
    }

    async fn find_by_id(&self, id: i64) -> Result<User, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM {USERS} WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_account(&self, account: &str) -> Result<User, StoreError> {
        self.find_user_where("account", account).await
    }

    async fn find_by_phone(&self, phone: &str) -> Result<User, StoreError> {
        self.find_user_where("phone", phone).await
    }

    async fn update_non_zero(&self, update: &UserUpdate) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE users SET
                username = COALESCE($2, username),
                nickname = COALESCE($3, nickname),
                weight_kg = COALESCE($4, weight_kg),
                height_cm = COALESCE($5, height_cm),
                birthday = COALESCE($6, birthday),
                about_me = COALESCE($7, about_me),
                updated_at = now()
             WHERE id = $1",
        )
        .bind(update.id)
        .bind(&update.username)
        .bind(&update.nickname)
        .bind(update.weight_kg)
        .bind(update.height_cm)
        .bind(update.birthday)
        .bind(&update.about_me)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl DailySummaryStore for PgStore {
    async fn find_by_user_and_date(
        &self,
        user_id: i64,
        date: NaiveDate,
    ) -> Result<DailySummary, StoreError> {
        sqlx::query_as::<_, DailySummary>(SELECT_SUMMARY.as_str())
            .bind(user_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .ok_or(StoreError::NotFound)
    }

    async fn upsert(&self, summary: &DailySummary) -> Result<(), StoreError> {
        let mut query = sqlx::query(UPSERT_SUMMARY.as_str())
            .bind(summary.user_id)
            .bind(summary.date);
        for value in summary.counters() {
            query = query.bind(value);
        }
        query.execute(&self.pool).await.map_err(backend)?;
        Ok(())
    }

    async fn aggregate_range(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DailySummary, StoreError> {
        sqlx::query_as::<_, DailySummary>(AGGREGATE_SUMMARY.as_str())
            .bind(user_id)
            .bind(start)
            .bind(end)
            .fetch_one(&self.pool)
            .await
            .map_err(backend)
    }
}

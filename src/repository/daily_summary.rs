// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use super::CacheAside;
use crate::cache::Cache;
use crate::db::{DailySummaryStore, StoreError};
use crate::error::{AppError, Result};
use crate::models::DailySummary;
use crate::time_utils::format_date;
use chrono::NaiveDate;
use std::sync::Arc;

pub fn daily_summary_key(user_id: i64, date: NaiveDate) -> String {
    format!("daily_summary:{user_id}:{}", format_date(date))
}

#[derive(Clone)]
pub struct DailySummaryRepository {
    store: Arc<dyn DailySummaryStore>,
    cached: CacheAside,
}

impl DailySummaryRepository {
    pub fn new(store: Arc<dyn DailySummaryStore>, cache: Arc<dyn Cache>) -> Self {
        Self {
            store,
            cached: CacheAside::new(cache),
        }
    }

    /// One day's summary through the cache. `NotFound` if no row exists.
    pub async fn find(&self, user_id: i64, date: NaiveDate) -> Result<DailySummary> {
        self.cached
            .read_through(&daily_summary_key(user_id, date), move || async move {
                self.store
                    .find_by_user_and_date(user_id, date)
                    .await
                    .map_err(|e| match e {
                        StoreError::NotFound => {
                            AppError::NotFound(format!("daily summary {}", format_date(date)))
                        }
                        other => other.into(),
                    })
            })
            .await
    }

    /// Like [`find`](Self::find) but a day without data is a zeroed summary.
    pub async fn find_or_empty(&self, user_id: i64, date: NaiveDate) -> Result<DailySummary> {
        match self.find(user_id, date).await {
            Err(AppError::NotFound(_)) => Ok(DailySummary::empty(user_id, date)),
            other => other,
        }
    }

    pub async fn save(&self, summary: &DailySummary) -> Result<()> {
        self.store.upsert(summary).await?;
        self.cached
            .invalidate(&daily_summary_key(summary.user_id, summary.date))
            .await
    }

    /// Aggregate over `[start, end]`; always read from the store.
    pub async fn aggregate_range(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DailySummary> {
        if end < start {
            return Err(AppError::BadRequest(
                "end date is before start date".to_string(),
            ));
        }
        Ok(self.store.aggregate_range(user_id, start, end).await?)
    }
}

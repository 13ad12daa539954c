// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{DailySummary, User, UserUpdate};
use crate::time_utils::{format_date, format_utc_rfc3339, parse_date};
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Longest accepted date range for aggregates, in days.
const MAX_RANGE_DAYS: i64 = 366;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/user/profile", get(get_profile))
        .route("/api/v1/user/edit", post(edit_profile))
        .route("/api/v1/daily-summary/date", post(get_summary_by_date))
        .route("/api/v1/daily-summary/range", post(get_summary_by_range))
        .route("/api/v1/daily-summary/save", post(save_summary))
}

fn bad_date(field: &str) -> AppError {
    AppError::BadRequest(format!("{field} must be a YYYY-MM-DD date"))
}

// ─── User Profile ────────────────────────────────────────────

/// Current user profile. Never includes credentials.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProfileResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: i64,
    pub username: Option<String>,
    pub account: Option<String>,
    pub phone: Option<String>,
    pub nickname: Option<String>,
    pub weight_kg: i32,
    pub height_cm: i32,
    pub birthday: Option<String>,
    pub about_me: Option<String>,
    pub created_at: String,
}

impl From<User> for ProfileResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            account: user.account,
            phone: user.phone,
            nickname: user.nickname,
            weight_kg: user.weight_kg,
            height_cm: user.height_cm,
            birthday: user.birthday.map(format_date),
            about_me: user.about_me,
            created_at: format_utc_rfc3339(user.created_at),
        }
    }
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ProfileResponse>> {
    let profile = state.users.profile(user.user_id).await?;
    Ok(Json(profile.into()))
}

/// Editable profile fields. Omitted fields are left unchanged.
#[derive(Debug, Deserialize, Validate)]
pub struct EditProfileRequest {
    #[validate(length(min = 1, max = 64))]
    pub username: Option<String>,
    #[validate(length(max = 64))]
    pub nickname: Option<String>,
    #[validate(range(min = 1, max = 500))]
    pub weight_kg: Option<i32>,
    #[validate(range(min = 1, max = 300))]
    pub height_cm: Option<i32>,
    pub birthday: Option<String>,
    #[validate(length(max = 1024))]
    pub about_me: Option<String>,
}

async fn edit_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<EditProfileRequest>,
) -> Result<StatusCode> {
    req.validate()?;

    let birthday = req
        .birthday
        .as_deref()
        .map(parse_date)
        .transpose()
        .map_err(|_| bad_date("birthday"))?;

    let update = UserUpdate {
        id: user.user_id,
        username: req.username,
        nickname: req.nickname,
        weight_kg: req.weight_kg,
        height_cm: req.height_cm,
        birthday,
        about_me: req.about_me,
    };
    state.users.update_non_sensitive(&update).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ─── Daily Summaries ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DateRequest {
    pub date: String,
}

#[derive(Debug, Deserialize)]
pub struct RangeRequest {
    pub start_date: String,
    pub end_date: String,
}

/// One day; a day without data is all zeros.
async fn get_summary_by_date(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<DateRequest>,
) -> Result<Json<DailySummary>> {
    let date = parse_date(&req.date).map_err(|_| bad_date("date"))?;
    let summary = state.summaries.find_or_empty(user.user_id, date).await?;
    Ok(Json(summary))
}

/// A single record aggregating every day in the inclusive range.
async fn get_summary_by_range(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<RangeRequest>,
) -> Result<Json<DailySummary>> {
    let start = parse_date(&req.start_date).map_err(|_| bad_date("start_date"))?;
    let end = parse_date(&req.end_date).map_err(|_| bad_date("end_date"))?;
    check_range(start, end)?;

    let summary = state
        .summaries
        .aggregate_range(user.user_id, start, end)
        .await?;
    Ok(Json(summary))
}

fn check_range(start: NaiveDate, end: NaiveDate) -> Result<()> {
    if end < start {
        return Err(AppError::BadRequest(
            "end_date is before start_date".to_string(),
        ));
    }
    if (end - start).num_days() >= MAX_RANGE_DAYS {
        return Err(AppError::BadRequest(format!(
            "range may span at most {MAX_RANGE_DAYS} days"
        )));
    }
    Ok(())
}

/// Store the caller's summary for one day, replacing any previous one.
async fn save_summary(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(mut summary): Json<DailySummary>,
) -> Result<StatusCode> {
    if summary.counters().iter().any(|&v| v < 0) {
        return Err(AppError::BadRequest(
            "counters must not be negative".to_string(),
        ));
    }

    // The body may not write another user's row
    summary.user_id = user.user_id;
    state.summaries.save(&summary).await?;

    tracing::debug!(
        user_id = user.user_id,
        date = %format_date(summary.date),
        "Saved daily summary"
    );
    Ok(StatusCode::NO_CONTENT)
}

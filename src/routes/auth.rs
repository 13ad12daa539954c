// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sign-up, sign-in and session routes.
//!
//! Everything here except logout is public. Tokens go out in the
//! `x-jwt-token` / `x-refresh-token` response headers.

use crate::error::{AppError, Result};
use crate::middleware::auth::{
    bearer_token, user_agent, AuthUser, ACCESS_TOKEN_HEADER, REFRESH_TOKEN_HEADER,
};
use crate::services::session::AuthError;
use crate::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    routing::post,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::{Validate, ValidationError};

/// Business context for sign-in codes.
const BIZ_LOGIN: &str = "login";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/user/signup", post(signup))
        .route("/api/v1/user/login", post(login))
        .route("/api/v1/user/login_sms/code/send", post(send_login_code))
        .route("/api/v1/user/login_sms", post(login_sms))
        .route("/api/v1/user/refresh_token", post(refresh_token))
}

/// Routes that need a live session (mounted behind `require_auth`).
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/v1/user/logout", post(logout))
}

/// Mainland mobile number: 11 digits starting with 1.
pub fn validate_phone(phone: &str) -> std::result::Result<(), ValidationError> {
    let valid = phone.len() == 11
        && phone.starts_with('1')
        && phone.bytes().all(|b| b.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("phone").with_message("invalid phone number".into()))
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 64))]
    pub account: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 64))]
    pub account: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendCodeRequest {
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginSmsRequest {
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
    #[validate(length(min = 1, max = 16))]
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct UserIdResponse {
    pub id: i64,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

fn token_header(
    headers: &mut HeaderMap,
    name: &'static str,
    token: &str,
) -> Result<()> {
    let value = HeaderValue::from_str(token)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("token is not a valid header: {e}")))?;
    headers.insert(HeaderName::from_static(name), value);
    Ok(())
}

/// Start a session for `user_id` and put both tokens in response headers.
async fn start_session(state: &AppState, user_id: i64, ua: &str) -> Result<HeaderMap> {
    let pair = state.sessions.issue_login_tokens(user_id, ua).await?;

    let mut headers = HeaderMap::new();
    token_header(&mut headers, ACCESS_TOKEN_HEADER, &pair.access_token)?;
    token_header(&mut headers, REFRESH_TOKEN_HEADER, &pair.refresh_token)?;
    Ok(headers)
}

async fn signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<UserIdResponse>)> {
    req.validate()?;
    if req.password != req.confirm_password {
        return Err(AppError::BadRequest("passwords do not match".to_string()));
    }

    let user = state.users.signup(&req.account, &req.password).await?;
    Ok((StatusCode::CREATED, Json(UserIdResponse { id: user.id })))
}

async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<UserIdResponse>)> {
    req.validate()?;

    let user = state.users.login(&req.account, &req.password).await?;
    let tokens = start_session(&state, user.id, &user_agent(&headers)).await?;

    tracing::info!(user_id = user.id, "Password login");
    Ok((tokens, Json(UserIdResponse { id: user.id })))
}

async fn send_login_code(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendCodeRequest>,
) -> Result<Json<StatusResponse>> {
    req.validate()?;

    state.codes.send(BIZ_LOGIN, &req.phone).await?;
    Ok(Json(StatusResponse { status: "sent" }))
}

async fn login_sms(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<LoginSmsRequest>,
) -> Result<(HeaderMap, Json<UserIdResponse>)> {
    req.validate()?;

    if !state.codes.verify(BIZ_LOGIN, &req.phone, &req.code).await? {
        return Err(AppError::InvalidCode);
    }

    let user = state.users.find_or_create(&req.phone).await?;
    let tokens = start_session(&state, user.id, &user_agent(&headers)).await?;

    tracing::info!(user_id = user.id, "SMS code login");
    Ok((tokens, Json(UserIdResponse { id: user.id })))
}

/// Exchange the bearer refresh token for a new access token.
async fn refresh_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<(StatusCode, HeaderMap)> {
    let token = bearer_token(&headers).ok_or(AuthError::Missing)?;
    let access = state.sessions.refresh(&token, &user_agent(&headers)).await?;

    let mut out = HeaderMap::new();
    token_header(&mut out, ACCESS_TOKEN_HEADER, &access)?;
    Ok((StatusCode::NO_CONTENT, out))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<StatusCode> {
    state.sessions.logout(&user.ssid).await?;
    Ok(StatusCode::NO_CONTENT)
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT authentication middleware.

use crate::error::AppError;
use crate::services::AuthError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt, UserAgent};
use std::sync::Arc;

/// Response header carrying a freshly issued access token.
pub const ACCESS_TOKEN_HEADER: &str = "x-jwt-token";
/// Response header carrying a freshly issued refresh token.
pub const REFRESH_TOKEN_HEADER: &str = "x-refresh-token";

/// Authenticated user extracted from the access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub ssid: String,
}

/// The `Authorization: Bearer` token, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
}

/// The `User-Agent` header; empty when absent.
pub fn user_agent(headers: &HeaderMap) -> String {
    headers
        .typed_get::<UserAgent>()
        .map(|ua| ua.as_str().to_string())
        .unwrap_or_default()
}

/// Middleware that requires a valid, live session.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers()).ok_or(AuthError::Missing)?;
    let ua = user_agent(request.headers());

    let claims = state.sessions.authenticate(&token, &ua).await?;

    request.extensions_mut().insert(AuthUser {
        user_id: claims.uid,
        ssid: claims.ssid,
    });

    Ok(next.run(request).await)
}

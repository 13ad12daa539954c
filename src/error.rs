// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use crate::cache::CacheError;
use crate::db::StoreError;
use crate::services::code::CodeError;
use crate::services::session::AuthError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Any session failure (missing, malformed, expired, revoked, wrong device)
    #[error("Authentication required")]
    Unauthorized,

    /// Unknown account or wrong password; deliberately indistinguishable
    #[error("Invalid account or password")]
    InvalidCredentials,

    #[error("Invalid verification code")]
    InvalidCode,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Too many requests")]
    RateLimited,

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppError::NotFound("record".to_string()),
            StoreError::DuplicateKey(constraint) => AppError::Conflict(constraint),
            StoreError::Backend(msg) => AppError::Database(msg),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Cache(e) => AppError::Cache(e),
            AuthError::Signing(msg) => AppError::Internal(anyhow::anyhow!(msg)),
            other => {
                tracing::debug!(reason = %other, "Rejected session");
                AppError::Unauthorized
            }
        }
    }
}

impl From<CodeError> for AppError {
    fn from(err: CodeError) -> Self {
        match err {
            CodeError::RateLimited => AppError::RateLimited,
            CodeError::TooManyAttempts => AppError::InvalidCode,
            CodeError::Cache(e) => AppError::Cache(e),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "invalid_credentials", None)
            }
            AppError::InvalidCode => (StatusCode::UNAUTHORIZED, "invalid_code", None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "rate_limited", None),
            AppError::Cache(CacheError::Timeout) => {
                tracing::error!("Cache operation timed out");
                (StatusCode::GATEWAY_TIMEOUT, "cache_timeout", None)
            }
            AppError::Cache(err) => {
                tracing::error!(error = %err, "Cache error");
                (StatusCode::SERVICE_UNAVAILABLE, "cache_unavailable", None)
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

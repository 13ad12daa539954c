// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-client request rate limit.
//!
//! Counters live in the shared cache so every instance behind the load
//! balancer enforces the same budget. Windows are fixed: the first request
//! from an address starts a window and the counter expires with it.

use crate::cache::{Cache, CacheError};
use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Length of one counting window.
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

fn limiter_key(client: &str) -> String {
    format!("ip-limiter:{client}")
}

/// Fixed-window request counter keyed by client address.
#[derive(Clone)]
pub struct IpRateLimiter {
    cache: Arc<dyn Cache>,
    limit: u32,
    window: Duration,
}

impl IpRateLimiter {
    /// A `limit` of zero disables limiting.
    pub fn new(cache: Arc<dyn Cache>, limit: u32, window: Duration) -> Self {
        Self {
            cache,
            limit,
            window,
        }
    }

    /// Count one request from `client`; `false` once the window's budget is
    /// spent.
    pub async fn allow(&self, client: &str) -> Result<bool, CacheError> {
        if self.limit == 0 {
            return Ok(true);
        }
        let count = self
            .cache
            .increment_with_ttl(&limiter_key(client), self.window)
            .await?;
        Ok(count <= i64::from(self.limit))
    }
}

/// Peer address of the connection, when the server records it.
fn client_addr(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Reject requests beyond the per-address budget with 429.
pub async fn limit_by_ip(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = client_addr(&request);

    if !state.limiter.allow(&client).await? {
        tracing::warn!(client = %client, "Request rate limit exceeded");
        return Err(AppError::RateLimited);
    }

    Ok(next.run(request).await)
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! SwingTrack API Server
//!
//! Sign-in, sessions and training summaries for the SwingTrack app.

use std::net::SocketAddr;
use std::sync::Arc;
use swingtrack::{
    cache::RedisCache,
    config::Config,
    db::PgStore,
    services::{MemorySmsSender, SmsSender, TwilioSmsSender},
    AppState, Backends,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting SwingTrack API");

    // Postgres holds users and summaries
    let store = PgStore::connect(&config.database_url).await?;
    store.migrate().await?;
    tracing::info!("Database migrations applied");
    let store = Arc::new(store);

    // Redis holds sessions, codes and cached projections
    let cache = Arc::new(RedisCache::connect(&config.redis_url, config.cache_op_timeout).await?);

    let sms: Arc<dyn SmsSender> = match &config.twilio {
        Some(twilio) => {
            tracing::info!("SMS delivery via Twilio");
            Arc::new(TwilioSmsSender::new(twilio.clone()))
        }
        None => {
            tracing::warn!("Twilio not configured; verification codes will not be delivered");
            Arc::new(MemorySmsSender::new())
        }
    };

    // Build shared state
    let state = Arc::new(AppState::new(
        config.clone(),
        Backends {
            cache,
            users: store.clone(),
            summaries: store,
            sms,
        },
    )?);

    // Build router
    let app = swingtrack::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("swingtrack=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}

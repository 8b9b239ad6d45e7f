//! Racconto
//!
//! A blogging platform: HTTP server, auth, and content services.

mod config;
mod content;
mod db;
mod error;
mod models;
mod routes;
mod services;
mod session;
mod state;
mod theme;

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::state::AppState;

/// Per-request timeout.
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    init_tracing();

    info!("Starting Racconto");

    // Load configuration from environment
    let config = Config::from_env().context("failed to load configuration")?;
    info!(port = config.port, "Configuration loaded");

    // Initialize application state (pool, migrations, templates, Google)
    let state = AppState::new(&config)
        .await
        .context("failed to initialize application state")?;

    info!("Database connection established");

    // Create session layer
    let session_layer = session::create_session_layer(&config)
        .await
        .context("failed to create session layer")?;

    info!("Redis session store connected");

    // Build the router
    let app = Router::new()
        .merge(routes::front::router())
        .merge(routes::blog::router())
        .merge(routes::dashboard::router())
        .merge(routes::profile::router())
        .merge(routes::search::router())
        .merge(routes::engage::router())
        .merge(routes::auth::router())
        .merge(routes::oauth::router())
        .merge(routes::health::router())
        // Middleware layers (last added = first executed in request flow):
        // TraceLayer → timeout → compression → session → routes
        .layer(session_layer)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind to address")?;

    info!(%addr, "Server listening");

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

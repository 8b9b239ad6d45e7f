//! Application state shared across all handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::info;

use crate::config::Config;
use crate::db;
use crate::services::google::{GoogleAuth, GoogleCredentials};
use crate::theme::ThemeEngine;

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// PostgreSQL connection pool.
    db: PgPool,

    /// Theme engine for template rendering.
    theme: Arc<ThemeEngine>,

    /// Public site URL for building absolute redirect URLs.
    site_url: String,

    /// Redirect URL handed to Google on every authorization request.
    google_redirect_url: String,

    /// Path of the persisted Google credentials file.
    google_oauth_file: PathBuf,

    /// Google sign-in client, absent until credentials are configured.
    ///
    /// Uses `parking_lot::RwLock` rather than `std::sync::RwLock` because:
    /// - No poisoning: a panic in a writer won't permanently wedge every reader.
    /// - Shorter critical sections avoid blocking Tokio worker threads.
    ///
    /// The runtime configuration endpoint swaps in a fresh client when
    /// credentials change.
    google: parking_lot::RwLock<Option<Arc<GoogleAuth>>>,
}

impl AppState {
    /// Create new application state with database connections.
    pub async fn new(config: &Config) -> Result<Self> {
        // Create PostgreSQL pool
        let db = db::create_pool(config)
            .await
            .context("failed to create database pool")?;

        // Run migrations
        db::run_migrations(&db)
            .await
            .context("failed to run migrations")?;

        // Create theme engine
        info!(templates_dir = ?config.templates_dir, "loading templates from directory");
        let theme = Arc::new(
            ThemeEngine::new(&config.templates_dir)
                .inspect_err(
                    |e| tracing::warn!(error = ?e, "failed to load templates, using empty engine"),
                )
                .or_else(|_| ThemeEngine::empty())
                .context("failed to create theme engine")?,
        );

        let google_redirect_url = config
            .google_redirect_url
            .clone()
            .unwrap_or_else(|| format!("{}/auth/google-callback", config.site_url));

        // Environment credentials win; otherwise fall back to the file the
        // runtime configuration form persists.
        let credentials = match (
            config.google_client_id.clone(),
            config.google_client_secret.clone(),
        ) {
            (Some(client_id), Some(client_secret)) => Some(GoogleCredentials {
                client_id,
                client_secret,
            }),
            _ => GoogleCredentials::load_file(&config.google_oauth_file)
                .inspect_err(
                    |e| tracing::warn!(error = %e, "failed to load persisted Google credentials"),
                )
                .unwrap_or(None),
        };

        let google = credentials.map(|creds| {
            info!("Google sign-in configured");
            Arc::new(GoogleAuth::new(creds, google_redirect_url.clone()))
        });
        if google.is_none() {
            info!("Google sign-in not configured");
        }

        Ok(Self {
            inner: Arc::new(AppStateInner {
                db,
                theme,
                site_url: config.site_url.clone(),
                google_redirect_url,
                google_oauth_file: config.google_oauth_file.clone(),
                google: parking_lot::RwLock::new(google),
            }),
        })
    }

    /// Assemble state from pre-built parts, skipping connection setup and
    /// migrations. Lets tests drive the router with a lazy pool and an
    /// empty theme engine.
    pub fn from_parts(db: PgPool, theme: ThemeEngine, site_url: &str) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                db,
                theme: Arc::new(theme),
                site_url: site_url.to_string(),
                google_redirect_url: format!("{site_url}/auth/google-callback"),
                google_oauth_file: PathBuf::from("./instance/google_oauth.json"),
                google: parking_lot::RwLock::new(None),
            }),
        }
    }

    /// Get the database pool.
    pub fn db(&self) -> &PgPool {
        &self.inner.db
    }

    /// Get the theme engine.
    pub fn theme(&self) -> &Arc<ThemeEngine> {
        &self.inner.theme
    }

    /// Get the public site URL.
    pub fn site_url(&self) -> &str {
        &self.inner.site_url
    }

    /// Get the redirect URL for Google authorization requests.
    pub fn google_redirect_url(&self) -> &str {
        &self.inner.google_redirect_url
    }

    /// Get the path of the persisted Google credentials file.
    pub fn google_oauth_file(&self) -> &Path {
        &self.inner.google_oauth_file
    }

    /// Get the Google sign-in client, if configured.
    pub fn google(&self) -> Option<Arc<GoogleAuth>> {
        self.inner.google.read().clone()
    }

    /// Replace the Google sign-in client (runtime reconfiguration).
    pub fn set_google(&self, client: Option<Arc<GoogleAuth>>) {
        *self.inner.google.write() = client;
    }

    /// Check if PostgreSQL is healthy.
    pub async fn postgres_healthy(&self) -> bool {
        db::check_health(&self.inner.db).await
    }
}

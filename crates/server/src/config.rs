//! Configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 3000).
    pub port: u16,

    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Redis connection URL.
    pub redis_url: String,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// Cookie SameSite policy: "strict", "lax", or "none" (default: "lax").
    pub cookie_same_site: String,

    /// Public site URL, used to build absolute redirect URLs.
    pub site_url: String,

    /// Directory holding the Tera templates (default: ./templates).
    pub templates_dir: PathBuf,

    /// Google OAuth client ID, when set in the environment. May also be
    /// supplied at runtime via the persisted credentials file.
    pub google_client_id: Option<String>,

    /// Google OAuth client secret, when set in the environment.
    pub google_client_secret: Option<String>,

    /// Override for the OAuth redirect URL. Defaults to
    /// `{site_url}/auth/google-callback`.
    pub google_redirect_url: Option<String>,

    /// Path of the persisted Google credentials file
    /// (default: ./instance/google_oauth.json).
    pub google_oauth_file: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let database_url =
            env::var("DATABASE_URL").context("DATABASE_URL environment variable is required")?;

        let redis_url =
            env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let cookie_same_site = env::var("COOKIE_SAME_SITE")
            .unwrap_or_else(|_| "lax".to_string())
            .to_lowercase();

        let site_url = env::var("SITE_URL").unwrap_or_else(|_| format!("http://localhost:{port}"));

        let templates_dir = env::var("TEMPLATES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./templates"));

        let google_client_id = env::var("GOOGLE_CLIENT_ID").ok().filter(|v| !v.is_empty());
        let google_client_secret = env::var("GOOGLE_CLIENT_SECRET")
            .ok()
            .filter(|v| !v.is_empty());
        let google_redirect_url = env::var("GOOGLE_REDIRECT_URL").ok().filter(|v| !v.is_empty());

        let google_oauth_file = env::var("GOOGLE_OAUTH_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./instance/google_oauth.json"));

        Ok(Self {
            port,
            database_url,
            redis_url,
            database_max_connections,
            cookie_same_site,
            site_url,
            templates_dir,
            google_client_id,
            google_client_secret,
            google_redirect_url,
            google_oauth_file,
        })
    }
}

//! Redis-backed session layer.
//!
//! Sessions ride a single cookie backed by tower-sessions' Redis store over
//! a fred pool. Cookie policy comes from configuration: the SameSite mode is
//! an operator choice, and the Secure flag follows the site URL scheme so
//! local plain-http development still gets a usable cookie.

use anyhow::{Context, Result};
use fred::prelude::{Builder, ClientLike, Config as RedisConfig, Pool};
use tower_sessions::cookie::SameSite;
use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_redis_store::RedisStore;

use crate::config::Config;

/// Baseline session lifetime, refreshed on activity.
pub const DEFAULT_SESSION_EXPIRY_HOURS: i64 = 24;

/// Lifetime once "remember me" is checked, also used for external sign-ins.
pub const REMEMBER_ME_SESSION_EXPIRY_DAYS: i64 = 30;

/// Connect the Redis session store and build the session middleware.
pub async fn create_session_layer(
    config: &Config,
) -> Result<SessionManagerLayer<RedisStore<Pool>>> {
    let redis_config =
        RedisConfig::from_url(&config.redis_url).context("failed to parse Redis URL")?;

    let pool = Builder::from_config(redis_config)
        .build_pool(1)
        .context("failed to create Redis pool")?;

    pool.init()
        .await
        .context("failed to connect to Redis for sessions")?;

    Ok(SessionManagerLayer::new(RedisStore::new(pool))
        .with_secure(wants_secure_cookies(&config.site_url))
        .with_http_only(true)
        .with_same_site(parse_same_site(&config.cookie_same_site))
        .with_expiry(Expiry::OnInactivity(Duration::hours(
            DEFAULT_SESSION_EXPIRY_HOURS,
        ))))
}

/// Map the configured policy name to a SameSite mode. Unknown values fall
/// back to Strict rather than something weaker.
fn parse_same_site(policy: &str) -> SameSite {
    match policy {
        "lax" => SameSite::Lax,
        "none" => SameSite::None,
        _ => SameSite::Strict,
    }
}

/// A plain-http deployment must not set the Secure flag or the browser
/// drops the cookie and every login loops back to the form.
fn wants_secure_cookies(site_url: &str) -> bool {
    site_url.starts_with("https://")
}

//! Database connection pool management and schema setup.

use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::Config;

/// Create a PostgreSQL connection pool.
pub async fn create_pool(config: &Config) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to PostgreSQL")?;

    Ok(pool)
}

/// Schema DDL, applied at startup. Idempotent: every statement is
/// `IF NOT EXISTS`, so restarting against an existing database is a no-op.
///
/// Content rows (`blogs`, `comments`, `likes`, `bookmarks`) carry Unix
/// epoch timestamps; `users` carries TIMESTAMPTZ. Deleting a user removes
/// everything they own; deleting a post removes its comments, likes, and
/// bookmarks.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'reader',
    bio TEXT NOT NULL DEFAULT '',
    avatar TEXT NOT NULL DEFAULT '',
    created TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    login TIMESTAMPTZ
);

CREATE TABLE IF NOT EXISTS blogs (
    id UUID PRIMARY KEY,
    title TEXT NOT NULL,
    slug TEXT NOT NULL UNIQUE,
    content TEXT NOT NULL,
    excerpt TEXT NOT NULL DEFAULT '',
    cover_image TEXT NOT NULL DEFAULT '',
    tags TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT 'draft',
    featured BOOLEAN NOT NULL DEFAULT FALSE,
    views BIGINT NOT NULL DEFAULT 0,
    author_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created BIGINT NOT NULL,
    changed BIGINT NOT NULL
);

CREATE TABLE IF NOT EXISTS comments (
    id UUID PRIMARY KEY,
    blog_id UUID NOT NULL REFERENCES blogs(id) ON DELETE CASCADE,
    author_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    body TEXT NOT NULL,
    created BIGINT NOT NULL,
    changed BIGINT NOT NULL
);

CREATE TABLE IF NOT EXISTS likes (
    id UUID PRIMARY KEY,
    blog_id UUID NOT NULL REFERENCES blogs(id) ON DELETE CASCADE,
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created BIGINT NOT NULL,
    UNIQUE (blog_id, user_id)
);

CREATE TABLE IF NOT EXISTS bookmarks (
    id UUID PRIMARY KEY,
    blog_id UUID NOT NULL REFERENCES blogs(id) ON DELETE CASCADE,
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created BIGINT NOT NULL,
    UNIQUE (blog_id, user_id)
);

CREATE INDEX IF NOT EXISTS idx_blogs_status_created ON blogs (status, created DESC);
CREATE INDEX IF NOT EXISTS idx_blogs_status_views ON blogs (status, views DESC);
CREATE INDEX IF NOT EXISTS idx_blogs_author ON blogs (author_id);
CREATE INDEX IF NOT EXISTS idx_comments_blog ON comments (blog_id);
CREATE INDEX IF NOT EXISTS idx_likes_blog ON likes (blog_id);
CREATE INDEX IF NOT EXISTS idx_bookmarks_user_created ON bookmarks (user_id, created DESC);
"#;

/// Apply the schema inside a single transaction.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    // Use raw_sql instead of query() because the schema contains multiple
    // SQL statements. query() uses prepared statements which only support
    // a single statement per call.
    sqlx::raw_sql(SCHEMA)
        .execute(&mut *tx)
        .await
        .context("failed to apply schema")?;

    tx.commit().await.context("failed to commit schema")?;

    tracing::info!("database schema is up to date");

    Ok(())
}

/// Check if the database connection is healthy.
pub async fn check_health(pool: &PgPool) -> bool {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .is_ok()
}

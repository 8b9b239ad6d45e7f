//! Bookmark model: at most one bookmark per (post, user) pair.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Bookmark record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Bookmark {
    pub id: Uuid,
    pub blog_id: Uuid,
    pub user_id: Uuid,
    pub created: i64,
}

/// A bookmark joined with the bookmarked post, for dashboard display.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BookmarkedPost {
    pub blog_id: Uuid,
    pub title: String,
    pub slug: String,
    pub author_username: String,
    pub created: i64,
}

impl Bookmark {
    /// Find a user's bookmark on a post, if any.
    pub async fn find(pool: &PgPool, blog_id: Uuid, user_id: Uuid) -> Result<Option<Self>> {
        let bookmark = sqlx::query_as::<_, Bookmark>(
            "SELECT * FROM bookmarks WHERE blog_id = $1 AND user_id = $2",
        )
        .bind(blog_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch bookmark")?;

        Ok(bookmark)
    }

    /// Toggle a user's bookmark on a post. Returns the resulting state:
    /// `true` when the post is now bookmarked. A duplicate attempt is
    /// absorbed by `ON CONFLICT DO NOTHING`.
    pub async fn toggle(pool: &PgPool, blog_id: Uuid, user_id: Uuid) -> Result<bool> {
        let removed = sqlx::query("DELETE FROM bookmarks WHERE blog_id = $1 AND user_id = $2")
            .bind(blog_id)
            .bind(user_id)
            .execute(pool)
            .await
            .context("failed to remove bookmark")?;

        if removed.rows_affected() > 0 {
            return Ok(false);
        }

        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            "INSERT INTO bookmarks (id, blog_id, user_id, created) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (blog_id, user_id) DO NOTHING",
        )
        .bind(Uuid::now_v7())
        .bind(blog_id)
        .bind(user_id)
        .bind(now)
        .execute(pool)
        .await
        .context("failed to create bookmark")?;

        Ok(true)
    }

    /// Count bookmarks on a post.
    pub async fn count_for_blog(pool: &PgPool, blog_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookmarks WHERE blog_id = $1")
            .bind(blog_id)
            .fetch_one(pool)
            .await
            .context("failed to count bookmarks")?;

        Ok(count)
    }

    /// A user's most recent bookmarks with the bookmarked post's title
    /// and author, newest first.
    pub async fn recent_for_user(
        pool: &PgPool,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<BookmarkedPost>> {
        let bookmarks = sqlx::query_as::<_, BookmarkedPost>(
            "SELECT b.id AS blog_id, b.title, b.slug, u.username AS author_username, \
                    bm.created \
             FROM bookmarks bm \
             JOIN blogs b ON bm.blog_id = b.id \
             JOIN users u ON b.author_id = u.id \
             WHERE bm.user_id = $1 \
             ORDER BY bm.created DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("failed to list recent bookmarks")?;

        Ok(bookmarks)
    }
}

//! Like model: at most one like per (post, user) pair.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Like record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Like {
    pub id: Uuid,
    pub blog_id: Uuid,
    pub user_id: Uuid,
    pub created: i64,
}

impl Like {
    /// Find a user's like on a post, if any.
    pub async fn find(pool: &PgPool, blog_id: Uuid, user_id: Uuid) -> Result<Option<Self>> {
        let like =
            sqlx::query_as::<_, Like>("SELECT * FROM likes WHERE blog_id = $1 AND user_id = $2")
                .bind(blog_id)
                .bind(user_id)
                .fetch_optional(pool)
                .await
                .context("failed to fetch like")?;

        Ok(like)
    }

    /// Toggle a user's like on a post. Returns the resulting state:
    /// `true` when the post is now liked, `false` when the like was
    /// removed. The unique constraint plus `ON CONFLICT DO NOTHING`
    /// guarantees a duplicate attempt never creates a second row.
    pub async fn toggle(pool: &PgPool, blog_id: Uuid, user_id: Uuid) -> Result<bool> {
        let removed = sqlx::query("DELETE FROM likes WHERE blog_id = $1 AND user_id = $2")
            .bind(blog_id)
            .bind(user_id)
            .execute(pool)
            .await
            .context("failed to remove like")?;

        if removed.rows_affected() > 0 {
            return Ok(false);
        }

        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            "INSERT INTO likes (id, blog_id, user_id, created) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (blog_id, user_id) DO NOTHING",
        )
        .bind(Uuid::now_v7())
        .bind(blog_id)
        .bind(user_id)
        .bind(now)
        .execute(pool)
        .await
        .context("failed to create like")?;

        Ok(true)
    }

    /// Count likes on a post.
    pub async fn count_for_blog(pool: &PgPool, blog_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM likes WHERE blog_id = $1")
            .bind(blog_id)
            .fetch_one(pool)
            .await
            .context("failed to count likes")?;

        Ok(count)
    }

    /// Count likes received across all of an author's posts.
    pub async fn count_for_author(pool: &PgPool, author_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM likes l JOIN blogs b ON l.blog_id = b.id \
             WHERE b.author_id = $1",
        )
        .bind(author_id)
        .fetch_one(pool)
        .await
        .context("failed to count likes for author")?;

        Ok(count)
    }
}

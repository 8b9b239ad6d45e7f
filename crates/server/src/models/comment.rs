//! Comment model for discussions on posts.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Comment record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    /// Unique identifier (UUIDv7).
    pub id: Uuid,

    /// Commented post.
    pub blog_id: Uuid,

    /// Author user ID.
    pub author_id: Uuid,

    /// Comment body, plain text.
    pub body: String,

    /// Unix timestamp when created.
    pub created: i64,

    /// Unix timestamp when last changed.
    pub changed: i64,
}

/// A comment joined with its author, for detail-page display.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CommentWithAuthor {
    pub id: Uuid,
    pub body: String,
    pub created: i64,
    pub author_id: Uuid,
    pub author_username: String,
    pub author_avatar: String,
}

/// Input for creating a comment.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateComment {
    pub blog_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
}

impl Comment {
    /// Create a new comment.
    pub async fn create(pool: &PgPool, input: CreateComment) -> Result<Self> {
        let id = Uuid::now_v7();
        let now = chrono::Utc::now().timestamp();

        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (id, blog_id, author_id, body, created, changed)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, blog_id, author_id, body, created, changed
            "#,
        )
        .bind(id)
        .bind(input.blog_id)
        .bind(input.author_id)
        .bind(&input.body)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .context("failed to create comment")?;

        Ok(comment)
    }

    /// List a post's comments with author details, oldest first.
    pub async fn list_for_blog(pool: &PgPool, blog_id: Uuid) -> Result<Vec<CommentWithAuthor>> {
        let comments = sqlx::query_as::<_, CommentWithAuthor>(
            r#"
            SELECT c.id, c.body, c.created, c.author_id,
                   u.username AS author_username, u.avatar AS author_avatar
            FROM comments c
            JOIN users u ON c.author_id = u.id
            WHERE c.blog_id = $1
            ORDER BY c.created ASC
            "#,
        )
        .bind(blog_id)
        .fetch_all(pool)
        .await
        .context("failed to list comments for blog")?;

        Ok(comments)
    }
}

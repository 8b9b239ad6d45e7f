//! Blog post model and CRUD operations.
//!
//! Posts live in the `blogs` table. Public listings only ever see published
//! rows; draft access is scoped to the owning author by querying on
//! `author_id` so a foreign draft is indistinguishable from a missing row.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Post is only visible to its author.
pub const STATUS_DRAFT: &str = "draft";
/// Post appears in listings, search, and profiles.
pub const STATUS_PUBLISHED: &str = "published";

/// Blog post record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Blog {
    /// Unique identifier (UUIDv7).
    pub id: Uuid,

    /// Display title.
    pub title: String,

    /// URL identifier, unique across all posts regardless of status.
    pub slug: String,

    /// Markdown body.
    pub content: String,

    /// Stored teaser, derived from the body at creation time.
    pub excerpt: String,

    /// Cover image reference (URL or path; empty when unset).
    pub cover_image: String,

    /// Comma-joined tag list.
    pub tags: String,

    /// `draft` or `published`.
    pub status: String,

    /// Whether the post is pinned to the front page.
    pub featured: bool,

    /// Lifetime view count; only ever incremented.
    pub views: i64,

    /// Owning author; immutable after creation.
    pub author_id: Uuid,

    /// Unix timestamp when created.
    pub created: i64,

    /// Unix timestamp when last changed.
    pub changed: i64,
}

/// Listing row: a post joined with its author's username.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BlogCard {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub cover_image: String,
    pub tags: String,
    pub views: i64,
    pub author_id: Uuid,
    pub author_username: String,
    pub created: i64,
}

/// Input for creating a post. The slug must already be resolved to a
/// unique value; the excerpt must already be derived from the body.
#[derive(Debug, Clone)]
pub struct CreateBlog {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: String,
    pub cover_image: String,
    pub tags: String,
    pub status: String,
    pub author_id: Uuid,
}

/// Input for updating a post. The slug and excerpt are deliberately
/// absent: both are fixed at creation time.
#[derive(Debug, Clone, Default)]
pub struct UpdateBlog {
    pub title: Option<String>,
    pub content: Option<String>,
    pub cover_image: Option<String>,
    pub tags: Option<String>,
    pub status: Option<String>,
}

const CARD_COLUMNS: &str = "b.id, b.title, b.slug, b.excerpt, b.cover_image, b.tags, b.views, \
     b.author_id, u.username AS author_username, b.created";

impl Blog {
    /// Check if this post is published.
    pub fn is_published(&self) -> bool {
        self.status == STATUS_PUBLISHED
    }

    /// First entry of the comma-joined tag list, trimmed. `None` when the
    /// post has no tags or the first entry is blank.
    pub fn first_tag(&self) -> Option<&str> {
        let first = self.tags.split(',').next()?.trim();
        if first.is_empty() { None } else { Some(first) }
    }

    /// Find a post by ID.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let blog = sqlx::query_as::<_, Blog>("SELECT * FROM blogs WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch blog by id")?;

        Ok(blog)
    }

    /// Find a post by slug, regardless of status. The caller decides
    /// whether the requester may see a draft.
    pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Self>> {
        let blog = sqlx::query_as::<_, Blog>("SELECT * FROM blogs WHERE slug = $1")
            .bind(slug)
            .fetch_optional(pool)
            .await
            .context("failed to fetch blog by slug")?;

        Ok(blog)
    }

    /// Find a post by ID, scoped to its owner. Returns `None` both when
    /// the post does not exist and when it belongs to someone else.
    pub async fn find_owned(pool: &PgPool, id: Uuid, author_id: Uuid) -> Result<Option<Self>> {
        let blog = sqlx::query_as::<_, Blog>("SELECT * FROM blogs WHERE id = $1 AND author_id = $2")
            .bind(id)
            .bind(author_id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch owned blog")?;

        Ok(blog)
    }

    /// Create a new post.
    pub async fn create(pool: &PgPool, input: CreateBlog) -> Result<Self> {
        let id = Uuid::now_v7();
        let now = chrono::Utc::now().timestamp();

        let blog = sqlx::query_as::<_, Blog>(
            r#"
            INSERT INTO blogs (id, title, slug, content, excerpt, cover_image, tags, status, author_id, created, changed)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.title)
        .bind(&input.slug)
        .bind(&input.content)
        .bind(&input.excerpt)
        .bind(&input.cover_image)
        .bind(&input.tags)
        .bind(&input.status)
        .bind(input.author_id)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .context("failed to create blog")?;

        Ok(blog)
    }

    /// Update a post, scoped to its owner. Always bumps `changed`.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        author_id: Uuid,
        input: UpdateBlog,
    ) -> Result<Option<Self>> {
        // Build dynamic update query
        let mut query = String::from("UPDATE blogs SET ");
        let mut params: Vec<String> = Vec::new();
        let mut param_idx = 1;

        if input.title.is_some() {
            params.push(format!("title = ${param_idx}"));
            param_idx += 1;
        }
        if input.content.is_some() {
            params.push(format!("content = ${param_idx}"));
            param_idx += 1;
        }
        if input.cover_image.is_some() {
            params.push(format!("cover_image = ${param_idx}"));
            param_idx += 1;
        }
        if input.tags.is_some() {
            params.push(format!("tags = ${param_idx}"));
            param_idx += 1;
        }
        if input.status.is_some() {
            params.push(format!("status = ${param_idx}"));
            param_idx += 1;
        }

        if params.is_empty() {
            return Self::find_owned(pool, id, author_id).await;
        }

        params.push(format!("changed = ${param_idx}"));
        param_idx += 1;

        query.push_str(&params.join(", "));
        query.push_str(&format!(
            " WHERE id = ${param_idx} AND author_id = ${}",
            param_idx + 1
        ));
        query.push_str(" RETURNING *");

        let now = chrono::Utc::now().timestamp();
        let mut query_builder = sqlx::query_as::<_, Blog>(&query);

        if let Some(ref title) = input.title {
            query_builder = query_builder.bind(title);
        }
        if let Some(ref content) = input.content {
            query_builder = query_builder.bind(content);
        }
        if let Some(ref cover_image) = input.cover_image {
            query_builder = query_builder.bind(cover_image);
        }
        if let Some(ref tags) = input.tags {
            query_builder = query_builder.bind(tags);
        }
        if let Some(ref status) = input.status {
            query_builder = query_builder.bind(status);
        }
        query_builder = query_builder.bind(now).bind(id).bind(author_id);

        let blog = query_builder
            .fetch_optional(pool)
            .await
            .context("failed to update blog")?;

        Ok(blog)
    }

    /// Delete a post, scoped to its owner. Comments, likes, and bookmarks
    /// go with it via `ON DELETE CASCADE`.
    pub async fn delete(pool: &PgPool, id: Uuid, author_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM blogs WHERE id = $1 AND author_id = $2")
            .bind(id)
            .bind(author_id)
            .execute(pool)
            .await
            .context("failed to delete blog")?;

        Ok(result.rows_affected() > 0)
    }

    /// Record one more view of a published post.
    pub async fn increment_views(pool: &PgPool, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE blogs SET views = views + 1 WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .context("failed to increment view count")?;

        Ok(())
    }

    /// Featured published posts, newest first.
    pub async fn featured(pool: &PgPool, limit: i64) -> Result<Vec<BlogCard>> {
        let query = format!(
            "SELECT {CARD_COLUMNS} FROM blogs b JOIN users u ON b.author_id = u.id \
             WHERE b.featured = TRUE AND b.status = $1 ORDER BY b.created DESC LIMIT $2"
        );
        let blogs = sqlx::query_as::<_, BlogCard>(&query)
            .bind(STATUS_PUBLISHED)
            .bind(limit)
            .fetch_all(pool)
            .await
            .context("failed to list featured blogs")?;

        Ok(blogs)
    }

    /// Published posts, newest first, paginated.
    pub async fn list_recent(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<BlogCard>> {
        let query = format!(
            "SELECT {CARD_COLUMNS} FROM blogs b JOIN users u ON b.author_id = u.id \
             WHERE b.status = $1 ORDER BY b.created DESC LIMIT $2 OFFSET $3"
        );
        let blogs = sqlx::query_as::<_, BlogCard>(&query)
            .bind(STATUS_PUBLISHED)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
            .context("failed to list recent blogs")?;

        Ok(blogs)
    }

    /// Published posts, most viewed first, paginated.
    pub async fn list_popular(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<BlogCard>> {
        let query = format!(
            "SELECT {CARD_COLUMNS} FROM blogs b JOIN users u ON b.author_id = u.id \
             WHERE b.status = $1 ORDER BY b.views DESC LIMIT $2 OFFSET $3"
        );
        let blogs = sqlx::query_as::<_, BlogCard>(&query)
            .bind(STATUS_PUBLISHED)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
            .context("failed to list popular blogs")?;

        Ok(blogs)
    }

    /// Count all published posts.
    pub async fn count_published(pool: &PgPool) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blogs WHERE status = $1")
            .bind(STATUS_PUBLISHED)
            .fetch_one(pool)
            .await
            .context("failed to count published blogs")?;

        Ok(count)
    }

    /// Published posts sharing a tag with the given post, excluding the
    /// post itself.
    pub async fn related_by_tag(
        pool: &PgPool,
        id: Uuid,
        tag: &str,
        limit: i64,
    ) -> Result<Vec<BlogCard>> {
        // Escape LIKE wildcards in the tag before building the pattern
        let escaped_tag = tag
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("%{escaped_tag}%");

        let query = format!(
            "SELECT {CARD_COLUMNS} FROM blogs b JOIN users u ON b.author_id = u.id \
             WHERE b.status = $1 AND b.id != $2 AND b.tags LIKE $3 \
             ORDER BY b.created DESC LIMIT $4"
        );
        let blogs = sqlx::query_as::<_, BlogCard>(&query)
            .bind(STATUS_PUBLISHED)
            .bind(id)
            .bind(&pattern)
            .bind(limit)
            .fetch_all(pool)
            .await
            .context("failed to list related blogs")?;

        Ok(blogs)
    }

    /// Search published posts across title, body, and tags,
    /// case-insensitively, newest first, paginated.
    pub async fn search(
        pool: &PgPool,
        term: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BlogCard>> {
        let pattern = search_pattern(term);
        let query = format!(
            "SELECT {CARD_COLUMNS} FROM blogs b JOIN users u ON b.author_id = u.id \
             WHERE b.status = $1 AND (b.title ILIKE $2 OR b.content ILIKE $2 OR b.tags ILIKE $2) \
             ORDER BY b.created DESC LIMIT $3 OFFSET $4"
        );
        let blogs = sqlx::query_as::<_, BlogCard>(&query)
            .bind(STATUS_PUBLISHED)
            .bind(&pattern)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
            .context("failed to search blogs")?;

        Ok(blogs)
    }

    /// Count search matches.
    pub async fn search_count(pool: &PgPool, term: &str) -> Result<i64> {
        let pattern = search_pattern(term);
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM blogs \
             WHERE status = $1 AND (title ILIKE $2 OR content ILIKE $2 OR tags ILIKE $2)",
        )
        .bind(STATUS_PUBLISHED)
        .bind(&pattern)
        .fetch_one(pool)
        .await
        .context("failed to count search matches")?;

        Ok(count)
    }

    /// All of an author's posts regardless of status, most recently
    /// changed first, paginated.
    pub async fn list_by_author(
        pool: &PgPool,
        author_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>> {
        let blogs = sqlx::query_as::<_, Blog>(
            "SELECT * FROM blogs WHERE author_id = $1 ORDER BY changed DESC LIMIT $2 OFFSET $3",
        )
        .bind(author_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("failed to list blogs by author")?;

        Ok(blogs)
    }

    /// Count all of an author's posts regardless of status.
    pub async fn count_by_author(pool: &PgPool, author_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blogs WHERE author_id = $1")
            .bind(author_id)
            .fetch_one(pool)
            .await
            .context("failed to count blogs by author")?;

        Ok(count)
    }

    /// An author's published posts, newest first.
    pub async fn list_published_by_author(pool: &PgPool, author_id: Uuid) -> Result<Vec<Self>> {
        let blogs = sqlx::query_as::<_, Blog>(
            "SELECT * FROM blogs WHERE author_id = $1 AND status = $2 ORDER BY created DESC",
        )
        .bind(author_id)
        .bind(STATUS_PUBLISHED)
        .fetch_all(pool)
        .await
        .context("failed to list published blogs by author")?;

        Ok(blogs)
    }

    /// Count an author's published posts.
    pub async fn count_published_by_author(pool: &PgPool, author_id: Uuid) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM blogs WHERE author_id = $1 AND status = $2")
                .bind(author_id)
                .bind(STATUS_PUBLISHED)
                .fetch_one(pool)
                .await
                .context("failed to count published blogs by author")?;

        Ok(count)
    }

    /// Total views across all of an author's posts.
    pub async fn total_views_for_author(pool: &PgPool, author_id: Uuid) -> Result<i64> {
        let total: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(views), 0) FROM blogs WHERE author_id = $1")
                .bind(author_id)
                .fetch_one(pool)
                .await
                .context("failed to total views for author")?;

        Ok(total)
    }
}

/// Build the ILIKE pattern for a search term, escaping LIKE wildcards so
/// the term is matched literally.
fn search_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn sample_blog(tags: &str, status: &str) -> Blog {
        Blog {
            id: Uuid::now_v7(),
            title: "Sample".to_string(),
            slug: "sample".to_string(),
            content: "body".to_string(),
            excerpt: "body".to_string(),
            cover_image: String::new(),
            tags: tags.to_string(),
            status: status.to_string(),
            featured: false,
            views: 0,
            author_id: Uuid::now_v7(),
            created: 0,
            changed: 0,
        }
    }

    #[test]
    fn test_is_published() {
        assert!(sample_blog("", STATUS_PUBLISHED).is_published());
        assert!(!sample_blog("", STATUS_DRAFT).is_published());
    }

    #[test]
    fn test_first_tag_takes_first_entry() {
        let blog = sample_blog("rust, web, tutorial", STATUS_PUBLISHED);
        assert_eq!(blog.first_tag(), Some("rust"));
    }

    #[test]
    fn test_first_tag_empty_tags() {
        assert_eq!(sample_blog("", STATUS_PUBLISHED).first_tag(), None);
        // A leading comma means the first entry is blank; no tag is
        // reported even though later entries exist.
        assert_eq!(sample_blog(", rust", STATUS_PUBLISHED).first_tag(), None);
    }

    #[test]
    fn test_first_tag_trims_whitespace() {
        let blog = sample_blog("  rust  ,web", STATUS_PUBLISHED);
        assert_eq!(blog.first_tag(), Some("rust"));
    }

    #[test]
    fn test_search_pattern_escapes_wildcards() {
        assert_eq!(search_pattern("100%"), "%100\\%%");
        assert_eq!(search_pattern("snake_case"), "%snake\\_case%");
        assert_eq!(search_pattern("plain"), "%plain%");
    }
}

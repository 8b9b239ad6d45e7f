//! Engagement endpoints: like and bookmark toggles.
//!
//! Both are idempotent toggles returning JSON; the page flips its button
//! state from the response instead of reloading.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use tower_sessions::Session;
use uuid::Uuid;

use crate::models::{Blog, Bookmark, Like};
use crate::routes::auth::SESSION_USER_ID;
use crate::state::AppState;

/// Like toggle response.
#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub liked: bool,
    pub count: i64,
}

/// Bookmark toggle response.
#[derive(Debug, Serialize)]
pub struct BookmarkResponse {
    pub bookmarked: bool,
    pub count: i64,
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type JsonError = (StatusCode, Json<ErrorResponse>);

fn json_error(status: StatusCode, message: &str) -> JsonError {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

/// Create the engagement router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/like/{blog_id}", post(toggle_like))
        .route("/api/bookmark/{blog_id}", post(toggle_bookmark))
}

/// Resolve the target post, applying the same visibility rule as the
/// detail page: published for everyone, drafts for their author only.
async fn load_target(
    state: &AppState,
    blog_id: Uuid,
    user_id: Uuid,
) -> Result<Blog, JsonError> {
    let blog = Blog::find_by_id(state.db(), blog_id).await.map_err(|e| {
        tracing::error!(error = %e, "failed to load blog");
        json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    })?;

    match blog {
        Some(blog) if blog.is_published() || blog.author_id == user_id => Ok(blog),
        _ => Err(json_error(StatusCode::NOT_FOUND, "Blog not found")),
    }
}

/// Toggle the caller's like on a post.
///
/// POST /api/like/{blog_id}
async fn toggle_like(
    State(state): State<AppState>,
    session: Session,
    Path(blog_id): Path<Uuid>,
) -> Result<Json<LikeResponse>, JsonError> {
    let user_id: Option<Uuid> = session.get(SESSION_USER_ID).await.ok().flatten();
    let Some(user_id) = user_id else {
        return Err(json_error(
            StatusCode::UNAUTHORIZED,
            "Authentication required",
        ));
    };

    let blog = load_target(&state, blog_id, user_id).await?;

    let liked = Like::toggle(state.db(), blog.id, user_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to toggle like");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        })?;

    let count = Like::count_for_blog(state.db(), blog.id).await.map_err(|e| {
        tracing::error!(error = %e, "failed to count likes");
        json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    })?;

    Ok(Json(LikeResponse { liked, count }))
}

/// Toggle the caller's bookmark on a post.
///
/// POST /api/bookmark/{blog_id}
async fn toggle_bookmark(
    State(state): State<AppState>,
    session: Session,
    Path(blog_id): Path<Uuid>,
) -> Result<Json<BookmarkResponse>, JsonError> {
    let user_id: Option<Uuid> = session.get(SESSION_USER_ID).await.ok().flatten();
    let Some(user_id) = user_id else {
        return Err(json_error(
            StatusCode::UNAUTHORIZED,
            "Authentication required",
        ));
    };

    let blog = load_target(&state, blog_id, user_id).await?;

    let bookmarked = Bookmark::toggle(state.db(), blog.id, user_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to toggle bookmark");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        })?;

    let count = Bookmark::count_for_blog(state.db(), blog.id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to count bookmarks");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        })?;

    Ok(Json(BookmarkResponse { bookmarked, count }))
}

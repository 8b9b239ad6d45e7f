//! Public author profiles.

use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use tower_sessions::Session;

use crate::error::{AppError, AppResult};
use crate::models::{Blog, Like, User};
use crate::state::AppState;

use super::helpers::{page_context, render_page};

/// Public stats shown on a profile.
#[derive(Debug, Serialize)]
struct ProfileStats {
    posts: i64,
    likes: i64,
}

/// Create the profile router.
pub fn router() -> Router<AppState> {
    Router::new().route("/profile/{username}", get(profile))
}

/// Profile page: bio, avatar, published posts, and public stats. Drafts
/// never appear here, not even for the profile's owner.
///
/// GET /profile/{username}
async fn profile(
    State(state): State<AppState>,
    session: Session,
    Path(username): Path<String>,
) -> AppResult<Response> {
    let author = User::find_by_username(state.db(), &username)
        .await?
        .ok_or(AppError::NotFound)?;

    let posts = Blog::list_published_by_author(state.db(), author.id).await?;
    let stats = ProfileStats {
        posts: Blog::count_published_by_author(state.db(), author.id).await?,
        likes: Like::count_for_author(state.db(), author.id).await?,
    };

    let (mut context, user) = page_context(&state, &session).await;
    context.insert("author", &author);
    context.insert("posts", &posts);
    context.insert("stats", &stats);
    context.insert(
        "is_self",
        &user.as_ref().is_some_and(|u| u.id == author.id),
    );

    Ok(render_page(&state, "profile.html", &context))
}

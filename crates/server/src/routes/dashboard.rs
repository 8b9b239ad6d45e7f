//! Author dashboard.

use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use tower_sessions::Session;

use crate::error::AppResult;
use crate::models::{Blog, Bookmark, Like};
use crate::state::AppState;

use super::helpers::{page_context, render_page, require_login};

/// Own posts shown on the dashboard.
const DASHBOARD_POSTS_LIMIT: i64 = 10;

/// Bookmarks shown on the dashboard.
const DASHBOARD_BOOKMARKS_LIMIT: i64 = 10;

/// Aggregate numbers across an author's posts.
#[derive(Debug, Serialize)]
struct DashboardTotals {
    posts: i64,
    published: i64,
    likes: i64,
    views: i64,
}

/// Create the dashboard router.
pub fn router() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard))
}

/// Dashboard page: recent own posts, aggregate totals, and the newest
/// bookmarks.
///
/// GET /dashboard
async fn dashboard(State(state): State<AppState>, session: Session) -> AppResult<Response> {
    let user = match require_login(&state, &session).await {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };

    let totals = DashboardTotals {
        posts: Blog::count_by_author(state.db(), user.id).await?,
        published: Blog::count_published_by_author(state.db(), user.id).await?,
        likes: Like::count_for_author(state.db(), user.id).await?,
        views: Blog::total_views_for_author(state.db(), user.id).await?,
    };

    let posts = Blog::list_by_author(state.db(), user.id, DASHBOARD_POSTS_LIMIT, 0).await?;
    let bookmarks =
        Bookmark::recent_for_user(state.db(), user.id, DASHBOARD_BOOKMARKS_LIMIT).await?;

    let (mut context, _) = page_context(&state, &session).await;
    context.insert("totals", &totals);
    context.insert("posts", &posts);
    context.insert("bookmarks", &bookmarks);

    Ok(render_page(&state, "dashboard.html", &context))
}

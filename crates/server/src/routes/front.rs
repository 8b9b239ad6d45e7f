//! Front page and public listing routes.

use axum::extract::{Query, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::AppResult;
use crate::models::Blog;
use crate::state::AppState;

use super::helpers::{Pager, page_context, render_page};

/// Posts per page on the listing pages.
const LISTING_PAGE_SIZE: i64 = 12;

/// Featured posts shown on the front page.
const FRONT_FEATURED_LIMIT: i64 = 3;

/// Page number query parameter.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: i64,
}

fn default_page() -> i64 {
    1
}

/// Create the front page router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/recent-stories", get(recent_stories))
        .route("/popular-stories", get(popular_stories))
}

/// Front page: the newest featured posts.
///
/// GET /
async fn home(State(state): State<AppState>, session: Session) -> AppResult<Response> {
    let featured = Blog::featured(state.db(), FRONT_FEATURED_LIMIT).await?;

    let (mut context, _) = page_context(&state, &session).await;
    context.insert("featured", &featured);

    Ok(render_page(&state, "home.html", &context))
}

/// Published posts, newest first.
///
/// GET /recent-stories?page=
async fn recent_stories(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<PageQuery>,
) -> AppResult<Response> {
    let total = Blog::count_published(state.db()).await?;
    let pager = Pager::new(query.page, LISTING_PAGE_SIZE, total);
    let posts = Blog::list_recent(state.db(), pager.per_page, pager.offset()).await?;

    let (mut context, _) = page_context(&state, &session).await;
    context.insert("heading", "Recent stories");
    context.insert("page_prefix", "/recent-stories?");
    context.insert("posts", &posts);
    context.insert("pager", &pager);

    Ok(render_page(&state, "listing.html", &context))
}

/// Published posts, most viewed first.
///
/// GET /popular-stories?page=
async fn popular_stories(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<PageQuery>,
) -> AppResult<Response> {
    let total = Blog::count_published(state.db()).await?;
    let pager = Pager::new(query.page, LISTING_PAGE_SIZE, total);
    let posts = Blog::list_popular(state.db(), pager.per_page, pager.offset()).await?;

    let (mut context, _) = page_context(&state, &session).await;
    context.insert("heading", "Popular stories");
    context.insert("page_prefix", "/popular-stories?");
    context.insert("posts", &posts);
    context.insert("pager", &pager);

    Ok(render_page(&state, "listing.html", &context))
}

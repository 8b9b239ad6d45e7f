//! Full-text-ish search over published posts.

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::AppResult;
use crate::models::Blog;
use crate::state::AppState;

use super::helpers::{Pager, page_context, render_page};

/// Results per page.
const SEARCH_PAGE_SIZE: i64 = 10;

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
}

fn default_page() -> i64 {
    1
}

/// Create the search router.
pub fn router() -> Router<AppState> {
    Router::new().route("/search", get(search))
}

/// Search published posts by title, body, or tags.
///
/// GET /search?q=&page=
///
/// A blank query goes back to the front page instead of listing
/// everything.
async fn search(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<SearchQuery>,
) -> AppResult<Response> {
    let term = query.q.as_deref().unwrap_or_default().trim().to_string();
    if term.is_empty() {
        return Ok(Redirect::to("/").into_response());
    }

    let total = Blog::search_count(state.db(), &term).await?;
    let pager = Pager::new(query.page, SEARCH_PAGE_SIZE, total);
    let posts = Blog::search(state.db(), &term, pager.per_page, pager.offset()).await?;

    let (mut context, _) = page_context(&state, &session).await;
    context.insert("query", &term);
    context.insert(
        "page_prefix",
        &format!("/search?q={}&", urlencoding::encode(&term)),
    );
    context.insert("posts", &posts);
    context.insert("pager", &pager);

    Ok(render_page(&state, "search.html", &context))
}

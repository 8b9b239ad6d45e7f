//! Shared route helpers: auth guards, flash messages, page rendering.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use uuid::Uuid;

use crate::models::User;
use crate::state::AppState;

use super::auth::SESSION_USER_ID;

/// Session key for flash messages awaiting display.
const SESSION_FLASHES: &str = "_flashes";

/// One queued flash message.
///
/// Categories are `success`, `danger`, `warning`, and `info`; the base
/// template maps them to alert styles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flash {
    pub category: String,
    pub message: String,
}

/// Queue a flash message for the next rendered page.
pub async fn flash(session: &Session, category: &str, message: &str) {
    let mut queued: Vec<Flash> = session
        .get(SESSION_FLASHES)
        .await
        .ok()
        .flatten()
        .unwrap_or_default();

    queued.push(Flash {
        category: category.to_string(),
        message: message.to_string(),
    });

    if let Err(e) = session.insert(SESSION_FLASHES, queued).await {
        tracing::error!(error = %e, "failed to queue flash message");
    }
}

/// Drain every queued flash message.
pub async fn take_flashes(session: &Session) -> Vec<Flash> {
    session
        .remove::<Vec<Flash>>(SESSION_FLASHES)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Load the authenticated user, if any.
pub async fn current_user(state: &AppState, session: &Session) -> Option<User> {
    let user_id: Option<Uuid> = session.get(SESSION_USER_ID).await.ok().flatten();

    if let Some(id) = user_id {
        if let Ok(Some(user)) = User::find_by_id(state.db(), id).await {
            return Some(user);
        }
    }

    None
}

/// Require an authenticated user, or redirect to login.
///
/// Returns the [`User`] if one is logged in. Returns a redirect response if
/// the session contains no valid user id.
pub async fn require_login(state: &AppState, session: &Session) -> Result<User, Response> {
    match current_user(state, session).await {
        Some(user) => Ok(user),
        None => {
            flash(session, "warning", "Please log in to continue.").await;
            Err(Redirect::to("/auth/login").into_response())
        }
    }
}

/// Build the base template context every page shares: the authenticated
/// user (if any) and the drained flash messages.
pub async fn page_context(state: &AppState, session: &Session) -> (tera::Context, Option<User>) {
    let user = current_user(state, session).await;

    let mut context = tera::Context::new();
    context.insert("current_user", &user);
    context.insert("authenticated", &user.is_some());
    context.insert("flashes", &take_flashes(session).await);
    context.insert("site_url", state.site_url());

    (context, user)
}

/// Render a template to a response.
///
/// Falls back to a minimal error page when rendering fails, so a broken or
/// missing template never turns into an opaque 500.
pub fn render_page(state: &AppState, template: &str, context: &tera::Context) -> Response {
    match state.theme().render(template, context) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!(error = %e, template = %template, "failed to render template");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(format!(
                    r#"<!DOCTYPE html>
<html><head><title>Error</title></head>
<body><h1>Template Error</h1><pre>{}</pre></body></html>"#,
                    html_escape(&e.to_string())
                )),
            )
                .into_response()
        }
    }
}

/// Pagination window for listing pages.
#[derive(Debug, Clone, Serialize)]
pub struct Pager {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
    pub has_prev: bool,
    pub has_next: bool,
}

impl Pager {
    /// Build a pager, clamping `page` to at least 1.
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        let page = page.max(1);
        let total_pages = if total == 0 {
            0
        } else {
            (total + per_page - 1) / per_page
        };

        Self {
            page,
            per_page,
            total,
            total_pages,
            has_prev: page > 1,
            has_next: page < total_pages,
        }
    }

    /// SQL offset of the current page.
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }
}

/// Accept a post-login redirect target only when it is a same-site path.
///
/// Rejects absolute URLs and protocol-relative (`//host`) forms so the
/// `next` parameter cannot bounce users to another origin.
pub fn is_safe_next(next: &str) -> bool {
    next.starts_with('/') && !next.starts_with("//") && !next.starts_with("/\\")
}

/// HTML-escape a string for safe output.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_pager_first_page() {
        let pager = Pager::new(1, 10, 35);
        assert_eq!(pager.total_pages, 4);
        assert_eq!(pager.offset(), 0);
        assert!(!pager.has_prev);
        assert!(pager.has_next);
    }

    #[test]
    fn test_pager_middle_page() {
        let pager = Pager::new(3, 10, 35);
        assert_eq!(pager.offset(), 20);
        assert!(pager.has_prev);
        assert!(pager.has_next);
    }

    #[test]
    fn test_pager_last_page() {
        let pager = Pager::new(4, 10, 35);
        assert!(pager.has_prev);
        assert!(!pager.has_next);
    }

    #[test]
    fn test_pager_clamps_page_to_one() {
        let pager = Pager::new(0, 10, 35);
        assert_eq!(pager.page, 1);
        assert_eq!(pager.offset(), 0);

        let pager = Pager::new(-5, 10, 35);
        assert_eq!(pager.page, 1);
    }

    #[test]
    fn test_pager_empty_results() {
        let pager = Pager::new(1, 10, 0);
        assert_eq!(pager.total_pages, 0);
        assert!(!pager.has_prev);
        assert!(!pager.has_next);
    }

    #[test]
    fn test_pager_exact_multiple() {
        let pager = Pager::new(1, 10, 30);
        assert_eq!(pager.total_pages, 3);
    }

    #[test]
    fn test_is_safe_next_accepts_paths() {
        assert!(is_safe_next("/dashboard"));
        assert!(is_safe_next("/blog/hello-world"));
        assert!(is_safe_next("/"));
    }

    #[test]
    fn test_is_safe_next_rejects_external() {
        assert!(!is_safe_next("https://evil.example"));
        assert!(!is_safe_next("//evil.example"));
        assert!(!is_safe_next("/\\evil.example"));
        assert!(!is_safe_next(""));
    }

    #[test]
    fn test_html_escape_special_chars() {
        assert_eq!(
            html_escape("<script>alert('xss')</script>"),
            "&lt;script&gt;alert(&#x27;xss&#x27;)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_html_escape_ampersand_first() {
        assert_eq!(html_escape("a & <b>"), "a &amp; &lt;b&gt;");
    }

    #[test]
    fn test_html_escape_plain_text() {
        assert_eq!(html_escape("hello world"), "hello world");
    }
}

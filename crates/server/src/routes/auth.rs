//! Authentication routes (register, login, logout).

use anyhow::Context as _;
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use serde::Deserialize;
use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, Session};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::{CreateUser, User};
use crate::session::REMEMBER_ME_SESSION_EXPIRY_DAYS;
use crate::state::AppState;

use super::helpers::{
    Flash, current_user, flash, html_escape, is_safe_next, take_flashes,
};

/// Session key for storing the authenticated user ID.
pub const SESSION_USER_ID: &str = "user_id";

/// Registration form fields.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Login form fields. `credential` accepts a username or an email.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub credential: String,
    pub password: String,
    #[serde(default)]
    pub remember: Option<String>,
    #[serde(default)]
    pub next: Option<String>,
}

/// Query parameters for the login form.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

/// Create the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", get(register_form).post(register_submit))
        .route("/auth/login", get(login_form).post(login_submit))
        .route("/auth/logout", get(logout))
}

/// Registration form.
///
/// GET /auth/register
async fn register_form(State(state): State<AppState>, session: Session) -> Response {
    if current_user(&state, &session).await.is_some() {
        return Redirect::to("/").into_response();
    }

    render_register(&state, &session, "", "").await
}

/// Registration submit.
///
/// POST /auth/register
///
/// Every violated rule gets its own flash message; nothing is persisted
/// until all of them pass.
async fn register_submit(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> AppResult<Response> {
    if current_user(&state, &session).await.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let username = form.username.trim().to_string();
    let email = form.email.trim().to_lowercase();

    let mut errors: Vec<&str> = Vec::new();
    if username.chars().count() < 3 {
        errors.push("Username must be at least 3 characters.");
    }
    if !email.contains('@') {
        errors.push("Valid email is required.");
    }
    if form.password.chars().count() < 8 {
        errors.push("Password must be at least 8 characters.");
    }
    if form.password != form.confirm_password {
        errors.push("Passwords do not match.");
    }

    if !errors.is_empty() {
        for message in errors {
            flash(&session, "danger", message).await;
        }
        return Ok(render_register(&state, &session, &username, &email).await);
    }

    // Uniqueness checks only run once the basic rules pass.
    let mut taken = false;
    if User::find_by_username(state.db(), &username).await?.is_some() {
        flash(&session, "danger", "Username already taken.").await;
        taken = true;
    }
    if User::find_by_email(state.db(), &email).await?.is_some() {
        flash(&session, "danger", "Email already registered.").await;
        taken = true;
    }
    if taken {
        return Ok(render_register(&state, &session, &username, &email).await);
    }

    let user = User::create(
        state.db(),
        CreateUser {
            username,
            email,
            password: form.password,
            avatar: None,
        },
    )
    .await?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    flash(&session, "success", "Registration successful! Please login.").await;
    Ok(Redirect::to("/auth/login").into_response())
}

/// Login form.
///
/// GET /auth/login
async fn login_form(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<LoginQuery>,
) -> Response {
    if current_user(&state, &session).await.is_some() {
        return Redirect::to("/").into_response();
    }

    let next = query.next.as_deref().filter(|n| is_safe_next(n));
    render_login(&state, &session, next).await
}

/// Login submit.
///
/// POST /auth/login
async fn login_submit(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    // An email credential is lowercased to match storage; a username is
    // matched as entered.
    let mut credential = form.credential.trim().to_string();
    if credential.contains('@') {
        credential = credential.to_lowercase();
    }

    let next = form.next.as_deref().filter(|n| is_safe_next(n));

    let user = User::find_by_credential(state.db(), &credential).await?;
    let user = match user {
        Some(user) if user.verify_password(&form.password) => user,
        _ => {
            flash(&session, "danger", "Invalid credentials").await;
            return Ok(render_login(&state, &session, next).await);
        }
    };

    session
        .insert(SESSION_USER_ID, user.id)
        .await
        .context("failed to store user id in session")
        .map_err(AppError::from)?;

    if form.remember.is_some() {
        session.set_expiry(Some(Expiry::OnInactivity(Duration::days(
            REMEMBER_ME_SESSION_EXPIRY_DAYS,
        ))));
    }

    if let Err(e) = User::touch_login(state.db(), user.id).await {
        tracing::warn!(error = %e, user_id = %user.id, "failed to update login timestamp");
    }

    info!(user_id = %user.id, "user logged in");
    flash(&session, "success", "Logged in successfully!").await;

    Ok(Redirect::to(next.unwrap_or("/")).into_response())
}

/// Logout.
///
/// GET /auth/logout
async fn logout(session: Session) -> Response {
    let user_id: Option<uuid::Uuid> = session.get(SESSION_USER_ID).await.ok().flatten();

    // Empty the session rather than deleting it so the farewell flash
    // still has somewhere to live.
    session.clear().await;

    if let Some(id) = user_id {
        info!(user_id = %id, "user logged out");
    }

    flash(&session, "info", "You have been logged out.").await;
    Redirect::to("/").into_response()
}

/// Render the login page, falling back to a built-in form when the
/// template is missing.
async fn render_login(state: &AppState, session: &Session, next: Option<&str>) -> Response {
    let flashes = take_flashes(session).await;

    let mut context = tera::Context::new();
    context.insert("authenticated", &false);
    context.insert("flashes", &flashes);
    context.insert("next", next.unwrap_or_default());

    match state.theme().render("auth/login.html", &context) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::debug!(error = %e, "using built-in login form");
            Html(login_fallback(&flashes, next)).into_response()
        }
    }
}

/// Render the registration page, falling back to a built-in form when the
/// template is missing. Submitted values are echoed back; the password
/// never is.
async fn render_register(
    state: &AppState,
    session: &Session,
    username: &str,
    email: &str,
) -> Response {
    let flashes = take_flashes(session).await;

    let mut context = tera::Context::new();
    context.insert("authenticated", &false);
    context.insert("flashes", &flashes);
    context.insert("username", username);
    context.insert("email", email);

    match state.theme().render("auth/register.html", &context) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::debug!(error = %e, "using built-in registration form");
            Html(register_fallback(&flashes, username, email)).into_response()
        }
    }
}

fn flash_list(flashes: &[Flash]) -> String {
    flashes
        .iter()
        .map(|f| {
            format!(
                "<p class=\"flash flash-{}\">{}</p>\n",
                html_escape(&f.category),
                html_escape(&f.message)
            )
        })
        .collect()
}

fn login_fallback(flashes: &[Flash], next: Option<&str>) -> String {
    let next_field = next
        .map(|n| {
            format!(
                "<input type=\"hidden\" name=\"next\" value=\"{}\">\n",
                html_escape(n)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html><head><title>Log in</title></head>
<body style="font-family: sans-serif; max-width: 400px; margin: 100px auto; padding: 2rem;">
<h1>Log in</h1>
{flashes}<form method="post" action="/auth/login">
{next_field}<p><label>Username or email<br><input type="text" name="credential" required></label></p>
<p><label>Password<br><input type="password" name="password" required></label></p>
<p><label><input type="checkbox" name="remember" value="1"> Remember me</label></p>
<p><button type="submit">Log in</button></p>
</form>
<p><a href="/auth/register">Create an account</a> | <a href="/auth/google-login">Sign in with Google</a></p>
</body></html>"#,
        flashes = flash_list(flashes),
    )
}

fn register_fallback(flashes: &[Flash], username: &str, email: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html><head><title>Register</title></head>
<body style="font-family: sans-serif; max-width: 400px; margin: 100px auto; padding: 2rem;">
<h1>Register</h1>
{flashes}<form method="post" action="/auth/register">
<p><label>Username<br><input type="text" name="username" value="{username}" required></label></p>
<p><label>Email<br><input type="email" name="email" value="{email}" required></label></p>
<p><label>Password<br><input type="password" name="password" required></label></p>
<p><label>Confirm password<br><input type="password" name="confirm_password" required></label></p>
<p><button type="submit">Register</button></p>
</form>
<p><a href="/auth/login">Already have an account?</a></p>
</body></html>"#,
        flashes = flash_list(flashes),
        username = html_escape(username),
        email = html_escape(email),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_login_fallback_includes_next_field() {
        let html = login_fallback(&[], Some("/dashboard"));
        assert!(html.contains(r#"name="next" value="/dashboard""#));
    }

    #[test]
    fn test_login_fallback_without_next() {
        let html = login_fallback(&[], None);
        assert!(!html.contains(r#"name="next""#));
    }

    #[test]
    fn test_register_fallback_escapes_echoed_values() {
        let html = register_fallback(&[], "<script>", "a@b.com");
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_flash_list_escapes_messages() {
        let flashes = vec![Flash {
            category: "danger".to_string(),
            message: "a < b".to_string(),
        }];
        let html = flash_list(&flashes);
        assert!(html.contains("flash-danger"));
        assert!(html.contains("a &lt; b"));
    }
}

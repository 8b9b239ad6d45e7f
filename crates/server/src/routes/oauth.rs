//! Google sign-in routes.
//!
//! The relying-party side of OpenID Connect against Google: authorization
//! redirect with a state token and PKCE (RFC 7636), code exchange,
//! userinfo claims, and local account provisioning.

use std::sync::Arc;

use anyhow::Context as _;
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Json, Router};
use rand::RngCore;
use serde::Deserialize;
use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, Session};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::{CreateUser, User};
use crate::services::google::{
    GoogleAuth, GoogleClaims, GoogleCredentials, code_challenge, derive_username_base,
    generate_code_verifier, generate_state_token, state_matches,
};
use crate::services::slug::generate_unique_username;
use crate::session::REMEMBER_ME_SESSION_EXPIRY_DAYS;
use crate::state::AppState;

use super::auth::SESSION_USER_ID;
use super::helpers::{Flash, flash, html_escape, take_flashes};

/// Session key for the state token awaiting the callback.
const SESSION_OAUTH_STATE: &str = "oauth_state";

/// Session key for the PKCE code verifier awaiting the callback.
const SESSION_PKCE_VERIFIER: &str = "pkce_verifier";

/// Callback query parameters from Google.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub code: String,
    pub error: Option<String>,
}

/// Credential configuration form fields.
#[derive(Debug, Deserialize)]
pub struct ConfigForm {
    pub client_id: String,
    pub client_secret: String,
}

/// Create the Google sign-in router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/google-login", get(google_login))
        .route("/auth/google-callback", get(google_callback))
        .route("/auth/google/config", get(config_form).post(config_submit))
        .route("/auth/google/debug", get(debug_status))
}

/// Begin the Google sign-in flow.
///
/// GET /auth/google-login
async fn google_login(State(state): State<AppState>, session: Session) -> Response {
    let Some(google) = state.google() else {
        flash(
            &session,
            "danger",
            "Google login is not configured. Please set GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET.",
        )
        .await;
        return Redirect::to("/auth/login").into_response();
    };

    let state_token = generate_state_token();
    let verifier = generate_code_verifier();
    let challenge = code_challenge(&verifier);

    // Both values must survive until the callback; the state token is
    // compared there and the verifier is sent with the code exchange.
    for (key, value) in [
        (SESSION_OAUTH_STATE, &state_token),
        (SESSION_PKCE_VERIFIER, &verifier),
    ] {
        if let Err(e) = session.insert(key, value).await {
            tracing::error!(error = %e, "failed to store sign-in state in session");
            flash(
                &session,
                "danger",
                "Google authorization failed. Please try again.",
            )
            .await;
            return Redirect::to("/auth/login").into_response();
        }
    }

    match google.authorization_url(&state_token, &challenge).await {
        Ok(url) => Redirect::to(&url).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to build Google authorization URL");
            flash(
                &session,
                "danger",
                "Google authorization failed. Please try again.",
            )
            .await;
            Redirect::to("/auth/login").into_response()
        }
    }
}

/// Complete the Google sign-in flow.
///
/// GET /auth/google-callback
///
/// Every failure redirects to the login page with a non-technical flash;
/// the underlying cause is only ever logged.
async fn google_callback(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<CallbackQuery>,
) -> AppResult<Response> {
    let Some(google) = state.google() else {
        flash(
            &session,
            "danger",
            "Google login is not configured. Please set GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET.",
        )
        .await;
        return Ok(Redirect::to("/auth/login").into_response());
    };

    if let Some(err) = query.error.as_deref().filter(|e| !e.is_empty()) {
        tracing::warn!(error = err, "Google authorization was refused");
        flash(
            &session,
            "danger",
            "Google authorization failed. Please try again.",
        )
        .await;
        return Ok(Redirect::to("/auth/login").into_response());
    }

    // The callback must carry the same state token this session handed to
    // Google, compared in constant time. A missing or stale token means
    // the flow did not start here (or the session died in between).
    let expected: Option<String> = session.remove(SESSION_OAUTH_STATE).await.ok().flatten();
    let verifier: Option<String> = session.remove(SESSION_PKCE_VERIFIER).await.ok().flatten();
    let (Some(expected), Some(verifier)) = (expected, verifier) else {
        flash(
            &session,
            "warning",
            "Session expired. Please try logging in again.",
        )
        .await;
        return Ok(Redirect::to("/auth/login").into_response());
    };

    if !state_matches(&expected, &query.state) {
        tracing::warn!("state token mismatch on Google callback");
        flash(
            &session,
            "warning",
            "Session expired. Please try logging in again.",
        )
        .await;
        return Ok(Redirect::to("/auth/login").into_response());
    }

    if query.code.is_empty() {
        flash(
            &session,
            "danger",
            "Google authorization failed. Please try again.",
        )
        .await;
        return Ok(Redirect::to("/auth/login").into_response());
    }

    let access_token = match google.exchange_code(&query.code, &verifier).await {
        Ok(token) => token,
        Err(e) => {
            tracing::warn!(error = %e, "Google code exchange failed");
            flash(
                &session,
                "danger",
                "Google authorization failed. Please try again.",
            )
            .await;
            return Ok(Redirect::to("/auth/login").into_response());
        }
    };

    let claims = match google.fetch_claims(&access_token).await {
        Ok(claims) => claims,
        Err(e) => {
            tracing::warn!(error = %e, "failed to fetch Google profile");
            flash(&session, "danger", "Unable to retrieve Google profile.").await;
            return Ok(Redirect::to("/auth/login").into_response());
        }
    };

    // An explicitly unverified email cannot be trusted to match a local
    // account; an absent flag is left to Google's own issuance policy.
    if claims.email_verified == Some(false) {
        flash(&session, "danger", "Google account email is not verified.").await;
        return Ok(Redirect::to("/auth/login").into_response());
    }

    let email = claims
        .email
        .as_deref()
        .map(str::to_lowercase)
        .filter(|e| !e.is_empty());
    let Some(email) = email else {
        flash(&session, "danger", "Google account has no email.").await;
        return Ok(Redirect::to("/auth/login").into_response());
    };

    let user = match User::find_by_email(state.db(), &email).await? {
        Some(user) => user,
        None => provision_user(&state, &claims, &email).await?,
    };

    session
        .insert(SESSION_USER_ID, user.id)
        .await
        .context("failed to store user id in session")
        .map_err(AppError::from)?;

    // External sign-ins are always remembered.
    session.set_expiry(Some(Expiry::OnInactivity(Duration::days(
        REMEMBER_ME_SESSION_EXPIRY_DAYS,
    ))));

    if let Err(e) = User::touch_login(state.db(), user.id).await {
        tracing::warn!(error = %e, user_id = %user.id, "failed to update login timestamp");
    }

    info!(user_id = %user.id, "user logged in with Google");
    flash(&session, "success", "Logged in with Google.").await;
    Ok(Redirect::to("/").into_response())
}

/// Create a local account from Google claims.
///
/// The username comes from the profile name (or the email's local part),
/// disambiguated the same way slugs are. The account is external-identity
/// only, so its password slot is filled with random bytes nobody knows.
async fn provision_user(
    state: &AppState,
    claims: &GoogleClaims,
    email: &str,
) -> AppResult<User> {
    let base = derive_username_base(claims.name.as_deref(), email);
    let username = generate_unique_username(state.db(), &base).await?;

    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    let password = hex::encode(bytes);

    let user = User::create(
        state.db(),
        CreateUser {
            username,
            email: email.to_string(),
            password,
            avatar: claims.picture.clone(),
        },
    )
    .await?;

    info!(
        user_id = %user.id,
        username = %user.username,
        google_sub = %claims.sub,
        "provisioned account from Google sign-in"
    );
    Ok(user)
}

/// Credential configuration form.
///
/// GET /auth/google/config
async fn config_form(State(state): State<AppState>, session: Session) -> Response {
    let flashes = take_flashes(&session).await;
    let configured = state.google().is_some();

    let mut context = tera::Context::new();
    context.insert("authenticated", &false);
    context.insert("flashes", &flashes);
    context.insert("configured", &configured);

    match state.theme().render("auth/google_config.html", &context) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::debug!(error = %e, "using built-in Google config form");
            Html(config_fallback(&flashes, configured)).into_response()
        }
    }
}

/// Persist credentials and swap in a fresh client.
///
/// POST /auth/google/config
async fn config_submit(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ConfigForm>,
) -> Response {
    let client_id = form.client_id.trim().to_string();
    let client_secret = form.client_secret.trim().to_string();

    if client_id.is_empty() || client_secret.is_empty() {
        flash(&session, "danger", "Client ID and Secret are required.").await;
        return Redirect::to("/auth/google/config").into_response();
    }

    let credentials = GoogleCredentials {
        client_id,
        client_secret,
    };

    if let Err(e) = credentials.save_file(state.google_oauth_file()) {
        tracing::error!(error = %e, "failed to persist Google credentials");
        flash(&session, "danger", "Failed to save configuration.").await;
        return Redirect::to("/auth/google/config").into_response();
    }

    let client = GoogleAuth::new(credentials, state.google_redirect_url().to_string());
    state.set_google(Some(Arc::new(client)));

    info!("Google sign-in reconfigured");
    flash(&session, "success", "Google OAuth configured successfully.").await;
    Redirect::to("/auth/login").into_response()
}

/// Configuration status as JSON, for operators diagnosing a deployment.
///
/// GET /auth/google/debug
async fn debug_status(State(state): State<AppState>) -> Json<serde_json::Value> {
    let env_present = |key: &str| std::env::var(key).map(|v| !v.is_empty()).unwrap_or(false);

    Json(serde_json::json!({
        "google_oauth_registered": state.google().is_some(),
        "GOOGLE_CLIENT_ID_present": env_present("GOOGLE_CLIENT_ID"),
        "GOOGLE_CLIENT_SECRET_present": env_present("GOOGLE_CLIENT_SECRET"),
        "redirect_uri_example": state.google_redirect_url(),
    }))
}

fn config_fallback(flashes: &[Flash], configured: bool) -> String {
    let status = if configured {
        "Google sign-in is currently configured."
    } else {
        "Google sign-in is not configured."
    };
    let flash_html: String = flashes
        .iter()
        .map(|f| {
            format!(
                "<p class=\"flash flash-{}\">{}</p>\n",
                html_escape(&f.category),
                html_escape(&f.message)
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html><head><title>Google sign-in</title></head>
<body style="font-family: sans-serif; max-width: 400px; margin: 100px auto; padding: 2rem;">
<h1>Google sign-in</h1>
{flash_html}<p>{status}</p>
<form method="post" action="/auth/google/config">
<p><label>Client ID<br><input type="text" name="client_id" required></label></p>
<p><label>Client secret<br><input type="password" name="client_secret" required></label></p>
<p><button type="submit">Save</button></p>
</form>
</body></html>"#
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_fallback_reports_status() {
        assert!(config_fallback(&[], true).contains("currently configured"));
        assert!(config_fallback(&[], false).contains("not configured"));
    }

    #[test]
    fn test_config_fallback_renders_flashes() {
        let flashes = vec![Flash {
            category: "danger".to_string(),
            message: "Client ID and Secret are required.".to_string(),
        }];
        let html = config_fallback(&flashes, false);
        assert!(html.contains("flash-danger"));
        assert!(html.contains("Client ID and Secret are required."));
    }
}

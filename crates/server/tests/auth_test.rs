#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Authentication flow tests: forms, validation, guards, and the Google
//! sign-in endpoints in their unconfigured state.

use axum::body::Body;
use axum::http::{Request, StatusCode};

mod common;
use common::{extract_cookies, form_body, location, response_json, response_text, run_test, shared_app};

#[test]
fn login_page_renders_form() {
    run_test(async {
        let app = shared_app();

        let response = app
            .request(Request::get("/auth/login").body(Body::empty()).unwrap())
            .await;

        assert_eq!(response.status(), StatusCode::OK);

        let body = response_text(response).await;
        assert!(body.contains("name=\"credential\""));
        assert!(body.contains("name=\"password\""));
        assert!(body.contains("name=\"remember\""));
    });
}

#[test]
fn login_page_carries_safe_next_target() {
    run_test(async {
        let app = shared_app();

        let response = app
            .request(
                Request::get("/auth/login?next=/blog/some-post")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;

        assert_eq!(response.status(), StatusCode::OK);

        let body = response_text(response).await;
        assert!(body.contains("value=\"/blog/some-post\""));
    });
}

#[test]
fn login_page_drops_offsite_next_target() {
    run_test(async {
        let app = shared_app();

        let response = app
            .request(
                Request::get("/auth/login?next=//evil.example.com/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;

        assert_eq!(response.status(), StatusCode::OK);

        let body = response_text(response).await;
        assert!(!body.contains("evil.example.com"));
    });
}

#[test]
fn register_page_renders_form() {
    run_test(async {
        let app = shared_app();

        let response = app
            .request(Request::get("/auth/register").body(Body::empty()).unwrap())
            .await;

        assert_eq!(response.status(), StatusCode::OK);

        let body = response_text(response).await;
        assert!(body.contains("name=\"username\""));
        assert!(body.contains("name=\"email\""));
        assert!(body.contains("name=\"confirm_password\""));
    });
}

#[test]
fn register_rejects_short_password() {
    run_test(async {
        let app = shared_app();

        let response = app
            .request(
                Request::post("/auth/register")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(form_body(&[
                        ("username", "readerly"),
                        ("email", "readerly@example.com"),
                        ("password", "short"),
                        ("confirm_password", "short"),
                    ]))
                    .unwrap(),
            )
            .await;

        // Validation failures re-render the form instead of redirecting.
        assert_eq!(response.status(), StatusCode::OK);

        let body = response_text(response).await;
        assert!(body.contains("Password must be at least 8 characters."));
        // Entered values are echoed back.
        assert!(body.contains("value=\"readerly\""));
        assert!(body.contains("value=\"readerly@example.com\""));
    });
}

#[test]
fn register_rejects_mismatched_passwords() {
    run_test(async {
        let app = shared_app();

        let response = app
            .request(
                Request::post("/auth/register")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(form_body(&[
                        ("username", "readerly"),
                        ("email", "readerly@example.com"),
                        ("password", "longenough1"),
                        ("confirm_password", "longenough2"),
                    ]))
                    .unwrap(),
            )
            .await;

        assert_eq!(response.status(), StatusCode::OK);

        let body = response_text(response).await;
        assert!(body.contains("Passwords do not match."));
    });
}

#[test]
fn register_collects_every_violation() {
    run_test(async {
        let app = shared_app();

        let response = app
            .request(
                Request::post("/auth/register")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(form_body(&[
                        ("username", "ab"),
                        ("email", "not-an-email"),
                        ("password", "short"),
                        ("confirm_password", "different"),
                    ]))
                    .unwrap(),
            )
            .await;

        assert_eq!(response.status(), StatusCode::OK);

        let body = response_text(response).await;
        assert!(body.contains("Username must be at least 3 characters."));
        assert!(body.contains("Valid email is required."));
        assert!(body.contains("Password must be at least 8 characters."));
        assert!(body.contains("Passwords do not match."));
    });
}

#[test]
fn logout_redirects_home() {
    run_test(async {
        let app = shared_app();

        let response = app
            .request(Request::get("/auth/logout").body(Body::empty()).unwrap())
            .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
    });
}

#[test]
fn logout_flash_survives_into_next_page() {
    run_test(async {
        let app = shared_app();

        let response = app
            .request(Request::get("/auth/logout").body(Body::empty()).unwrap())
            .await;
        let cookies = extract_cookies(&response);
        assert!(!cookies.is_empty(), "logout should leave a session cookie");

        // The farewell flash is waiting on the login page.
        let response = app
            .request_with_cookies(
                Request::get("/auth/login").body(Body::empty()).unwrap(),
                &cookies,
            )
            .await;

        let body = response_text(response).await;
        assert!(body.contains("You have been logged out."));
    });
}

#[test]
fn flashes_are_drained_after_display() {
    run_test(async {
        let app = shared_app();

        let response = app
            .request(Request::get("/auth/logout").body(Body::empty()).unwrap())
            .await;
        let cookies = extract_cookies(&response);

        let first = app
            .request_with_cookies(
                Request::get("/auth/login").body(Body::empty()).unwrap(),
                &cookies,
            )
            .await;
        assert!(response_text(first).await.contains("You have been logged out."));

        // Second render of the same session shows nothing.
        let second = app
            .request_with_cookies(
                Request::get("/auth/login").body(Body::empty()).unwrap(),
                &cookies,
            )
            .await;
        assert!(!response_text(second).await.contains("You have been logged out."));
    });
}

#[test]
fn google_login_unconfigured_redirects_to_login() {
    run_test(async {
        let app = shared_app();

        let response = app
            .request(
                Request::get("/auth/google-login")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/auth/login");
    });
}

#[test]
fn google_callback_unconfigured_redirects_to_login() {
    run_test(async {
        let app = shared_app();

        let response = app
            .request(
                Request::get("/auth/google-callback?state=abc&code=def")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/auth/login");
    });
}

#[test]
fn google_config_page_renders_form() {
    run_test(async {
        let app = shared_app();

        let response = app
            .request(
                Request::get("/auth/google/config")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;

        assert_eq!(response.status(), StatusCode::OK);

        let body = response_text(response).await;
        assert!(body.contains("name=\"client_id\""));
        assert!(body.contains("name=\"client_secret\""));
    });
}

#[test]
fn google_config_rejects_blank_credentials() {
    run_test(async {
        let app = shared_app();

        let response = app
            .request(
                Request::post("/auth/google/config")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(form_body(&[("client_id", "  "), ("client_secret", "")]))
                    .unwrap(),
            )
            .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/auth/google/config");
    });
}

#[test]
fn google_debug_reports_unregistered_state() {
    run_test(async {
        let app = shared_app();

        let response = app
            .request(
                Request::get("/auth/google/debug")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;

        assert_eq!(response.status(), StatusCode::OK);

        let body = response_json(response).await;
        assert_eq!(body["google_oauth_registered"], false);
        assert_eq!(
            body["redirect_uri_example"],
            "http://localhost:8000/auth/google-callback"
        );
    });
}

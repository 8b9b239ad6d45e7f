#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Route-level tests: the health endpoint, login guards on private pages,
//! the engagement API's authentication, and search redirects.

use axum::body::Body;
use axum::http::{Request, StatusCode};

mod common;
use common::{extract_cookies, location, response_json, response_text, run_test, shared_app};

#[test]
fn health_reports_unreachable_database() {
    run_test(async {
        let app = shared_app();

        let response = app
            .request(Request::get("/health").body(Body::empty()).unwrap())
            .await;

        // The test pool points at a closed port on purpose.
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = response_json(response).await;
        assert_eq!(body["status"], "unhealthy");
        assert_eq!(body["postgres"], false);
    });
}

#[test]
fn dashboard_requires_login() {
    run_test(async {
        let app = shared_app();

        let response = app
            .request(Request::get("/dashboard").body(Body::empty()).unwrap())
            .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/auth/login");
    });
}

#[test]
fn editor_requires_login() {
    run_test(async {
        let app = shared_app();

        let response = app
            .request(Request::get("/editor").body(Body::empty()).unwrap())
            .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/auth/login");
    });
}

#[test]
fn my_blogs_requires_login() {
    run_test(async {
        let app = shared_app();

        let response = app
            .request(Request::get("/my-blogs").body(Body::empty()).unwrap())
            .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/auth/login");
    });
}

#[test]
fn comment_requires_login() {
    run_test(async {
        let app = shared_app();

        let response = app
            .request(
                Request::post("/blog/some-post/comment")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from("body=hello"))
                    .unwrap(),
            )
            .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/auth/login");
    });
}

#[test]
fn delete_blog_requires_login() {
    run_test(async {
        let app = shared_app();

        let response = app
            .request(
                Request::post("/delete-blog/0195f1f0-0000-7000-8000-000000000000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/auth/login");
    });
}

#[test]
fn login_guard_flashes_a_prompt() {
    run_test(async {
        let app = shared_app();

        let response = app
            .request(Request::get("/dashboard").body(Body::empty()).unwrap())
            .await;
        let cookies = extract_cookies(&response);
        assert!(!cookies.is_empty(), "guard should leave a session cookie");

        let response = app
            .request_with_cookies(
                Request::get("/auth/login").body(Body::empty()).unwrap(),
                &cookies,
            )
            .await;

        let body = response_text(response).await;
        assert!(body.contains("Please log in to continue."));
    });
}

#[test]
fn like_requires_authentication() {
    run_test(async {
        let app = shared_app();

        let response = app
            .request(
                Request::post("/api/like/0195f1f0-0000-7000-8000-000000000000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = response_json(response).await;
        assert_eq!(body["error"], "Authentication required");
    });
}

#[test]
fn bookmark_requires_authentication() {
    run_test(async {
        let app = shared_app();

        let response = app
            .request(
                Request::post("/api/bookmark/0195f1f0-0000-7000-8000-000000000000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = response_json(response).await;
        assert_eq!(body["error"], "Authentication required");
    });
}

#[test]
fn engagement_rejects_malformed_ids() {
    run_test(async {
        let app = shared_app();

        let response = app
            .request(
                Request::post("/api/like/not-a-uuid")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    });
}

#[test]
fn search_with_blank_query_redirects_home() {
    run_test(async {
        let app = shared_app();

        for uri in ["/search", "/search?q=", "/search?q=%20%20"] {
            let response = app
                .request(Request::get(uri).body(Body::empty()).unwrap())
                .await;

            assert_eq!(response.status(), StatusCode::SEE_OTHER, "uri: {uri}");
            assert_eq!(location(&response), "/", "uri: {uri}");
        }
    });
}

#[test]
fn unknown_route_returns_404() {
    run_test(async {
        let app = shared_app();

        let response = app
            .request(Request::get("/no-such-page").body(Body::empty()).unwrap())
            .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    });
}

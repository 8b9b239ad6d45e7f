//! Application error types.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use thiserror::Error;

/// Application errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("not found")]
    NotFound,

    #[error("unauthorized")]
    Unauthorized,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("database error")]
    Database(#[from] sqlx::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Internal causes are logged server-side only; the client gets a
        // generic message. The remaining messages are our own fixed text,
        // never echoed user input.
        let message = match &self {
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal server error");
                "Something went wrong on our end. Please try again later."
            }
            AppError::Database(e) => {
                tracing::error!(error = %e, "database error");
                "Something went wrong on our end. Please try again later."
            }
            AppError::NotFound => "The page you are looking for does not exist.",
            AppError::Unauthorized => "Please log in to continue.",
            AppError::BadRequest(msg) => msg.as_str(),
        };

        let body = format!(
            "<!DOCTYPE html><html><head><title>{status}</title></head><body>\
             <h1>{status}</h1><p>{message}</p>\
             <p><a href=\"/\">Back to home</a></p></body></html>",
            status = status.as_u16(),
        );

        (status, Html(body)).into_response()
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;

//! HTTP route handlers.

pub mod auth;
pub mod blog;
pub mod dashboard;
pub mod engage;
pub mod front;
pub mod health;
pub mod helpers;
pub mod oauth;
pub mod profile;
pub mod search;

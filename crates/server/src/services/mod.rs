//! Core services.
//!
//! Logic shared across route handlers: slug generation and the Google
//! sign-in client.

pub mod google;
pub mod slug;

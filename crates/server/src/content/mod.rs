//! Content processing.
//!
//! This module provides:
//! - `markdown`: Markdown rendering with a strict HTML allowlist
//! - `text`: Excerpt derivation and reading-time estimation

pub mod markdown;
pub mod text;

pub use markdown::render_markdown;
pub use text::{excerpt, initial_excerpt, reading_time};

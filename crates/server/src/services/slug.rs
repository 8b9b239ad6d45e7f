//! Slug generation and uniqueness resolution.
//!
//! Slugs identify posts in URLs (`/blog/my-post`) and are also used to mint
//! usernames for accounts created through Google sign-in. Collisions are
//! resolved with a bare numeric suffix (`my-post`, `my-post1`, `my-post2`);
//! existing content depends on that exact format, so there is no separator
//! before the number.

use std::collections::HashSet;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use sqlx::PgPool;

/// # Panics
///
/// Panics if the hard-coded regex literal is invalid (impossible in practice).
#[allow(clippy::expect_used)]
static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("valid regex literal"));

/// # Panics
///
/// Panics if the hard-coded regex literal is invalid (impossible in practice).
#[allow(clippy::expect_used)]
static SEPARATOR_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-\s]+").expect("valid regex literal"));

/// Convert free text into a URL-safe slug.
///
/// Lowercases and trims the input, deletes everything that is not a word
/// character, whitespace, or hyphen, then collapses each run of whitespace
/// and hyphens into a single hyphen. Word characters are Unicode-aware, so
/// accented and non-Latin titles keep their letters. Idempotent on strings
/// that are already slugs.
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = DISALLOWED.replace_all(lowered.trim(), "");
    SEPARATOR_RUN.replace_all(&stripped, "-").into_owned()
}

/// Pick the first free variant of `base` given the set of taken values.
///
/// Returns `base` itself when free, otherwise `base1`, `base2`, ... in
/// order. The numbering never skips: the first untaken suffix wins.
pub fn next_available(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    let mut i = 1u64;
    loop {
        let candidate = format!("{base}{i}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        i += 1;
    }
}

/// Escape LIKE wildcards so a slug prefix can be used as a pattern.
fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Generate a unique post slug from a title.
///
/// Fetches every existing slug sharing the prefix in one query (a superset
/// is harmless) and probes in memory, so resolution is deterministic for a
/// given title and set of existing slugs. A title with no sluggable
/// characters at all falls back to `post` so the URL stays routable.
pub async fn generate_unique_slug(pool: &PgPool, title: &str) -> Result<String> {
    let mut base = slugify(title);
    if base.is_empty() {
        base = "post".to_string();
    }

    let like_pattern = format!("{}%", escape_like(&base));
    let existing: Vec<(String,)> = sqlx::query_as("SELECT slug FROM blogs WHERE slug LIKE $1")
        .bind(&like_pattern)
        .fetch_all(pool)
        .await
        .context("failed to check slug uniqueness")?;

    let taken: HashSet<String> = existing.into_iter().map(|(s,)| s).collect();
    Ok(next_available(&base, &taken))
}

/// Generate a unique username from a preferred base, using the same
/// suffix scheme as post slugs.
pub async fn generate_unique_username(pool: &PgPool, base: &str) -> Result<String> {
    let like_pattern = format!("{}%", escape_like(base));
    let existing: Vec<(String,)> = sqlx::query_as("SELECT username FROM users WHERE username LIKE $1")
        .bind(&like_pattern)
        .fetch_all(pool)
        .await
        .context("failed to check username uniqueness")?;

    let taken: HashSet<String> = existing.into_iter().map(|(s,)| s).collect();
    Ok(next_available(base, &taken))
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("My First Blog Post"), "my-first-blog-post");
    }

    #[test]
    fn test_slugify_deletes_punctuation() {
        // Punctuation is removed, not replaced, so no hyphen appears in its place.
        assert_eq!(slugify("What's New?"), "whats-new");
        assert_eq!(slugify("Rust: 2026 Edition!"), "rust-2026-edition");
        assert_eq!(slugify("foo & bar + baz"), "foo-bar-baz");
    }

    #[test]
    fn test_slugify_keeps_underscores() {
        assert_eq!(slugify("snake_case title"), "snake_case-title");
    }

    #[test]
    fn test_slugify_collapses_separator_runs() {
        assert_eq!(slugify("hello   world"), "hello-world");
        assert_eq!(slugify("a --- b"), "a-b");
        assert_eq!(slugify("tabs\tand\nnewlines"), "tabs-and-newlines");
    }

    #[test]
    fn test_slugify_trims_whitespace() {
        assert_eq!(slugify("  hello  "), "hello");
    }

    #[test]
    fn test_slugify_unicode_letters_survive() {
        assert_eq!(slugify("Città Aperta"), "città-aperta");
        assert_eq!(slugify("Программирование 101"), "программирование-101");
    }

    #[test]
    fn test_slugify_empty_when_nothing_sluggable() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_slugify_idempotent() {
        let once = slugify("Hello, World!");
        assert_eq!(slugify(&once), once);
    }

    #[test]
    fn test_next_available_free_base() {
        let taken = HashSet::new();
        assert_eq!(next_available("my-post", &taken), "my-post");
    }

    #[test]
    fn test_next_available_appends_bare_number() {
        let taken: HashSet<String> = ["my-post".to_string()].into_iter().collect();
        assert_eq!(next_available("my-post", &taken), "my-post1");
    }

    #[test]
    fn test_next_available_increments_without_gaps() {
        let taken: HashSet<String> = ["my-post", "my-post1", "my-post2"]
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(next_available("my-post", &taken), "my-post3");
    }

    #[test]
    fn test_next_available_fills_first_hole() {
        let taken: HashSet<String> = ["my-post", "my-post2"]
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(next_available("my-post", &taken), "my-post1");
    }

    #[test]
    fn test_next_available_sequence_is_collision_free() {
        let mut taken: HashSet<String> = HashSet::new();
        for _ in 0..50 {
            let assigned = next_available("hello-world", &taken);
            assert!(taken.insert(assigned), "assigned slug must be new");
        }
        assert!(taken.contains("hello-world"));
        assert!(taken.contains("hello-world1"));
        assert!(taken.contains("hello-world49"));
    }

    #[test]
    fn test_escape_like_wildcards() {
        assert_eq!(escape_like("a_b%c\\d"), "a\\_b\\%c\\\\d");
    }
}

//! Plain-text helpers for teasers and reading time.

/// Excerpt stored on a post at creation time: the first 200 characters
/// followed by an ellipsis, or the whole content when it is short enough.
/// Kept as a stored column so later edits to the body do not rewrite it.
pub fn initial_excerpt(content: &str) -> String {
    if content.chars().count() > 200 {
        let head: String = content.chars().take(200).collect();
        format!("{head}...")
    } else {
        content.to_string()
    }
}

/// Word-safe excerpt used when rendering listings: truncates to at most
/// `length` characters, then backs up to the last space so no word is cut
/// in half.
pub fn excerpt(content: &str, length: usize) -> String {
    if content.chars().count() <= length {
        return content.to_string();
    }
    let head: String = content.chars().take(length).collect();
    let truncated = match head.rsplit_once(' ') {
        Some((before, _)) => before,
        None => head.as_str(),
    };
    format!("{truncated}...")
}

/// Estimated reading time in minutes, assuming 200 words per minute.
/// Never less than one minute, even for empty content.
pub fn reading_time(content: &str) -> u32 {
    let words = content.split_whitespace().count();
    std::cmp::max(1, (words / 200) as u32)
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn initial_excerpt_short_content_unchanged() {
        assert_eq!(initial_excerpt("short post"), "short post");
    }

    #[test]
    fn initial_excerpt_exactly_200_chars_unchanged() {
        let content = "a".repeat(200);
        assert_eq!(initial_excerpt(&content), content);
    }

    #[test]
    fn initial_excerpt_long_content_truncated_with_ellipsis() {
        let content = "b".repeat(250);
        let out = initial_excerpt(&content);
        assert_eq!(out.chars().count(), 203);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn initial_excerpt_counts_characters_not_bytes() {
        let content = "è".repeat(250);
        let out = initial_excerpt(&content);
        assert_eq!(out.chars().count(), 203);
    }

    #[test]
    fn excerpt_short_content_unchanged() {
        assert_eq!(excerpt("hello world", 200), "hello world");
    }

    #[test]
    fn excerpt_breaks_on_word_boundary() {
        let content = "word ".repeat(100);
        let out = excerpt(&content, 23);
        // 23 chars land mid-word; backing up to the last space keeps whole words.
        assert_eq!(out, "word word word word...");
    }

    #[test]
    fn excerpt_single_long_word_hard_truncates() {
        let content = "x".repeat(300);
        let out = excerpt(&content, 50);
        assert_eq!(out.chars().count(), 53);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn reading_time_minimum_one_minute() {
        assert_eq!(reading_time(""), 1);
        assert_eq!(reading_time("just a few words"), 1);
    }

    #[test]
    fn reading_time_scales_with_words() {
        let content = "word ".repeat(400);
        assert_eq!(reading_time(&content), 2);
        let content = "word ".repeat(1000);
        assert_eq!(reading_time(&content), 5);
    }

    #[test]
    fn reading_time_rounds_down_like_integer_division() {
        let content = "word ".repeat(399);
        assert_eq!(reading_time(&content), 1);
    }
}

//! Markdown rendering for post bodies.
//!
//! Post content is authored as markdown and stored verbatim; it is rendered
//! to HTML at display time and then sanitized. Sanitization is allowlist
//! based: only the tags and attributes a post legitimately needs survive,
//! everything else (scripts, event handlers, embeds) is stripped.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use pulldown_cmark::{Options, Parser, html};

/// Tags a rendered post may contain. Anything else is removed along with
/// its attributes; text content is kept.
const ALLOWED_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "strong", "em", "blockquote", "code", "pre", "ul",
    "ol", "li", "a", "img", "br", "hr", "table", "thead", "tbody", "tr", "th", "td",
];

static CLEANER: LazyLock<ammonia::Builder<'static>> = LazyLock::new(|| {
    let mut builder = ammonia::Builder::default();
    builder.tags(ALLOWED_TAGS.iter().copied().collect::<HashSet<_>>());

    let mut attrs: HashMap<&str, HashSet<&str>> = HashMap::new();
    attrs.insert("a", ["href", "title"].into_iter().collect());
    attrs.insert("img", ["src", "alt", "title"].into_iter().collect());
    builder.tag_attributes(attrs);

    builder
});

/// Render markdown to sanitized HTML.
///
/// Tables and strikethrough are enabled; raw HTML embedded in the markdown
/// passes through the parser but is subject to the same allowlist as
/// generated markup, so `<script>` and friends never reach the page.
pub fn render_markdown(content: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(content, options);
    let mut rendered = String::with_capacity(content.len() * 2);
    html::push_html(&mut rendered, parser);

    CLEANER.clean(&rendered).to_string()
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn renders_basic_markdown() {
        let out = render_markdown("# Title\n\nSome **bold** text.");
        assert!(out.contains("<h1>Title</h1>"));
        assert!(out.contains("<strong>bold</strong>"));
    }

    #[test]
    fn renders_links_with_href() {
        let out = render_markdown("[docs](https://example.com/docs)");
        assert!(out.contains("<a"));
        assert!(out.contains("href=\"https://example.com/docs\""));
    }

    #[test]
    fn renders_images_with_src_and_alt() {
        let out = render_markdown("![a cat](https://example.com/cat.png)");
        assert!(out.contains("<img"));
        assert!(out.contains("src=\"https://example.com/cat.png\""));
        assert!(out.contains("alt=\"a cat\""));
    }

    #[test]
    fn renders_tables() {
        let out = render_markdown("| a | b |\n|---|---|\n| 1 | 2 |");
        assert!(out.contains("<table>"));
        assert!(out.contains("<td>1</td>"));
    }

    #[test]
    fn strips_script_tags() {
        let out = render_markdown("hello <script>alert('xss')</script> world");
        assert!(!out.contains("<script>"));
        assert!(!out.contains("alert"));
    }

    #[test]
    fn strips_event_handler_attributes() {
        let out = render_markdown("<p onclick=\"steal()\">text</p>");
        assert!(out.contains("text"));
        assert!(!out.contains("onclick"));
    }

    #[test]
    fn strips_javascript_urls() {
        let out = render_markdown("[x](javascript:alert(1))");
        assert!(!out.contains("javascript:"));
    }

    #[test]
    fn strips_disallowed_tags_but_keeps_text() {
        let out = render_markdown("<div><span>kept</span></div>");
        assert!(!out.contains("<div>"));
        assert!(!out.contains("<span>"));
        assert!(out.contains("kept"));
    }

    #[test]
    fn keeps_code_blocks() {
        let out = render_markdown("```\nlet x = 1;\n```");
        assert!(out.contains("<pre>"));
        assert!(out.contains("<code>"));
    }

    #[test]
    fn empty_input_renders_empty() {
        assert_eq!(render_markdown(""), "");
    }
}

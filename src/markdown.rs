//! Markdown-to-HTML conversion for generated article text.
//!
//! The converter is a fixed sequence of whole-string regex passes. Order
//! matters: headings run h3 → h2 → h1, emphasis runs before lists so a
//! `* item` line is only consumed by the list pass, and paragraph wrapping
//! runs last so it can see the block tags produced earlier.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static H3: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^### (.*)$").unwrap());
static H2: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^## (.*)$").unwrap());
static H1: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^# (.*)$").unwrap());

static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());
static ITALIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*(.*?)\*").unwrap());

static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap());

static CODE_BLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"```([\s\S]*?)```").unwrap());
static INLINE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`]+)`").unwrap());

static STAR_ITEM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\* (.*)$").unwrap());
static DASH_ITEM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^- (.*)$").unwrap());
static ITEM_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(<ul>\s*)?(<li>[\s\S]*?</li>(?:\s*<li>[\s\S]*?</li>)*)").unwrap()
});

static PARAGRAPH_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n").unwrap());
static BLOCK_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<(?:h[1-6]|ul|ol|li|pre|code|p|blockquote|div|table)\b").unwrap()
});

static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(>?)\n(<?)").unwrap());

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>?").unwrap());

/// Converts Markdown-ish text into an HTML fragment.
///
/// Never fails: anything the passes do not recognise is passed through
/// as literal text.
pub fn to_html(markdown: &str) -> String {
    let html = H3.replace_all(markdown, "<h3>${1}</h3>");
    let html = H2.replace_all(&html, "<h2>${1}</h2>");
    let html = H1.replace_all(&html, "<h1>${1}</h1>");

    let html = BOLD.replace_all(&html, "<strong>${1}</strong>");
    let html = ITALIC.replace_all(&html, "<em>${1}</em>");

    let html = LINK.replace_all(
        &html,
        r#"<a href="${2}" target="_blank" rel="noopener noreferrer">${1}</a>"#,
    );

    let html = CODE_BLOCK.replace_all(&html, "<pre><code>${1}</code></pre>");
    let html = INLINE_CODE.replace_all(&html, "<code>${1}</code>");

    let html = STAR_ITEM.replace_all(&html, "<li>${1}</li>");
    let html = DASH_ITEM.replace_all(&html, "<li>${1}</li>");
    let html = ITEM_RUN.replace_all(&html, |caps: &Captures| {
        if caps.get(1).is_some() {
            caps[0].to_string()
        } else {
            format!("<ul>{}</ul>", &caps[2])
        }
    });

    let html = PARAGRAPH_BREAK
        .split(&html)
        .map(|candidate| {
            let candidate = candidate.trim();
            if candidate.is_empty() || BLOCK_START.is_match(candidate) {
                candidate.to_string()
            } else {
                format!("<p>{candidate}</p>")
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    // A newline between two tags separates blocks and stays.
    LINE_BREAK
        .replace_all(&html, |caps: &Captures| {
            if !caps[1].is_empty() && !caps[2].is_empty() {
                ">\n<".to_string()
            } else {
                format!("{}<br>{}", &caps[1], &caps[2])
            }
        })
        .into_owned()
}

/// Removes every HTML tag, keeping the text between them.
pub fn strip_tags(html: &str) -> String {
    TAG.replace_all(html, "").into_owned()
}

/// Plain-text preview of an HTML body: the first `len` characters and an
/// ellipsis.
pub fn excerpt(html: &str, len: usize) -> String {
    let text: String = strip_tags(html).chars().take(len).collect();
    format!("{text}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_becomes_a_paragraph() {
        assert_eq!(to_html("Hello world"), "<p>Hello world</p>");
    }

    #[test]
    fn converting_twice_does_not_double_wrap() {
        let once = to_html("Hello world");
        let twice = to_html(&once);
        assert_eq!(twice, once);
        assert!(!twice.contains("<p><p>"));

        let list = to_html("- a\n- b");
        assert_eq!(to_html(&list), list);
    }

    #[test]
    fn headings_convert_per_line_in_order() {
        assert_eq!(
            to_html("### Sub\n## Mid\n# Top"),
            "<h3>Sub</h3>\n<h2>Mid</h2>\n<h1>Top</h1>"
        );
    }

    #[test]
    fn list_items_share_one_wrapper() {
        assert_eq!(
            to_html("- a\n- b\n- c"),
            "<ul><li>a</li>\n<li>b</li>\n<li>c</li></ul>"
        );
        assert_eq!(
            to_html("* one\n* two"),
            "<ul><li>one</li>\n<li>two</li></ul>"
        );
    }

    #[test]
    fn stored_lists_with_line_breaks_stay_single_wrapped() {
        let stored = "<ul>\n<li>a</li>\n<li>b</li>\n</ul>";
        assert_eq!(to_html(stored), stored);
    }

    #[test]
    fn separate_lists_get_separate_wrappers() {
        assert_eq!(
            to_html("- a\n\nmiddle\n\n- b"),
            "<ul><li>a</li></ul>\n<p>middle</p>\n<ul><li>b</li></ul>"
        );
    }

    #[test]
    fn emphasis_and_links() {
        assert_eq!(
            to_html("**bold** and *soft*"),
            "<p><strong>bold</strong> and <em>soft</em></p>"
        );
        assert_eq!(
            to_html("see [Rust](https://www.rust-lang.org)"),
            "<p>see <a href=\"https://www.rust-lang.org\" target=\"_blank\" \
             rel=\"noopener noreferrer\">Rust</a></p>"
        );
    }

    #[test]
    fn code_spans_and_fences() {
        assert_eq!(to_html("run `cargo fmt`"), "<p>run <code>cargo fmt</code></p>");

        let html = to_html("```\nlet x = 1;\n```");
        assert!(html.starts_with("<pre><code>"));
        assert!(html.ends_with("</code></pre>"));
        assert!(html.contains("let x = 1;"));
    }

    #[test]
    fn paragraphs_and_line_breaks() {
        assert_eq!(to_html("First\n\nSecond"), "<p>First</p>\n<p>Second</p>");
        assert_eq!(to_html("First\n  \n\nSecond"), "<p>First</p>\n<p>Second</p>");
        assert_eq!(to_html("Line one\nLine two"), "<p>Line one<br>Line two</p>");
        assert_eq!(
            to_html("# Title\nbody text"),
            "<h1>Title</h1><br>body text"
        );
    }

    #[test]
    fn malformed_markup_passes_through() {
        assert_eq!(to_html("[broken](link"), "<p>[broken](link</p>");
        assert_eq!(to_html("#nospace"), "<p>#nospace</p>");
        assert_eq!(to_html(""), "");
    }

    #[test]
    fn deterministic() {
        let input = "## Intro\n\nSome **text** with `code`.\n\n- x\n- y";
        assert_eq!(to_html(input), to_html(input));
    }

    #[test]
    fn strip_and_excerpt() {
        assert_eq!(strip_tags("<p>Hello <b>there</b></p>"), "Hello there");
        assert_eq!(excerpt("<p>abcdef</p>", 3), "abc...");
    }
}

//! HTML markup generation for buffer windows.

use ropey::{Rope, RopeSlice};

use super::{StyleRange, StyleStore};

/// Render `content[from..to)` as escaped HTML, wrapping styled ranges in spans.
///
/// Ranges are walked in start order. A range that begins before the current
/// cursor but ends after it is emitted from the cursor onward, so a window
/// that starts inside a range shows only its unsent tail. Plain ranges and
/// anything at or past `to` produce no span.
pub fn render_html(content: &Rope, styles: &StyleStore, from: usize, to: usize) -> String {
    let to = to.min(content.len_chars());
    let mut out = String::new();
    if from >= to {
        return out;
    }

    let mut cursor = from;
    for range in styles.iter() {
        if range.start >= to {
            break;
        }
        let end = range.end().min(to);
        if end <= cursor {
            continue;
        }
        if range.start > cursor {
            push_escaped(&mut out, content.slice(cursor..range.start));
            cursor = range.start;
        }
        push_span(&mut out, range, content.slice(cursor..end));
        cursor = end;
    }
    if cursor < to {
        push_escaped(&mut out, content.slice(cursor..to));
    }
    out
}

/// Escape `text` for use inside an HTML element.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    push_escaped_chars(&mut out, text.chars());
    out
}

fn push_span(out: &mut String, range: &StyleRange, text: RopeSlice<'_>) {
    if range.is_plain() {
        push_escaped(out, text);
        return;
    }
    out.push_str("<span style=\"");
    out.push_str(&range.css());
    out.push_str("\">");
    push_escaped(out, text);
    out.push_str("</span>");
}

fn push_escaped(out: &mut String, text: RopeSlice<'_>) {
    push_escaped_chars(out, text.chars());
}

fn push_escaped_chars(out: &mut String, chars: impl Iterator<Item = char>) {
    for ch in chars {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '\r' => {}
            _ => out.push(ch),
        }
    }
}

/// Page colors for the bootstrap document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageTheme {
    Dark,
    Light,
}

impl PageTheme {
    const fn colors(self) -> (&'static str, &'static str) {
        match self {
            Self::Dark => ("#1e1e1e", "#d4d4d4"),
            Self::Light => ("#ffffff", "#1e1e1e"),
        }
    }
}

/// Id of the element holding the console text in the bootstrap page.
pub const CONTENT_ELEMENT_ID: &str = "tailmark-content";

/// Initial page handed to a render surface once at construction.
///
/// Defines the content container and the `tailmark` script helpers that
/// [`crate::sync::Script::to_javascript`] calls. `body` is pre-rendered markup
/// placed inside the container.
pub fn bootstrap_page(theme: PageTheme, body: &str) -> String {
    let (background, foreground) = theme.colors();
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<style>
html, body {{ margin: 0; padding: 0; background: {background}; color: {foreground}; }}
#{CONTENT_ELEMENT_ID} {{ margin: 0; padding: 4px; font-family: monospace; white-space: pre-wrap; word-wrap: break-word; }}
</style>
<script>
var tailmark = {{
  el: function () {{ return document.getElementById("{CONTENT_ELEMENT_ID}"); }},
  replace: function (html) {{ this.el().innerHTML = html; }},
  append: function (html) {{ this.el().insertAdjacentHTML("beforeend", html); }},
  scrollToBottom: function () {{ window.scrollTo(0, document.body.scrollHeight); }}
}};
</script>
</head>
<body><pre id="{CONTENT_ELEMENT_ID}">{body}</pre></body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Rgb;

    fn store_with(ranges: &[StyleRange], len: usize) -> StyleStore {
        let mut store = StyleStore::new();
        for range in ranges {
            store.insert(range.clone(), len);
        }
        store
    }

    #[test]
    fn test_unstyled_text_is_escaped() {
        let rope = Rope::from_str("a<b & c>\"d\"");
        let html = render_html(&rope, &StyleStore::new(), 0, rope.len_chars());
        assert_eq!(html, "a&lt;b &amp; c&gt;&quot;d&quot;");
    }

    #[test]
    fn test_bold_range_wraps_only_its_chars() {
        let rope = Rope::from_str("abc");
        let store = store_with(&[StyleRange::new(1, 1).bold()], 3);
        let html = render_html(&rope, &store, 0, 3);
        assert_eq!(html, "a<span style=\"font-weight:bold\">b</span>c");
    }

    #[test]
    fn test_range_clipped_to_window_end() {
        let rope = Rope::from_str("abcdef");
        let store = store_with(&[StyleRange::new(2, 10).fg(Rgb::new(255, 0, 0))], 6);
        let html = render_html(&rope, &store, 0, 4);
        assert_eq!(html, "ab<span style=\"color:#ff0000\">cd</span>");
    }

    #[test]
    fn test_range_straddling_window_start_is_emitted_from_window_start() {
        // The decoration really starts at 1; the partial window only shows
        // its tail, starting at the window origin.
        let rope = Rope::from_str("abcdef");
        let store = store_with(&[StyleRange::new(1, 4).bold()], 6);
        let html = render_html(&rope, &store, 3, 6);
        assert_eq!(html, "<span style=\"font-weight:bold\">de</span>f");
    }

    #[test]
    fn test_range_fully_before_window_is_skipped() {
        let rope = Rope::from_str("abcdef");
        let store = store_with(&[StyleRange::new(0, 2).bold()], 6);
        assert_eq!(render_html(&rope, &store, 2, 6), "cdef");
    }

    #[test]
    fn test_overlapping_range_continues_from_cursor() {
        let rope = Rope::from_str("abcdef");
        let store = store_with(
            &[StyleRange::new(0, 4).bold(), StyleRange::new(2, 3).underline()],
            6,
        );
        let html = render_html(&rope, &store, 0, 6);
        assert_eq!(
            html,
            "<span style=\"font-weight:bold\">abcd</span>\
             <span style=\"text-decoration:underline\">e</span>f"
        );
    }

    #[test]
    fn test_plain_range_emits_no_span() {
        let rope = Rope::from_str("abc");
        let store = store_with(&[StyleRange::new(0, 2)], 3);
        assert_eq!(render_html(&rope, &store, 0, 3), "abc");
    }

    #[test]
    fn test_empty_window() {
        let rope = Rope::from_str("abc");
        assert_eq!(render_html(&rope, &StyleStore::new(), 3, 3), "");
        assert_eq!(render_html(&rope, &StyleStore::new(), 2, 1), "");
    }

    #[test]
    fn test_carriage_returns_are_dropped() {
        let rope = Rope::from_str("a\r\nb");
        assert_eq!(render_html(&rope, &StyleStore::new(), 0, 4), "a\nb");
    }

    #[test]
    fn test_bootstrap_page_contains_container_and_body() {
        let page = bootstrap_page(PageTheme::Dark, "hi &amp; bye");
        assert!(page.contains("<pre id=\"tailmark-content\">hi &amp; bye</pre>"));
        assert!(page.contains("insertAdjacentHTML"));
        assert!(page.contains("#1e1e1e"));
    }
}

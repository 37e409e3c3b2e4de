//! Render surfaces: passive targets that display generated markup.
//!
//! A surface holds no engine state. The console bootstraps it once and then
//! only ever sends [`Script`]s. Adapters here bind the engine to an HTML file
//! on disk and to a line-delimited JSON stream for an external webview host.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::{Script, ScriptOp};
use crate::style::markup::CONTENT_ELEMENT_ID;

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("render surface rejected the script")]
    Rejected,
    #[error("render surface unavailable: {0}")]
    Unavailable(String),
    #[error("render surface I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// The capability the console needs from a display.
///
/// `execute_script` may call back into the console before it returns. A
/// failed call must leave the displayed content as it was, so the console can
/// resend the same script later.
pub trait RenderSurface {
    /// One-time initial content, called at console construction.
    ///
    /// # Errors
    /// Returns an error if the surface cannot take the page.
    fn bootstrap(&mut self, html: &str) -> Result<(), SurfaceError>;

    /// Apply `script` to the live surface.
    ///
    /// # Errors
    /// Returns an error if the script was not applied.
    fn execute_script(&mut self, script: &Script) -> Result<(), SurfaceError>;
}

impl<S: RenderSurface + ?Sized> RenderSurface for Box<S> {
    fn bootstrap(&mut self, html: &str) -> Result<(), SurfaceError> {
        (**self).bootstrap(html)
    }

    fn execute_script(&mut self, script: &Script) -> Result<(), SurfaceError> {
        (**self).execute_script(script)
    }
}

/// Mirrors the console into a standalone HTML page on disk.
///
/// Every script rewrites the page atomically (temp file + rename). The page
/// stays bottom-anchored, so scroll instructions need no file change.
#[derive(Debug)]
pub struct HtmlFileSurface {
    path: PathBuf,
    page: Option<PageParts>,
    body: String,
    writes: u64,
}

#[derive(Debug, Clone)]
struct PageParts {
    head: String,
    tail: String,
}

impl HtmlFileSurface {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            page: None,
            body: String::new(),
            writes: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Markup currently inside the content container.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Number of successful page writes.
    pub const fn writes(&self) -> u64 {
        self.writes
    }

    fn write_page(&self, page: &PageParts, body: &str) -> std::io::Result<()> {
        let tmp = self.path.with_extension("html.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(page.head.as_bytes())?;
            file.write_all(body.as_bytes())?;
            file.write_all(page.tail.as_bytes())?;
            file.flush()?;
        }
        fs::rename(&tmp, &self.path)
    }
}

impl RenderSurface for HtmlFileSurface {
    fn bootstrap(&mut self, html: &str) -> Result<(), SurfaceError> {
        let open_tag = format!("id=\"{CONTENT_ELEMENT_ID}\">");
        let open = html
            .find(&open_tag)
            .map(|i| i + open_tag.len())
            .ok_or_else(|| SurfaceError::Unavailable("page has no content container".into()))?;
        let close = html[open..]
            .find("</pre>")
            .map(|i| open + i)
            .ok_or_else(|| SurfaceError::Unavailable("content container is not closed".into()))?;

        let page = PageParts {
            head: html[..open].to_string(),
            tail: html[close..].to_string(),
        };
        let body = html[open..close].to_string();
        self.write_page(&page, &body)?;
        self.page = Some(page);
        self.body = body;
        self.writes += 1;
        Ok(())
    }

    fn execute_script(&mut self, script: &Script) -> Result<(), SurfaceError> {
        let Some(page) = self.page.as_ref() else {
            return Err(SurfaceError::Unavailable("surface was never bootstrapped".into()));
        };

        let mut body = None::<String>;
        for op in script.ops() {
            match op {
                ScriptOp::Replace(html) => body = Some(html.clone()),
                ScriptOp::Append(html) => body
                    .get_or_insert_with(|| self.body.clone())
                    .push_str(html),
                ScriptOp::ScrollToBottom => {}
            }
        }
        let Some(body) = body else {
            return Ok(());
        };
        self.write_page(page, &body)?;
        self.body = body;
        self.writes += 1;
        Ok(())
    }
}

/// Writes one JSON message per line to `W` for an external webview host.
///
/// The first line is `{"bootstrap": "<page>"}`; every script follows as
/// `{"script": "<javascript>"}`.
#[derive(Debug)]
pub struct ScriptStreamSurface<W: Write> {
    out: W,
}

impl<W: Write> ScriptStreamSurface<W> {
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn send(&mut self, message: &serde_json::Value) -> std::io::Result<()> {
        // One write per message so a failed flush never leaves half a line
        // that a retry would then duplicate.
        let mut line = message.to_string();
        line.push('\n');
        self.out.write_all(line.as_bytes())?;
        self.out.flush()
    }
}

impl<W: Write> RenderSurface for ScriptStreamSurface<W> {
    fn bootstrap(&mut self, html: &str) -> Result<(), SurfaceError> {
        self.send(&serde_json::json!({ "bootstrap": html }))?;
        Ok(())
    }

    fn execute_script(&mut self, script: &Script) -> Result<(), SurfaceError> {
        if script.is_empty() {
            return Ok(());
        }
        self.send(&serde_json::json!({ "script": script.to_javascript() }))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::markup::{PageTheme, bootstrap_page};
    use tempfile::tempdir;

    fn append(html: &str) -> Script {
        let mut script = Script::new();
        script.push(ScriptOp::Append(html.to_string()));
        script
    }

    // --- HtmlFileSurface ---

    #[test]
    fn test_html_file_bootstrap_writes_page() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("console.html");
        let mut surface = HtmlFileSurface::new(&path);
        surface
            .bootstrap(&bootstrap_page(PageTheme::Dark, "start"))
            .unwrap();

        let page = fs::read_to_string(&path).unwrap();
        assert!(page.contains(">start</pre>"));
        assert_eq!(surface.body(), "start");
    }

    #[test]
    fn test_html_file_append_and_replace() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("console.html");
        let mut surface = HtmlFileSurface::new(&path);
        surface.bootstrap(&bootstrap_page(PageTheme::Light, "")).unwrap();

        surface.execute_script(&append("one\n")).unwrap();
        surface.execute_script(&append("two\n")).unwrap();
        assert_eq!(surface.body(), "one\ntwo\n");

        let mut replace = Script::new();
        replace.push(ScriptOp::Replace("fresh".to_string()));
        surface.execute_script(&replace).unwrap();

        let page = fs::read_to_string(&path).unwrap();
        assert!(page.contains(">fresh</pre>"));
        assert!(!page.contains("one"));
        assert_eq!(surface.writes(), 4);
    }

    #[test]
    fn test_html_file_scroll_only_does_not_rewrite() {
        let dir = tempdir().unwrap();
        let mut surface = HtmlFileSurface::new(dir.path().join("c.html"));
        surface.bootstrap(&bootstrap_page(PageTheme::Dark, "")).unwrap();
        surface.execute_script(&Script::scroll_to_bottom()).unwrap();
        assert_eq!(surface.writes(), 1);
    }

    #[test]
    fn test_html_file_requires_bootstrap() {
        let dir = tempdir().unwrap();
        let mut surface = HtmlFileSurface::new(dir.path().join("c.html"));
        let err = surface.execute_script(&append("x")).unwrap_err();
        assert!(matches!(err, SurfaceError::Unavailable(_)));
    }

    #[test]
    fn test_html_file_failed_write_keeps_body() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sub").join("c.html");
        let mut surface = HtmlFileSurface::new(&path);
        assert!(surface.bootstrap(&bootstrap_page(PageTheme::Dark, "")).is_err());

        fs::create_dir_all(path.parent().unwrap()).unwrap();
        surface.bootstrap(&bootstrap_page(PageTheme::Dark, "")).unwrap();
        fs::remove_dir_all(path.parent().unwrap()).unwrap();

        assert!(matches!(
            surface.execute_script(&append("lost?")),
            Err(SurfaceError::Io(_))
        ));
        assert_eq!(surface.body(), "");
    }

    #[test]
    fn test_bootstrap_rejects_page_without_container() {
        let dir = tempdir().unwrap();
        let mut surface = HtmlFileSurface::new(dir.path().join("c.html"));
        let err = surface.bootstrap("<html></html>").unwrap_err();
        assert!(matches!(err, SurfaceError::Unavailable(_)));
    }

    // --- ScriptStreamSurface ---

    #[test]
    fn test_stream_writes_json_lines() {
        let mut surface = ScriptStreamSurface::new(Vec::new());
        surface.bootstrap("<p>page</p>").unwrap();
        surface.execute_script(&append("a")).unwrap();
        surface.execute_script(&Script::new()).unwrap();

        let out = String::from_utf8(surface.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["bootstrap"], "<p>page</p>");
        assert_eq!(lines[1]["script"], "tailmark.append(\"a\");");
    }
}

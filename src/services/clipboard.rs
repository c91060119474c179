//! Renders the workspace into paste-ready HTML and puts it on a clipboard.
//!
//! Blog editors drop `<style>` and `<link>` on paste, so every rule is inlined.

use crate::models::BlockKind;
use crate::services::workspace::Workspace;
use crate::utils::strip_tags;
use html_escape::{encode_double_quoted_attribute, encode_text};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};

const WRAPPER_STYLE: &str = "font-family: 'Apple SD Gothic Neo', 'Malgun Gothic', sans-serif; line-height: 1.8; color: #333; max-width: 700px; margin: 0 auto;";
const TITLE_STYLE: &str = "font-size: 28px; color: #1A1D2E; text-align: center; margin-bottom: 40px; border-bottom: 3px solid #FF6B35; padding-bottom: 15px; font-weight: bold;";
const BODY_STYLE: &str = "text-align: center;";
const IMAGE_WRAPPER_STYLE: &str = "text-align: center; margin: 30px 0;";
const IMAGE_STYLE: &str = "max-width: 100%; border-radius: 12px; box-shadow: 0 4px 12px rgba(0,0,0,0.1);";
const HASHTAG_STYLE: &str = "margin-top: 60px; padding: 25px; background-color: #f8f9fa; border-radius: 12px; color: #666; font-size: 14px;";

/// Destination for exported content.
pub trait ClipboardSink: Send + Sync {
    /// Whether both `text/html` and `text/plain` can be written in one go.
    fn supports_rich(&self) -> bool;
    fn write_rich(&self, html: &str, plain: &str) -> anyhow::Result<()>;
    fn write_text(&self, text: &str) -> anyhow::Result<()>;
}

/// The raw calls `SystemClipboard` needs from a platform clipboard.
pub trait ClipboardBackend: Send {
    fn set_html(&mut self, html: &str, plain: &str) -> anyhow::Result<()>;
    fn set_text(&mut self, text: &str) -> anyhow::Result<()>;
}

impl ClipboardBackend for arboard::Clipboard {
    fn set_html(&mut self, html: &str, plain: &str) -> anyhow::Result<()> {
        arboard::Clipboard::set_html(self, html, Some(plain))?;
        Ok(())
    }

    fn set_text(&mut self, text: &str) -> anyhow::Result<()> {
        arboard::Clipboard::set_text(self, text)?;
        Ok(())
    }
}

/// The desktop clipboard of the machine running the service.
///
/// One handle lives as long as the service. On X11 and Wayland the copied
/// contents go away with the last handle, and writes are serialized through
/// the mutex.
pub struct SystemClipboard<B = arboard::Clipboard> {
    backend: Mutex<B>,
}

impl SystemClipboard {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self::with_backend(arboard::Clipboard::new()?))
    }
}

impl<B: ClipboardBackend> SystemClipboard<B> {
    pub fn with_backend(backend: B) -> Self {
        Self {
            backend: Mutex::new(backend),
        }
    }

    fn backend(&self) -> anyhow::Result<MutexGuard<'_, B>> {
        self.backend
            .lock()
            .map_err(|_| anyhow::anyhow!("clipboard lock poisoned"))
    }
}

impl<B: ClipboardBackend> ClipboardSink for SystemClipboard<B> {
    fn supports_rich(&self) -> bool {
        true
    }

    fn write_rich(&self, html: &str, plain: &str) -> anyhow::Result<()> {
        self.backend()?.set_html(html, plain)
    }

    fn write_text(&self, text: &str) -> anyhow::Result<()> {
        self.backend()?.set_text(text)
    }
}

/// Used when no clipboard is reachable; the caller still gets the rendered
/// document back and copies it on its side.
pub struct NoClipboard;

impl ClipboardSink for NoClipboard {
    fn supports_rich(&self) -> bool {
        false
    }

    fn write_rich(&self, _html: &str, _plain: &str) -> anyhow::Result<()> {
        anyhow::bail!("clipboard is disabled")
    }

    fn write_text(&self, _text: &str) -> anyhow::Result<()> {
        anyhow::bail!("clipboard is disabled")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportResult {
    pub html: String,
    pub text: String,
    pub copied: bool,
}

/// Builds the self-contained post fragment. Same state, same bytes.
pub fn render_post(workspace: &Workspace) -> String {
    let mut html = String::new();
    html.push_str(&format!("<div style=\"{WRAPPER_STYLE}\">"));
    html.push_str(&format!(
        "<h1 style=\"{TITLE_STYLE}\">{}</h1>",
        encode_text(workspace.title())
    ));

    html.push_str(&format!("<div style=\"{BODY_STYLE}\">"));
    for block in workspace.blocks() {
        match block.kind {
            BlockKind::Text => html.push_str(&block.content),
            BlockKind::Image => html.push_str(&format!(
                "<div style=\"{IMAGE_WRAPPER_STYLE}\">\
                 <img src=\"{}\" style=\"{IMAGE_STYLE}\" /></div>",
                encode_double_quoted_attribute(&block.content)
            )),
        }
        html.push('\n');
    }
    html.push_str("</div>");

    html.push_str(&format!(
        "<div style=\"{HASHTAG_STYLE}\">{}</div>",
        encode_text(workspace.hashtags())
    ));
    html.push_str("</div>");
    html
}

pub fn wrap_document(fragment: &str) -> String {
    format!("<html><head><meta charset=\"utf-8\"></head><body>{fragment}</body></html>")
}

/// Renders the workspace and writes it to `sink`. Failures are logged and
/// reported through `copied`, never returned.
pub fn export(workspace: &Workspace, sink: &dyn ClipboardSink) -> ExportResult {
    let fragment = render_post(workspace);
    let html = wrap_document(&fragment);
    let text = strip_tags(&fragment);

    let written = if sink.supports_rich() {
        sink.write_rich(&html, &text)
    } else {
        sink.write_text(&fragment)
    };

    let copied = match written {
        Ok(()) => {
            tracing::info!(bytes = html.len(), "post copied to clipboard");
            true
        }
        Err(e) => {
            tracing::error!("clipboard write failed: {e:#}");
            false
        }
    };

    ExportResult { html, text, copied }
}

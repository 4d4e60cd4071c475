//! Frame markup
//!
//! Builds what the isolated frame displays:
//! - the document itself, or a placeholder page while none exists
//! - in edit mode, the annotator overlay (hover outline, id label) and the
//!   click-capture script that posts the selection envelope
//! - the embedding `iframe` with a script-only sandbox and no same-origin
//!   access to the host

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use vibe_document::markup::encode_attribute;
use vibe_document::Document;

/// Sandbox flags of the embedding frame
pub const SANDBOX_FLAGS: &str = "allow-scripts";

/// Text shown while no document exists yet
pub const EMPTY_PREVIEW_TEXT: &str = "Generating preview...";

/// Outline drawn around the hovered box
pub const HOVER_OUTLINE: &str = "2px solid #3b82f6";

/// Edit-mode overlay: outline on hover, id label in the corner
pub const EDIT_OVERLAY_STYLE: &str = r#"<style data-vibe-overlay>
[data-vibe-box] { cursor: pointer; position: relative; }
[data-vibe-box]:hover { outline: 2px solid #3b82f6 !important; outline-offset: -2px; z-index: 10; }
[data-vibe-box]:hover::after {
  content: "Box " attr(data-vibe-box);
  position: absolute; top: 0; left: 0;
  background: #3b82f6; color: #fff;
  font: 600 10px/1.4 ui-sans-serif, system-ui, sans-serif;
  padding: 2px 6px; border-bottom-right-radius: 4px;
  pointer-events: none; z-index: 50;
}
</style>"#;

/// Edit-mode click capture: one `BOX_SELECTED` message per click on a box
pub const SELECTION_SCRIPT: &str = r#"<script data-vibe-overlay>
document.addEventListener('click', function (e) {
  var box = e.target.closest('[data-vibe-box]');
  if (!box) return;
  e.preventDefault();
  e.stopPropagation();
  var id = parseInt(box.getAttribute('data-vibe-box'), 10);
  if (id > 0) window.parent.postMessage({ type: 'BOX_SELECTED', id: id }, '*');
}, true);
</script>"#;

/// Preview viewport
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Viewport {
    /// Full width of the host
    #[default]
    Desktop,
    /// Phone-sized frame (375×812)
    Mobile,
}

impl Viewport {
    /// Fixed frame size, `None` when the frame fills its container
    #[inline]
    #[must_use]
    pub const fn dimensions(self) -> Option<(u32, u32)> {
        match self {
            Self::Desktop => None,
            Self::Mobile => Some((375, 812)),
        }
    }

    fn frame_style(self) -> String {
        match self.dimensions() {
            None => "width:100%;height:100%;border:0".to_string(),
            Some((w, h)) => format!("width:{w}px;height:{h}px;border:0"),
        }
    }
}

impl Display for Viewport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Desktop => f.write_str("desktop"),
            Self::Mobile => f.write_str("mobile"),
        }
    }
}

impl FromStr for Viewport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "desktop" => Ok(Self::Desktop),
            "mobile" => Ok(Self::Mobile),
            other => Err(format!("unknown viewport: {other}")),
        }
    }
}

/// How a frame is rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameOptions {
    /// Annotator overlay active
    pub edit_mode: bool,
    /// Frame size
    pub viewport: Viewport,
}

impl FrameOptions {
    /// Create options for the given mode
    #[inline]
    #[must_use]
    pub fn new(edit_mode: bool) -> Self {
        Self {
            edit_mode,
            viewport: Viewport::Desktop,
        }
    }

    /// Set viewport
    #[inline]
    #[must_use]
    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }
}

/// Markup loaded into the frame
///
/// A blank document yields the placeholder page. In edit mode the overlay
/// is inserted before the last `</body>`, or appended when there is none.
#[must_use]
pub fn frame_markup(document: &Document, edit_mode: bool) -> String {
    if document.is_empty() {
        return format!(
            "<!DOCTYPE html><html><body style=\"display:flex;align-items:center;\
             justify-content:center;height:100vh;color:#9ca3af;font-family:sans-serif\">\
             <p>{EMPTY_PREVIEW_TEXT}</p></body></html>"
        );
    }

    let markup = document.markup();
    if !edit_mode {
        return markup.to_string();
    }

    let overlay = format!("{EDIT_OVERLAY_STYLE}\n{SELECTION_SCRIPT}\n");
    match markup.to_ascii_lowercase().rfind("</body>") {
        Some(at) => {
            let mut out = String::with_capacity(markup.len() + overlay.len());
            out.push_str(&markup[..at]);
            out.push_str(&overlay);
            out.push_str(&markup[at..]);
            out
        }
        None => format!("{markup}\n{overlay}"),
    }
}

/// Host-side `iframe` element embedding the frame markup via `srcdoc`
#[must_use]
pub fn embed_frame(document: &Document, options: FrameOptions) -> String {
    let srcdoc = encode_attribute(&frame_markup(document, options.edit_mode));
    format!(
        "<iframe title=\"Website Preview\" sandbox=\"{SANDBOX_FLAGS}\" style=\"{}\" srcdoc=\"{srcdoc}\"></iframe>",
        options.viewport.frame_style()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn preview_mode_leaves_markup_alone() {
        let doc = Document::new("<html><body><p data-vibe-box=\"1\">x</p></body></html>");
        assert_eq!(frame_markup(&doc, false), doc.markup());
    }

    #[test]
    fn edit_mode_injects_overlay_before_body_close() {
        let doc = Document::new("<html><BODY><p data-vibe-box=\"1\">x</p></BODY></html>");
        let out = frame_markup(&doc, true);
        let script_at = out.find(SELECTION_SCRIPT).unwrap();
        let close_at = out.find("</BODY>").unwrap();
        assert!(out.contains(EDIT_OVERLAY_STYLE));
        assert!(script_at < close_at);
        assert!(out.ends_with("</BODY></html>"));
    }

    #[test]
    fn edit_mode_appends_overlay_to_fragments() {
        let doc = Document::new("<section data-vibe-box=\"1\">x</section>");
        let out = frame_markup(&doc, true);
        assert!(out.starts_with("<section"));
        assert!(out.trim_end().ends_with("</script>"));
    }

    #[test]
    fn empty_document_shows_placeholder() {
        let out = frame_markup(&Document::new(""), true);
        assert!(out.contains(EMPTY_PREVIEW_TEXT));
        assert!(!out.contains("postMessage"));
    }

    #[test]
    fn embed_uses_script_only_sandbox() {
        let doc = Document::new("<p title=\"a&b\">\"hi\"</p>");
        let frame = embed_frame(&doc, FrameOptions::new(false).with_viewport(Viewport::Mobile));
        assert!(frame.contains("sandbox=\"allow-scripts\""));
        assert!(!frame.contains("allow-same-origin"));
        assert!(frame.contains("width:375px;height:812px"));
        assert!(frame.contains("srcdoc=\"&lt;p title=&quot;a&amp;b&quot;&gt;&quot;hi&quot;&lt;/p&gt;\""));
    }

    #[test]
    fn viewport_parses_and_displays() {
        assert_eq!("Mobile".parse::<Viewport>(), Ok(Viewport::Mobile));
        assert_eq!(Viewport::Desktop.to_string(), "desktop");
        assert!("tablet".parse::<Viewport>().is_err());
    }
}

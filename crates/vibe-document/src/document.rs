//! The page document
//!
//! A [`Document`] is an immutable markup blob plus its content hash. Every
//! edit produces a new document; nothing mutates one in place, so a
//! document can be shared freely between the pipeline, the preview and the
//! persistence layer.

use crate::boxes::{annotate_boxes, check_numbering, closest_box, scan_boxes, AddressableBox, BoxId, NumberingError};
use crate::hash::ContentHash;
use crate::markup::{strip_code_fences, ElementTree};
use crate::placeholder::{apply_resolutions, scan_placeholders, AssetPlaceholder, ResolvedAsset};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Immutable page markup
///
/// # Invariants
/// - `hash` is always `ContentHash::of_markup(markup)`
/// - Cheap to clone (shared markup)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Document {
    markup: Arc<str>,
    hash: ContentHash,
}

impl Document {
    /// Wrap existing markup as-is
    #[must_use]
    pub fn new(markup: impl Into<String>) -> Self {
        let markup: String = markup.into();
        let hash = ContentHash::of_markup(&markup);
        Self {
            markup: Arc::from(markup),
            hash,
        }
    }

    /// Build a document from raw generator output
    ///
    /// Strips any markdown fence and renumbers boxes so ids run `1..=n`
    /// in document order.
    #[must_use]
    pub fn from_generated(raw: &str) -> Self {
        let stripped = strip_code_fences(raw);
        let (annotated, _) = annotate_boxes(&stripped);
        Self::new(annotated)
    }

    /// The markup
    #[inline]
    #[must_use]
    pub fn markup(&self) -> &str {
        &self.markup
    }

    /// Content hash of the markup
    #[inline]
    #[must_use]
    pub fn hash(&self) -> &ContentHash {
        &self.hash
    }

    /// Markup length in bytes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.markup.len()
    }

    /// Whether the markup is blank
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markup.trim().is_empty()
    }

    /// Parse the element tree
    #[must_use]
    pub fn elements(&self) -> ElementTree {
        ElementTree::parse(&self.markup)
    }

    /// Boxes in document order
    #[must_use]
    pub fn boxes(&self) -> Vec<AddressableBox> {
        scan_boxes(&self.elements())
    }

    /// Whether a box with this id exists
    #[must_use]
    pub fn contains_box(&self, id: BoxId) -> bool {
        self.boxes().iter().any(|b| b.id == id)
    }

    /// Check the gapless `1..=n` numbering invariant
    ///
    /// # Errors
    /// Returns the first numbering violation.
    pub fn check_box_numbering(&self) -> Result<(), NumberingError> {
        check_numbering(&self.boxes())
    }

    /// Box enclosing the element at `element_index`
    #[must_use]
    pub fn closest_box(&self, element_index: usize) -> Option<BoxId> {
        closest_box(&self.elements(), element_index)
    }

    /// Image placeholders awaiting synthesis
    #[must_use]
    pub fn placeholders(&self) -> Vec<AssetPlaceholder> {
        scan_placeholders(&self.elements())
    }

    /// New document with resolved assets applied
    #[must_use]
    pub fn with_resolved_assets(&self, resolved: &[ResolvedAsset]) -> Self {
        if resolved.is_empty() {
            return self.clone();
        }
        Self::new(apply_resolutions(&self.markup, resolved))
    }
}

impl From<String> for Document {
    fn from(markup: String) -> Self {
        Self::new(markup)
    }
}

impl From<Document> for String {
    fn from(document: Document) -> Self {
        document.markup.to_string()
    }
}

impl AsRef<str> for Document {
    fn as_ref(&self) -> &str {
        &self.markup
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_generated_strips_fence_and_numbers_boxes() {
        let raw = "```html\n<section><h1>Hi</h1><img data-image-prompt=\"sun\"></section>\n```";
        let doc = Document::from_generated(raw);

        assert!(!doc.markup().contains("```"));
        assert!(doc.check_box_numbering().is_ok());
        assert_eq!(doc.boxes().len(), 3);
        assert_eq!(doc.placeholders().len(), 1);
    }

    #[test]
    fn inline_backticks_keep_whole_page() {
        let raw = "<!DOCTYPE html><html><head><title>Docs</title></head><body><section>\
                   <h1>Markdown tips</h1><p>Wrap code in ``` fences.</p></section></body></html>";
        let doc = Document::from_generated(raw);

        assert!(doc.markup().starts_with("<!DOCTYPE html><html><head><title>Docs</title>"));
        assert!(doc.markup().contains("<p data-vibe-box="));
        assert!(doc.markup().contains("Wrap code in ``` fences."));
        assert!(doc.check_box_numbering().is_ok());
        assert_eq!(doc.boxes().len(), 3);
    }

    #[test]
    fn resolving_assets_produces_new_document() {
        let doc = Document::new(r#"<img data-image-prompt="sun">"#);
        let resolved = doc.with_resolved_assets(&[ResolvedAsset::new(0, "https://img/sun.png")]);

        assert_ne!(doc.hash(), resolved.hash());
        assert!(resolved.placeholders().is_empty());
        assert!(doc.markup().contains("data-image-prompt"));
    }

    #[test]
    fn empty_document_has_no_boxes() {
        let doc = Document::new("   ");
        assert!(doc.is_empty());
        assert!(doc.boxes().is_empty());
        assert!(doc.check_box_numbering().is_ok());
        assert_eq!(doc.closest_box(0), None);
    }

    #[test]
    fn string_conversion_keeps_hash() {
        let doc = Document::new("<p>x</p>");
        let back = Document::from(String::from(doc.clone()));
        assert_eq!(back, doc);
    }
}

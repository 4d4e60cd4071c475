//! Asset placeholders
//!
//! The coding stage emits `<img data-image-prompt="...">` instead of final
//! image sources. Placeholders live only until the asset stage resolves
//! them: resolving sets `src` to the concrete resource and drops the prompt
//! marker.

use crate::markup::{rewrite_tags, ElementTree};

/// Attribute carrying the synthesis prompt
pub const PROMPT_ATTR: &str = "data-image-prompt";

/// An image slot awaiting synthesis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPlaceholder {
    /// Synthesis prompt (never empty)
    pub prompt: String,
    /// Element index of the `img` in document order
    pub position: usize,
}

/// A concrete resource for a placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAsset {
    /// Element index the resource belongs to
    pub position: usize,
    /// Value for the `src` attribute (data URI or URL)
    pub src: String,
}

impl ResolvedAsset {
    /// Create a resolved asset
    #[inline]
    #[must_use]
    pub fn new(position: usize, src: impl Into<String>) -> Self {
        Self {
            position,
            src: src.into(),
        }
    }
}

/// Find every image placeholder, in document order
///
/// Images whose prompt is empty or whitespace are not placeholders.
#[must_use]
pub fn scan_placeholders(tree: &ElementTree) -> Vec<AssetPlaceholder> {
    tree.elements()
        .iter()
        .enumerate()
        .filter(|(_, element)| element.tag.name == "img")
        .filter_map(|(position, element)| {
            let prompt = element.tag.attr(PROMPT_ATTR)?.trim();
            (!prompt.is_empty()).then(|| AssetPlaceholder {
                prompt: prompt.to_string(),
                position,
            })
        })
        .collect()
}

/// Apply resolved resources to the markup
///
/// Each targeted element gets its `src` replaced and its prompt marker
/// removed. Positions that do not name an element are ignored.
#[must_use]
pub fn apply_resolutions(markup: &str, resolved: &[ResolvedAsset]) -> String {
    if resolved.is_empty() {
        return markup.to_string();
    }
    rewrite_tags(markup, |index, tag| {
        let asset = resolved.iter().find(|r| r.position == index)?;
        let mut tag = tag.clone();
        tag.set_attr("src", asset.src.clone());
        tag.remove_attr(PROMPT_ATTR);
        Some(tag)
    })
}

//! Addressable boxes
//!
//! Every meaningful content unit of a generated page carries a
//! `data-vibe-box="N"` attribute. Ids are assigned in a single document-order
//! pass starting at 1, so a freshly annotated document always numbers its
//! boxes `1..=n` without gaps. Ids only mean something within the document
//! that carries them; the next generation renumbers from scratch.

use crate::markup::{rewrite_tags, ElementTree};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Attribute carrying the box id
pub const BOX_ATTR: &str = "data-vibe-box";

/// Elements that are boxed even when the generator forgot to tag them
pub const BOX_ELEMENTS: &[&str] = &[
    "section", "header", "footer", "nav", "main", "article", "aside", "form", "div", "h1", "h2",
    "h3", "h4", "h5", "h6", "p", "button", "a", "img", "input", "textarea", "select", "ul", "ol",
];

/// Elements that are never boxed, whatever the generator wrote
const NEVER_BOXED: &[&str] = &[
    "html", "head", "body", "meta", "link", "title", "script", "style", "base", "noscript",
];

/// Box identifier (positive, unique within one document)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct BoxId(u32);

impl BoxId {
    /// Create a box id; zero is not a valid id
    #[inline]
    #[must_use]
    pub const fn new(value: u32) -> Option<Self> {
        if value == 0 {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Numeric value
    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl Display for BoxId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BoxId {
    type Err = BoxIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u32 = s
            .trim()
            .parse()
            .map_err(|_| BoxIdError::NotANumber(s.to_string()))?;
        Self::new(value).ok_or(BoxIdError::Zero)
    }
}

impl TryFrom<u32> for BoxId {
    type Error = BoxIdError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(BoxIdError::Zero)
    }
}

impl From<BoxId> for u32 {
    fn from(id: BoxId) -> Self {
        id.0
    }
}

/// Invalid box id text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoxIdError {
    /// Not a decimal integer
    #[error("box id is not a number: {0:?}")]
    NotANumber(String),

    /// Ids start at 1
    #[error("box id must be positive")]
    Zero,
}

/// A box found in a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressableBox {
    /// Box id
    pub id: BoxId,
    /// Element name (`section`, `h1`, ...)
    pub element: String,
    /// Element index in document order
    pub element_index: usize,
}

/// Violations of the numbering invariant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NumberingError {
    /// An id appears more than once
    #[error("box {0} is assigned more than once")]
    Duplicate(BoxId),

    /// Ids do not form `1..=n` in document order
    #[error("box at position {position} has id {found}, expected {expected}")]
    OutOfSequence {
        position: usize,
        expected: u32,
        found: BoxId,
    },
}

/// Assign box ids in one document-order pass
///
/// Every element that is either already tagged or listed in
/// [`BOX_ELEMENTS`] receives the next id, starting at 1. Tags on elements
/// that are never boxed (`html`, `script`, ...) are dropped, and any
/// non-numeric tag written by the generator is replaced.
///
/// Returns the annotated markup and the number of boxes assigned.
#[must_use]
pub fn annotate_boxes(markup: &str) -> (String, u32) {
    let mut next = 0u32;
    let annotated = rewrite_tags(markup, |_, tag| {
        if NEVER_BOXED.contains(&tag.name.as_str()) {
            return tag.has_attr(BOX_ATTR).then(|| {
                let mut tag = tag.clone();
                tag.remove_attr(BOX_ATTR);
                tag
            });
        }
        if !tag.has_attr(BOX_ATTR) && !BOX_ELEMENTS.contains(&tag.name.as_str()) {
            return None;
        }

        next += 1;
        let id = next.to_string();
        if tag.attr(BOX_ATTR) == Some(id.as_str()) {
            return None;
        }
        let mut tag = tag.clone();
        tag.set_attr(BOX_ATTR, id);
        Some(tag)
    });
    (annotated, next)
}

/// List the boxes a document carries, in document order
///
/// Tags whose value is not a positive integer are skipped.
#[must_use]
pub fn scan_boxes(tree: &ElementTree) -> Vec<AddressableBox> {
    tree.elements()
        .iter()
        .enumerate()
        .filter_map(|(element_index, element)| {
            let id = element.tag.attr(BOX_ATTR)?.parse::<BoxId>().ok()?;
            Some(AddressableBox {
                id,
                element: element.tag.name.clone(),
                element_index,
            })
        })
        .collect()
}

/// Check that ids are unique and run `1..=n` in document order
///
/// # Errors
/// Returns the first violation found.
pub fn check_numbering(boxes: &[AddressableBox]) -> Result<(), NumberingError> {
    let mut seen = std::collections::HashSet::with_capacity(boxes.len());
    for (position, b) in boxes.iter().enumerate() {
        if !seen.insert(b.id) {
            return Err(NumberingError::Duplicate(b.id));
        }
        let expected = u32::try_from(position + 1).unwrap_or(u32::MAX);
        if b.id.get() != expected {
            return Err(NumberingError::OutOfSequence {
                position,
                expected,
                found: b.id,
            });
        }
    }
    Ok(())
}

/// Find the box enclosing an element (the element itself counts)
#[must_use]
pub fn closest_box(tree: &ElementTree, element_index: usize) -> Option<BoxId> {
    tree.ancestors_inclusive(element_index)
        .find_map(|element| element.tag.attr(BOX_ATTR)?.parse::<BoxId>().ok())
}

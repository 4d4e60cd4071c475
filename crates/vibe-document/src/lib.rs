//! Vibe Document Model
//!
//! Immutable, content-addressed page documents and the markup conventions
//! the rest of the system relies on.
//!
//! # Core Concepts
//!
//! - [`Document`]: Immutable page markup with its [`ContentHash`]
//! - [`AddressableBox`]: A numbered, user-selectable region (`data-vibe-box`)
//! - [`AssetPlaceholder`]: An image awaiting synthesis (`data-image-prompt`)
//! - [`markup`]: Forgiving tag scanner used by all of the above
//!
//! # Example
//!
//! ```rust
//! use vibe_document::Document;
//!
//! let doc = Document::from_generated("```html\n<section><h1>Hi</h1></section>\n```");
//! assert_eq!(doc.boxes().len(), 2);
//! assert!(doc.check_box_numbering().is_ok());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod boxes;
mod document;
mod hash;
pub mod markup;
mod placeholder;

pub use boxes::{
    annotate_boxes, check_numbering, AddressableBox, BoxId, BoxIdError, NumberingError, BOX_ATTR,
    BOX_ELEMENTS,
};
pub use document::Document;
pub use hash::{ContentHash, HashError};
pub use placeholder::{AssetPlaceholder, ResolvedAsset, PROMPT_ATTR};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

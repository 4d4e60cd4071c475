//! Vibe Rendering Sandbox
//!
//! Displays untrusted generated pages and carries box selections back out:
//! - [`render`]: frame markup, edit-mode overlay, embedding `iframe`
//! - [`protocol`]: the `BOX_SELECTED` envelope and its validation
//! - Frame actor ([`spawn_sandbox`]): isolated frame task plus the host
//!   endpoint that drops anything not matching the envelope
//!
//! # Example
//!
//! ```rust
//! use vibe_document::Document;
//! use vibe_sandbox::spawn_sandbox;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), vibe_sandbox::FrameClosed> {
//! let (frame, mut host) = spawn_sandbox();
//! frame.render(Document::from_generated("<section><h1>Hi</h1></section>")).await?;
//! frame.set_edit_mode(true).await?;
//! frame.click(1).await?; // the h1
//! assert_eq!(host.next_selection().await.map(|s| s.id.get()), Some(2));
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod frame;
pub mod protocol;
pub mod render;

pub use frame::{
    spawn_sandbox, ClickDisposition, FrameClosed, FrameCommand, FrameHandle, FrameSnapshot,
    HoverOverlay, SandboxHost,
};
pub use protocol::{validate_message, validate_raw, BoxSelection, ProtocolViolation, BOX_SELECTED};
pub use render::{embed_frame, frame_markup, FrameOptions, Viewport};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

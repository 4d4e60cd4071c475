//! Frame actor and host endpoint
//!
//! The isolated frame runs as its own task and owns everything rendered
//! into it. The host never touches frame state directly:
//! - [`FrameHandle`] sends commands in (render, edit mode, pointer input)
//! - [`SandboxHost`] receives JSON envelopes out and validates each one
//!
//! Rendering replaces the frame content wholesale and bumps a generation
//! counter, so hover state and listeners never survive a new document.

use crate::protocol::{validate_message, BoxSelection, ProtocolViolation};
use crate::render::{frame_markup, HOVER_OUTLINE};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use vibe_document::markup::ElementTree;
use vibe_document::{BoxId, Document, BOX_ATTR};

const CHANNEL_CAPACITY: usize = 64;

/// Frame is gone (shut down or its task ended)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("sandbox frame is closed")]
pub struct FrameClosed;

/// Visual feedback for the hovered box
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoverOverlay {
    /// Box under the pointer
    pub id: BoxId,
    /// Outline style drawn around it
    pub outline: &'static str,
    /// Label text shown on it
    pub label: String,
}

/// What happened to a click's default action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickDisposition {
    /// Navigation/activation was prevented; a selection was posted
    Suppressed,
    /// The click behaved normally
    Default,
}

/// Observable frame state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSnapshot {
    /// Number of renders so far
    pub generation: u64,
    /// Annotator overlay active
    pub edit_mode: bool,
    /// Markup currently loaded
    pub markup: String,
    /// Box currently outlined
    pub hovered: Option<BoxId>,
}

/// Commands sent into the frame
#[derive(Debug)]
pub enum FrameCommand {
    /// Replace the frame content
    Render(Document),
    /// Toggle the annotator; reloads the frame
    SetEditMode(bool),
    /// Pointer entered the element at this index
    Hover {
        element_index: usize,
        reply: oneshot::Sender<Option<HoverOverlay>>,
    },
    /// Pointer clicked the element at this index
    Click {
        element_index: usize,
        reply: oneshot::Sender<ClickDisposition>,
    },
    /// Script inside the frame posts an arbitrary message
    Post(Value),
    /// Read current state
    Snapshot(oneshot::Sender<FrameSnapshot>),
    /// Stop the frame
    Shutdown,
}

/// Handle for driving the frame
#[derive(Debug, Clone)]
pub struct FrameHandle {
    sender: mpsc::Sender<FrameCommand>,
}

impl FrameHandle {
    async fn send(&self, command: FrameCommand) -> Result<(), FrameClosed> {
        self.sender.send(command).await.map_err(|_| FrameClosed)
    }

    /// Load a new document
    pub async fn render(&self, document: Document) -> Result<(), FrameClosed> {
        self.send(FrameCommand::Render(document)).await
    }

    /// Turn edit mode on or off
    pub async fn set_edit_mode(&self, enabled: bool) -> Result<(), FrameClosed> {
        self.send(FrameCommand::SetEditMode(enabled)).await
    }

    /// Move the pointer over an element
    pub async fn hover(&self, element_index: usize) -> Result<Option<HoverOverlay>, FrameClosed> {
        let (reply, rx) = oneshot::channel();
        self.send(FrameCommand::Hover {
            element_index,
            reply,
        })
        .await?;
        rx.await.map_err(|_| FrameClosed)
    }

    /// Click an element
    pub async fn click(&self, element_index: usize) -> Result<ClickDisposition, FrameClosed> {
        let (reply, rx) = oneshot::channel();
        self.send(FrameCommand::Click {
            element_index,
            reply,
        })
        .await?;
        rx.await.map_err(|_| FrameClosed)
    }

    /// Have frame content post an arbitrary message
    pub async fn post(&self, message: Value) -> Result<(), FrameClosed> {
        self.send(FrameCommand::Post(message)).await
    }

    /// Current frame state
    pub async fn snapshot(&self) -> Result<FrameSnapshot, FrameClosed> {
        let (reply, rx) = oneshot::channel();
        self.send(FrameCommand::Snapshot(reply)).await?;
        rx.await.map_err(|_| FrameClosed)
    }

    /// Stop the frame
    pub async fn shutdown(&self) -> Result<(), FrameClosed> {
        self.send(FrameCommand::Shutdown).await
    }
}

/// Host end of the frame's outbound channel
#[derive(Debug)]
pub struct SandboxHost {
    inbound: mpsc::Receiver<Value>,
    rejected: usize,
}

impl SandboxHost {
    /// Wait for the next valid selection
    ///
    /// Messages that fail validation are dropped. Returns `None` once the
    /// frame has stopped and the channel is drained.
    pub async fn next_selection(&mut self) -> Option<BoxSelection> {
        while let Some(message) = self.inbound.recv().await {
            if let Some(selection) = self.accept(&message) {
                return Some(selection);
            }
        }
        None
    }

    /// Next valid selection already delivered, without waiting
    pub fn try_next_selection(&mut self) -> Option<BoxSelection> {
        while let Ok(message) = self.inbound.try_recv() {
            if let Some(selection) = self.accept(&message) {
                return Some(selection);
            }
        }
        None
    }

    /// Number of messages dropped as protocol violations
    #[inline]
    #[must_use]
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    fn accept(&mut self, message: &Value) -> Option<BoxSelection> {
        match validate_message(message) {
            Ok(selection) => {
                tracing::debug!(box_id = %selection.id, "box selected");
                Some(selection)
            }
            Err(violation) => {
                self.rejected += 1;
                log_violation(&violation);
                None
            }
        }
    }
}

fn log_violation(violation: &ProtocolViolation) {
    tracing::debug!(%violation, "ignoring frame message");
}

/// Start a frame task
///
/// Must be called inside a tokio runtime.
#[must_use]
pub fn spawn_sandbox() -> (FrameHandle, SandboxHost) {
    let (command_tx, command_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (outbound_tx, outbound_rx) = mpsc::channel(CHANNEL_CAPACITY);

    tokio::spawn(frame_task(command_rx, outbound_tx));

    (
        FrameHandle { sender: command_tx },
        SandboxHost {
            inbound: outbound_rx,
            rejected: 0,
        },
    )
}

/// State living inside the isolated context
struct Frame {
    document: Document,
    tree: ElementTree,
    edit_mode: bool,
    generation: u64,
    hovered: Option<BoxId>,
}

impl Frame {
    fn new() -> Self {
        let document = Document::new("");
        Self {
            tree: document.elements(),
            document,
            edit_mode: false,
            generation: 0,
            hovered: None,
        }
    }

    fn reload(&mut self, document: Document) {
        self.tree = document.elements();
        self.document = document;
        self.generation += 1;
        self.hovered = None;
        tracing::debug!(
            generation = self.generation,
            edit_mode = self.edit_mode,
            hash = %self.document.hash().short(),
            "frame reloaded"
        );
    }

    fn box_at(&self, element_index: usize) -> Option<BoxId> {
        self.tree
            .ancestors_inclusive(element_index)
            .find_map(|element| element.tag.attr(BOX_ATTR)?.parse().ok())
    }

    fn hover(&mut self, element_index: usize) -> Option<HoverOverlay> {
        self.hovered = if self.edit_mode {
            self.box_at(element_index)
        } else {
            None
        };
        self.hovered.map(|id| HoverOverlay {
            id,
            outline: HOVER_OUTLINE,
            label: format!("Box {id}"),
        })
    }

    fn click(&self, element_index: usize) -> Option<BoxSelection> {
        if !self.edit_mode {
            return None;
        }
        self.box_at(element_index).map(BoxSelection::new)
    }

    fn snapshot(&self) -> FrameSnapshot {
        FrameSnapshot {
            generation: self.generation,
            edit_mode: self.edit_mode,
            markup: frame_markup(&self.document, self.edit_mode),
            hovered: self.hovered,
        }
    }
}

/// Queue a message for the host without ever blocking the frame
///
/// A host that stops draining loses the overflow; the frame keeps serving
/// commands.
fn deliver(outbound: &mpsc::Sender<Value>, message: Value) {
    match outbound.try_send(message) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => {
            tracing::warn!("host not draining frame messages, message dropped");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            tracing::debug!("host gone, message dropped");
        }
    }
}

async fn frame_task(mut commands: mpsc::Receiver<FrameCommand>, outbound: mpsc::Sender<Value>) {
    let mut frame = Frame::new();

    while let Some(command) = commands.recv().await {
        match command {
            FrameCommand::Render(document) => frame.reload(document),
            FrameCommand::SetEditMode(enabled) => {
                if frame.edit_mode != enabled {
                    frame.edit_mode = enabled;
                    let document = frame.document.clone();
                    frame.reload(document);
                }
            }
            FrameCommand::Hover {
                element_index,
                reply,
            } => {
                let _ = reply.send(frame.hover(element_index));
            }
            FrameCommand::Click {
                element_index,
                reply,
            } => {
                let disposition = match frame.click(element_index) {
                    Some(selection) => {
                        deliver(&outbound, selection.to_envelope());
                        ClickDisposition::Suppressed
                    }
                    None => ClickDisposition::Default,
                };
                let _ = reply.send(disposition);
            }
            FrameCommand::Post(message) => deliver(&outbound, message),
            FrameCommand::Snapshot(reply) => {
                let _ = reply.send(frame.snapshot());
            }
            FrameCommand::Shutdown => break,
        }
    }
    tracing::debug!(generation = frame.generation, "frame stopped");
}

//! Error types for Vibe Core
//!
//! One type per failure class:
//! - Configuration problems (fatal before any stage starts)
//! - Capability backend failures (fatal to the turn)
//! - Per-image failures (recovered with a fallback)
//! - Persistence failures (surfaced through the save indicator)
//! - Turn and session failures wrapping the above

use crate::pipeline::PipelineStage;
use crate::types::SiteId;
use std::fmt::{self, Display, Formatter};
use vibe_document::BoxId;

/// Missing or unusable configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// No API credential available
    #[error("missing API credential: set API_KEY or GEMINI_API_KEY")]
    MissingCredential,

    /// A setting has a value that cannot be used
    #[error("invalid setting `{key}`: {reason}")]
    InvalidSetting { key: String, reason: String },
}

/// The external capability a failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Request planning
    Planning,
    /// Markup generation
    Coding,
    /// Image synthesis
    ImageSynthesis,
}

impl Display for Capability {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Planning => f.write_str("planning"),
            Self::Coding => f.write_str("coding"),
            Self::ImageSynthesis => f.write_str("image synthesis"),
        }
    }
}

/// A capability backend failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CapabilityError {
    /// Request never produced a response
    #[error("{capability} request failed: {message}")]
    Request {
        capability: Capability,
        message: String,
    },

    /// Backend answered with an error status
    #[error("{capability} backend returned status {status}: {message}")]
    Status {
        capability: Capability,
        status: u16,
        message: String,
    },

    /// Response could not be interpreted
    #[error("{capability} backend returned an unusable response: {message}")]
    InvalidResponse {
        capability: Capability,
        message: String,
    },

    /// Response carried no usable content
    #[error("{capability} backend returned no content")]
    EmptyResponse { capability: Capability },

    /// Backend is not configured
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

impl CapabilityError {
    /// Capability the failure came from, if known
    #[must_use]
    pub fn capability(&self) -> Option<Capability> {
        match self {
            Self::Request { capability, .. }
            | Self::Status { capability, .. }
            | Self::InvalidResponse { capability, .. }
            | Self::EmptyResponse { capability } => Some(*capability),
            Self::Configuration(_) => None,
        }
    }
}

/// One image could not be synthesized
///
/// Never ends a turn; the image receives a fallback resource instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("image for prompt {prompt:?} could not be resolved: {source}")]
pub struct AssetResolutionError {
    /// Prompt of the failed placeholder
    pub prompt: String,
    /// Underlying failure
    #[source]
    pub source: CapabilityError,
}

/// Saving or loading site data failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PersistenceError {
    /// Site does not exist
    #[error("site not found: {0}")]
    SiteNotFound(SiteId),

    /// Store rejected or failed the operation
    #[error("storage failure: {0}")]
    Storage(String),

    /// Stored data cannot be read back
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// Custom domain is not acceptable
    #[error("invalid domain: {0:?}")]
    InvalidDomain(String),
}

/// A generation turn failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    /// Configuration prevented the run from starting
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Planning or coding backend failed
    #[error("capability error: {0}")]
    Capability(CapabilityError),

    /// Stage machine was driven out of order
    #[error("illegal stage transition {from} -> {to}")]
    IllegalTransition { from: PipelineStage, to: PipelineStage },
}

impl From<CapabilityError> for PipelineError {
    fn from(error: CapabilityError) -> Self {
        match error {
            CapabilityError::Configuration(e) => Self::Configuration(e),
            other => Self::Capability(other),
        }
    }
}

/// Editing session failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Instruction text is blank
    #[error("instruction is empty")]
    EmptyInstruction,

    /// Box is not part of the current document
    #[error("box {0} is not in the current document")]
    UnknownBox(BoxId),

    /// Site could not be loaded or saved
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

//! External capabilities
//!
//! The pipeline drives three backends it does not implement:
//! - [`PlanningCapability`]: natural-language planning
//! - [`CodingCapability`]: markup generation
//! - [`ImageCapability`]: image synthesis
//!
//! Any timeout is the backend's business; the pipeline waits for whatever
//! the backend returns.

use crate::error::CapabilityError;
use async_trait::async_trait;

/// Turns a request into a plan
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlanningCapability: Send + Sync {
    /// Whether a credential is available
    fn is_configured(&self) -> bool;

    /// Produce a plan
    ///
    /// `Ok(None)` (or blank text) means the backend had nothing to say;
    /// the pipeline substitutes a fallback plan.
    async fn plan(
        &self,
        directive: &str,
        request: &str,
        context: &str,
    ) -> Result<Option<String>, CapabilityError>;
}

/// Generates page markup
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CodingCapability: Send + Sync {
    /// Whether a credential is available
    fn is_configured(&self) -> bool;

    /// Generate raw markup; may be wrapped in a markdown fence
    async fn generate(&self, directive: &str, instruction: &str) -> Result<String, CapabilityError>;
}

/// Synthesizes images from prompts
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageCapability: Send + Sync {
    /// Whether a credential is available
    fn is_configured(&self) -> bool;

    /// Produce a resource reference (data URI or URL) for the prompt
    async fn synthesize(&self, prompt: &str) -> Result<String, CapabilityError>;
}

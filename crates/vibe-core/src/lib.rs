//! Vibe Core - chat-driven page generation
//!
//! The orchestration layer between the user and the backends:
//! - Runs the plan → code → asset-fill pipeline as a tagged state machine
//! - Keeps the editing session (document, selection, conversation)
//! - Tracks the autosave indicator and persists each successful turn
//! - Defines the capability and repository contracts backends implement
//!
//! # Example
//!
//! ```rust,ignore
//! use vibe_core::{EditingSession, GenerationPipeline, StatusLog};
//!
//! # async fn example(pipeline: GenerationPipeline, repo: std::sync::Arc<dyn vibe_core::SiteRepository>) -> Result<(), Box<dyn std::error::Error>> {
//! let user = repo.fetch_or_create_user("ada@example.com").await?;
//! let mut session = EditingSession::start(pipeline, repo, user).await;
//!
//! let outcome = session.submit("A landing page for a bakery", &StatusLog::new()).await?;
//! println!("completed: {}, saved as {:?}", outcome.is_completed(), session.site_id());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod autosave;
pub mod capability;
pub mod conversation;
pub mod error;
pub mod pipeline;
pub mod prompts;
pub mod session;
pub mod site;
pub mod status;
pub mod types;

pub use autosave::{SaveState, SaveTracker};
pub use capability::{CodingCapability, ImageCapability, PlanningCapability};
pub use conversation::{Conversation, Message, Role, APOLOGY, CONFIRMATION};
pub use error::{
    AssetResolutionError, Capability, CapabilityError, ConfigurationError, PersistenceError,
    PipelineError, SessionError,
};
pub use pipeline::{fallback_image_url, AssetReport, Generation, GenerationPipeline, PipelineStage, PipelineState};
pub use session::{EditingSession, TurnOutcome, INITIAL_HTML};
pub use site::{
    DnsRecord, DomainBinding, DomainMethod, DomainStatus, SaveReceipt, SaveRequest, Site,
    SiteRepository, SiteSummary, User, Version, DEFAULT_TITLE,
};
pub use status::{NoStatus, StatusLog, StatusSink};
pub use types::{Instruction, MessageId, Plan, PipelineConfig, SiteId, UserId, VersionId};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Vibe Core
    pub use crate::{
        CodingCapability, EditingSession, GenerationPipeline, ImageCapability, Instruction,
        PipelineConfig, PlanningCapability, SiteRepository, StatusSink, TurnOutcome,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

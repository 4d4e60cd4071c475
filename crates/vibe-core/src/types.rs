//! Core types for Vibe
//!
//! Defines the values that flow through a turn:
//! - Site, version and user identifiers
//! - The per-turn instruction
//! - The plan handed from planner to coder
//! - Pipeline configuration

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use ulid::Ulid;
use uuid::Uuid;
use vibe_document::{BoxId, Document};

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a new random id
            #[inline]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// First eight hex digits
            #[must_use]
            pub fn short(&self) -> String {
                self.0.simple().to_string()[..8].to_string()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Unique site identifier
    SiteId
);
uuid_id!(
    /// Unique version identifier
    VersionId
);
uuid_id!(
    /// Unique user identifier
    UserId
);

/// Conversation message identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Ulid);

impl MessageId {
    /// Generate new message ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for MessageId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One user turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// What the user asked for
    pub text: String,
    /// Page currently displayed, if any
    pub prior_document: Option<Document>,
    /// Box the user selected in the preview
    pub selected_box: Option<BoxId>,
}

impl Instruction {
    /// Create an instruction for a new page
    #[inline]
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            prior_document: None,
            selected_box: None,
        }
    }

    /// Edit an existing page
    #[inline]
    #[must_use]
    pub fn with_prior(mut self, document: Document) -> Self {
        self.prior_document = Some(document);
        self
    }

    /// Target a selected box
    #[inline]
    #[must_use]
    pub fn with_selection(mut self, id: Option<BoxId>) -> Self {
        self.selected_box = id;
        self
    }

    /// Whether this edits an existing page
    #[inline]
    #[must_use]
    pub fn is_edit(&self) -> bool {
        self.prior_document.as_ref().is_some_and(|d| !d.is_empty())
    }
}

/// Plan used when the planner returns nothing
pub const FALLBACK_PLAN: &str = "Update the website based on user request.";

/// Planner output, consumed only by the coder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    text: String,
    fallback: bool,
}

impl Plan {
    /// Build a plan from a planner response
    ///
    /// Absent or blank responses yield [`FALLBACK_PLAN`].
    #[must_use]
    pub fn from_response(response: Option<String>) -> Self {
        match response {
            Some(text) if !text.trim().is_empty() => Self {
                text: text.trim().to_string(),
                fallback: false,
            },
            _ => Self {
                text: FALLBACK_PLAN.to_string(),
                fallback: true,
            },
        }
    }

    /// Plan text
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the fallback plan was substituted
    #[inline]
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }
}

/// Default bound on concurrent image requests
pub const DEFAULT_MAX_CONCURRENT_IMAGES: usize = 6;

/// Pipeline configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum image requests in flight at once (at least 1)
    pub max_concurrent_images: usize,
}

impl PipelineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_concurrent_images: DEFAULT_MAX_CONCURRENT_IMAGES,
        }
    }

    /// Set the image concurrency bound, clamped to at least 1
    #[inline]
    #[must_use]
    pub fn with_max_concurrent_images(mut self, limit: usize) -> Self {
        self.max_concurrent_images = limit.max(1);
        self
    }

    /// Effective concurrency bound
    #[inline]
    #[must_use]
    pub fn image_permits(&self) -> usize {
        self.max_concurrent_images.max(1)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_plan_falls_back() {
        for response in [None, Some(String::new()), Some("  \n".to_string())] {
            let plan = Plan::from_response(response);
            assert!(plan.is_fallback());
            assert_eq!(plan.text(), FALLBACK_PLAN);
        }
        let plan = Plan::from_response(Some(" {\"sections\":[\"hero\"]} ".into()));
        assert!(!plan.is_fallback());
        assert_eq!(plan.text(), "{\"sections\":[\"hero\"]}");
    }

    #[test]
    fn concurrency_bound_is_at_least_one() {
        assert_eq!(PipelineConfig::new().with_max_concurrent_images(0).image_permits(), 1);
        let raw = PipelineConfig {
            max_concurrent_images: 0,
        };
        assert_eq!(raw.image_permits(), 1);
    }

    #[test]
    fn site_id_round_trips_through_text() {
        let id = SiteId::new();
        assert_eq!(id.to_string().parse::<SiteId>().unwrap(), id);
        assert_eq!(id.short().len(), 8);
    }

    #[test]
    fn blank_prior_document_is_not_an_edit() {
        assert!(!Instruction::new("x").with_prior(Document::new(" ")).is_edit());
        assert!(Instruction::new("x").with_prior(Document::new("<p>a</p>")).is_edit());
    }
}

//! Backend settings and credential lookup

use crate::error::GeminiError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default REST root
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model for planning and coding
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";

/// Default model for image synthesis
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-3-pro-image-preview";

/// Environment variables consulted for the credential, in order
pub const CREDENTIAL_VARS: [&str; 2] = ["API_KEY", "GEMINI_API_KEY"];

/// Tunables for the Gemini backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// REST root, without trailing `/models`
    pub base_url: String,
    /// Model used for planning and coding
    pub text_model: String,
    /// Model used for image synthesis
    pub image_model: String,
    /// Sampling temperature for markup generation
    pub coding_temperature: f32,
    /// Thinking token budget for planning
    pub planning_thinking_budget: u32,
    /// Aspect ratio requested for images
    pub image_aspect_ratio: String,
    /// Image size class requested for images
    pub image_size: String,
    /// Per-request timeout
    pub request_timeout_secs: u64,
    /// Extra attempts after a transient failure
    pub max_retries: u32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            coding_temperature: 0.7,
            planning_thinking_budget: 1024,
            image_aspect_ratio: "16:9".to_string(),
            image_size: "1K".to_string(),
            request_timeout_secs: 120,
            max_retries: 2,
        }
    }
}

impl GeminiConfig {
    /// Request timeout as a duration
    #[inline]
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Check values the backend cannot work with
    ///
    /// # Errors
    /// `GeminiError::InvalidSetting` naming the first offending key.
    pub fn validate(&self) -> Result<(), GeminiError> {
        if self.text_model.trim().is_empty() {
            return Err(GeminiError::invalid("text_model", "must not be empty"));
        }
        if self.image_model.trim().is_empty() {
            return Err(GeminiError::invalid("image_model", "must not be empty"));
        }
        if !(0.0..=2.0).contains(&self.coding_temperature) {
            return Err(GeminiError::invalid(
                "coding_temperature",
                "must be between 0.0 and 2.0",
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(GeminiError::invalid("request_timeout_secs", "must be positive"));
        }
        Ok(())
    }
}

/// API key; never printed
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a key; blank keys count as absent
    #[must_use]
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Resolve from the process environment
    #[must_use]
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve through an arbitrary variable lookup
    ///
    /// `API_KEY` wins over `GEMINI_API_KEY`; an empty value falls through.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        CREDENTIAL_VARS
            .iter()
            .find_map(|name| lookup(name).and_then(Self::new))
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

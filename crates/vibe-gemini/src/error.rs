//! Error types for the Gemini backend

use vibe_core::{Capability, CapabilityError, ConfigurationError};

/// Gemini backend failure
#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    /// No API key in the environment or the configuration
    #[error("missing API credential")]
    MissingCredential,

    /// Configuration value unusable
    #[error("invalid setting `{key}`: {reason}")]
    InvalidSetting { key: String, reason: String },

    /// Base URL does not parse
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),

    /// HTTP client could not be built
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Transport failure (timeout, connection, body read)
    #[error("{capability} request failed: {message}")]
    Transport {
        capability: Capability,
        message: String,
    },

    /// Non-success HTTP status
    #[error("{capability} backend returned status {status}: {message}")]
    Status {
        capability: Capability,
        status: u16,
        message: String,
    },

    /// Body is not a generateContent response
    #[error("{capability} response could not be decoded: {message}")]
    Decode {
        capability: Capability,
        message: String,
    },

    /// Response decoded but carries nothing usable
    #[error("{capability} response carries no usable content")]
    Empty { capability: Capability },
}

impl GeminiError {
    pub(crate) fn invalid(key: &str, reason: &str) -> Self {
        Self::InvalidSetting {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether another attempt may succeed
    ///
    /// Transport failures, rate limiting and server errors are transient.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Status { status, .. } => *status == 429 || (500..=599).contains(status),
            _ => false,
        }
    }
}

impl From<GeminiError> for ConfigurationError {
    fn from(err: GeminiError) -> Self {
        match err {
            GeminiError::MissingCredential => Self::MissingCredential,
            GeminiError::InvalidSetting { key, reason } => Self::InvalidSetting { key, reason },
            GeminiError::InvalidBaseUrl(e) => Self::InvalidSetting {
                key: "base_url".to_string(),
                reason: e.to_string(),
            },
            other => Self::InvalidSetting {
                key: "gemini".to_string(),
                reason: other.to_string(),
            },
        }
    }
}

impl From<GeminiError> for CapabilityError {
    fn from(err: GeminiError) -> Self {
        match err {
            GeminiError::Transport { capability, message } => Self::Request { capability, message },
            GeminiError::Status {
                capability,
                status,
                message,
            } => Self::Status {
                capability,
                status,
                message,
            },
            GeminiError::Decode { capability, message } => {
                Self::InvalidResponse { capability, message }
            }
            GeminiError::Empty { capability } => Self::EmptyResponse { capability },
            other => Self::Configuration(other.into()),
        }
    }
}

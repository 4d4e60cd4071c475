//! Vibe Gemini - capability backend
//!
//! Implements the planning, coding and image capabilities of `vibe-core`
//! against the Gemini `generateContent` REST endpoint:
//! - [`GeminiConfig`]: models, sampling and image settings, timeouts
//! - [`ApiKey`]: credential from `API_KEY` or `GEMINI_API_KEY`
//! - [`GeminiClient`]: one HTTP client serving all three capabilities
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vibe_core::GenerationPipeline;
//! use vibe_gemini::{GeminiClient, GeminiConfig};
//!
//! # fn example() -> Result<(), vibe_gemini::GeminiError> {
//! let client = Arc::new(GeminiClient::from_env(GeminiConfig::default())?);
//! let pipeline = GenerationPipeline::new(client.clone(), client.clone(), client);
//! # let _ = pipeline;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod client;
pub mod config;
pub mod error;
pub mod wire;

pub use client::{endpoint, GeminiClient, API_KEY_HEADER};
pub use config::{ApiKey, GeminiConfig, CREDENTIAL_VARS, DEFAULT_BASE_URL};
pub use error::GeminiError;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Application configuration
//!
//! Read from a TOML file (default `./vibe.toml`, optional). Every key has
//! a default, so an empty or missing file is valid:
//!
//! ```toml
//! database_path = "vibe.sqlite3"
//!
//! [gemini]
//! text_model = "gemini-2.5-flash"
//! coding_temperature = 0.7
//!
//! [pipeline]
//! max_concurrent_images = 6
//! ```
//!
//! `VIBE_DB` overrides `database_path`. The API key never lives here; it
//! comes from `API_KEY` or `GEMINI_API_KEY`.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use vibe_core::types::DEFAULT_MAX_CONCURRENT_IMAGES;
use vibe_core::PipelineConfig;
use vibe_gemini::GeminiConfig;

/// Default configuration file
pub const DEFAULT_CONFIG_PATH: &str = "vibe.toml";

/// Default database file
pub const DEFAULT_DATABASE_PATH: &str = "vibe.sqlite3";

/// Variable overriding the database path
pub const DATABASE_ENV: &str = "VIBE_DB";

/// `[pipeline]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub max_concurrent_images: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_concurrent_images: DEFAULT_MAX_CONCURRENT_IMAGES,
        }
    }
}

/// Whole configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub gemini: GeminiConfig,
    pub pipeline: PipelineSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            gemini: GeminiConfig::default(),
            pipeline: PipelineSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load from `path`
    ///
    /// A missing file yields defaults unless `required` is set.
    pub fn load(path: &Path, required: bool) -> anyhow::Result<Self> {
        if !path.exists() {
            anyhow::ensure!(!required, "no config file found at {}", path.display());
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid config at {}", path.display()))
    }

    /// Parse TOML text
    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.gemini.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`
    #[must_use]
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(db) = lookup(DATABASE_ENV).filter(|v| !v.trim().is_empty()) {
            self.database_path = PathBuf::from(db.trim());
        }
        self
    }

    /// Pipeline settings, limits clamped
    #[must_use]
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::new().with_max_concurrent_images(self.pipeline.max_concurrent_images)
    }
}

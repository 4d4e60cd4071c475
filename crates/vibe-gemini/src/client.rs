//! HTTP client for the generateContent endpoint
//!
//! One [`GeminiClient`] serves all three capabilities:
//! - planning: text model with a thinking budget
//! - coding: text model with a sampling temperature
//! - image synthesis: image model, first inline image as a data URI
//!
//! Transient failures (transport, 429, 5xx) are retried with a linear
//! backoff; everything else is returned on the first attempt.

use crate::config::{ApiKey, GeminiConfig};
use crate::error::GeminiError;
use crate::wire::{
    error_message, GenerateContentRequest, GenerateContentResponse, GenerationConfig, ImageConfig,
    ThinkingConfig,
};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;
use vibe_core::prompts::planner_user_text;
use vibe_core::{
    Capability, CapabilityError, CodingCapability, ConfigurationError, ImageCapability,
    PlanningCapability,
};

const RETRY_DELAY_MS: u64 = 1000;

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "x-goog-api-key";

/// Endpoint for one model
///
/// # Errors
/// `url::ParseError` if the base URL or model name do not form a URL.
pub fn endpoint(base_url: &str, model: &str) -> Result<Url, url::ParseError> {
    Url::parse(&format!(
        "{}/models/{}:generateContent",
        base_url.trim_end_matches('/'),
        model
    ))
}

/// Gemini backend
#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    config: GeminiConfig,
    text_endpoint: Url,
    image_endpoint: Url,
    key: Option<ApiKey>,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("text_endpoint", &self.text_endpoint.as_str())
            .field("image_endpoint", &self.image_endpoint.as_str())
            .field("configured", &self.key.is_some())
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Create new client
    ///
    /// A client without a key can be built; every call then fails with
    /// `MissingCredential` and `is_configured` reports `false`.
    ///
    /// # Errors
    /// Invalid settings or base URL, or HTTP client construction failure.
    pub fn new(config: GeminiConfig, key: Option<ApiKey>) -> Result<Self, GeminiError> {
        config.validate()?;
        let text_endpoint = endpoint(&config.base_url, &config.text_model)?;
        let image_endpoint = endpoint(&config.base_url, &config.image_model)?;
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(GeminiError::Client)?;

        tracing::debug!(
            "Gemini client ready: text={}, image={}",
            config.text_model,
            config.image_model
        );
        Ok(Self {
            http,
            config,
            text_endpoint,
            image_endpoint,
            key,
        })
    }

    /// Create new client with the key from the environment
    ///
    /// # Errors
    /// `GeminiError::MissingCredential` if neither `API_KEY` nor
    /// `GEMINI_API_KEY` is set to a non-empty value.
    pub fn from_env(config: GeminiConfig) -> Result<Self, GeminiError> {
        let key = ApiKey::from_env().ok_or(GeminiError::MissingCredential)?;
        Self::new(config, Some(key))
    }

    /// Settings in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Planning request body
    #[must_use]
    pub fn planning_request(&self, directive: &str, request: &str, context: &str) -> GenerateContentRequest {
        GenerateContentRequest::user_turn(Some(directive), &planner_user_text(request, context))
            .with_generation_config(GenerationConfig {
                thinking_config: Some(ThinkingConfig {
                    thinking_budget: self.config.planning_thinking_budget,
                }),
                ..GenerationConfig::default()
            })
    }

    /// Coding request body
    #[must_use]
    pub fn coding_request(&self, directive: &str, instruction: &str) -> GenerateContentRequest {
        GenerateContentRequest::user_turn(Some(directive), instruction).with_generation_config(
            GenerationConfig {
                temperature: Some(self.config.coding_temperature),
                ..GenerationConfig::default()
            },
        )
    }

    /// Image request body
    #[must_use]
    pub fn image_request(&self, prompt: &str) -> GenerateContentRequest {
        GenerateContentRequest::user_turn(None, prompt).with_generation_config(GenerationConfig {
            image_config: Some(ImageConfig {
                aspect_ratio: self.config.image_aspect_ratio.clone(),
                image_size: self.config.image_size.clone(),
            }),
            ..GenerationConfig::default()
        })
    }

    fn key(&self) -> Result<&ApiKey, GeminiError> {
        self.key.as_ref().ok_or(GeminiError::MissingCredential)
    }

    /// Call the endpoint, retrying transient failures
    async fn generate_content(
        &self,
        capability: Capability,
        url: &Url,
        body: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GeminiError> {
        let key = self.key()?;
        let mut attempt = 0;
        loop {
            match self.send_once(capability, url, key, body).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_transient() && attempt < self.config.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        "{} request attempt {} failed, retrying: {}",
                        capability,
                        attempt,
                        err
                    );
                    tokio::time::sleep(Duration::from_millis(RETRY_DELAY_MS * u64::from(attempt))).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn send_once(
        &self,
        capability: Capability,
        url: &Url,
        key: &ApiKey,
        body: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GeminiError> {
        let timeout = self.config.request_timeout_secs;
        let transport = |e: reqwest::Error| GeminiError::Transport {
            capability,
            message: if e.is_timeout() {
                format!("timed out after {timeout}s")
            } else if e.is_connect() {
                format!("connection failed: {e}")
            } else {
                format!("network error: {e}")
            },
        };

        tracing::debug!("Calling {} for {}", url, capability);
        let response = self
            .http
            .post(url.clone())
            .header(API_KEY_HEADER, key.expose())
            .json(body)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let text = response.text().await.map_err(transport)?;
        if !status.is_success() {
            return Err(GeminiError::Status {
                capability,
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        serde_json::from_str(&text).map_err(|e| GeminiError::Decode {
            capability,
            message: e.to_string(),
        })
    }
}

fn missing() -> CapabilityError {
    CapabilityError::Configuration(ConfigurationError::MissingCredential)
}

#[async_trait]
impl PlanningCapability for GeminiClient {
    fn is_configured(&self) -> bool {
        self.key.is_some()
    }

    async fn plan(
        &self,
        directive: &str,
        request: &str,
        context: &str,
    ) -> Result<Option<String>, CapabilityError> {
        if self.key.is_none() {
            return Err(missing());
        }
        let body = self.planning_request(directive, request, context);
        let response = self
            .generate_content(Capability::Planning, &self.text_endpoint, &body)
            .await?;
        Ok(response.text())
    }
}

#[async_trait]
impl CodingCapability for GeminiClient {
    fn is_configured(&self) -> bool {
        self.key.is_some()
    }

    async fn generate(&self, directive: &str, instruction: &str) -> Result<String, CapabilityError> {
        if self.key.is_none() {
            return Err(missing());
        }
        let body = self.coding_request(directive, instruction);
        let response = self
            .generate_content(Capability::Coding, &self.text_endpoint, &body)
            .await?;
        response.text().ok_or(CapabilityError::EmptyResponse {
            capability: Capability::Coding,
        })
    }
}

#[async_trait]
impl ImageCapability for GeminiClient {
    fn is_configured(&self) -> bool {
        self.key.is_some()
    }

    async fn synthesize(&self, prompt: &str) -> Result<String, CapabilityError> {
        if self.key.is_none() {
            return Err(missing());
        }
        let body = self.image_request(prompt);
        let response = self
            .generate_content(Capability::ImageSynthesis, &self.image_endpoint, &body)
            .await?;
        match response.image_data_uri() {
            Ok(Some(uri)) => Ok(uri),
            Ok(None) => Err(CapabilityError::InvalidResponse {
                capability: Capability::ImageSynthesis,
                message: "no image data in response".to_string(),
            }),
            Err(message) => Err(CapabilityError::InvalidResponse {
                capability: Capability::ImageSynthesis,
                message,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn client(key: Option<&str>) -> GeminiClient {
        GeminiClient::new(GeminiConfig::default(), key.and_then(ApiKey::new)).unwrap()
    }

    #[test]
    fn endpoint_appends_model_path() {
        assert_eq!(
            endpoint("https://example.test/v1beta/", "gemini-2.5-flash")
                .unwrap()
                .as_str(),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert!(endpoint("not a url", "m").is_err());
    }

    #[test]
    fn bad_base_url_fails_construction() {
        let config = GeminiConfig {
            base_url: "::".to_string(),
            ..GeminiConfig::default()
        };
        let err = GeminiClient::new(config, None).unwrap_err();
        assert!(matches!(err, GeminiError::InvalidBaseUrl(_)));
        assert!(matches!(
            ConfigurationError::from(err),
            ConfigurationError::InvalidSetting { key, .. } if key == "base_url"
        ));
    }

    #[test]
    fn configured_follows_key() {
        assert!(PlanningCapability::is_configured(&client(Some("k"))));
        assert!(!ImageCapability::is_configured(&client(None)));
        assert!(!CodingCapability::is_configured(&client(Some(""))));
    }

    #[tokio::test]
    async fn keyless_calls_fail_before_network() {
        let client = client(None);
        assert_eq!(client.synthesize("barn").await.unwrap_err(), missing());
        assert_eq!(client.generate("d", "i").await.unwrap_err(), missing());
        assert_eq!(client.plan("d", "r", "c").await.unwrap_err(), missing());
    }

    #[test]
    fn planning_request_carries_context_and_budget() {
        let body = client(Some("k")).planning_request("plan it", "a bakery", "New site");
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value["contents"][0]["parts"][0]["text"],
            json!("User request: a bakery. Current context: New site")
        );
        assert_eq!(value["generationConfig"]["thinkingConfig"]["thinkingBudget"], json!(1024));
    }

    #[test]
    fn coding_request_sets_temperature() {
        let body = client(Some("k")).coding_request("directive", "Generate the website HTML now.");
        let config = body.generation_config.unwrap();
        assert_eq!(config.temperature, Some(0.7));
        assert!(config.thinking_config.is_none());
    }

    #[test]
    fn image_request_uses_configured_shape() {
        let mut config = GeminiConfig::default();
        config.image_aspect_ratio = "4:3".to_string();
        let client = GeminiClient::new(config, ApiKey::new("k")).unwrap();

        let body = client.image_request("a red barn");
        assert!(body.system_instruction.is_none());
        let image = body.generation_config.unwrap().image_config.unwrap();
        assert_eq!(image.aspect_ratio, "4:3");
        assert_eq!(image.image_size, "1K");
    }

    #[test]
    fn debug_omits_key() {
        let rendered = format!("{:?}", client(Some("super-secret")));
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("configured: true"));
    }
}

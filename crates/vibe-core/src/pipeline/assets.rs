//! Asset fill stage
//!
//! Resolves every image placeholder of a coded document:
//! - one synthesis call per placeholder, bounded by a semaphore
//! - failures are replaced by a deterministic fallback URL
//! - the stage settles only after every call has finished

use crate::capability::ImageCapability;
use crate::error::{AssetResolutionError, Capability, CapabilityError};
use crate::status::{status_generating_images, StatusSink};
use futures::future::join_all;
use tokio::sync::Semaphore;
use url::form_urlencoded;
use vibe_document::{Document, ResolvedAsset};

/// Base of the fallback image URL
pub const FALLBACK_IMAGE_BASE: &str = "https://placehold.co/800x600";

/// Fallback image for a prompt
///
/// The prompt is form-encoded into the `text` query parameter, so the
/// same prompt always yields the same URL.
#[must_use]
pub fn fallback_image_url(prompt: &str) -> String {
    let text: String = form_urlencoded::byte_serialize(prompt.as_bytes()).collect();
    format!("{FALLBACK_IMAGE_BASE}?text={text}")
}

/// Result of the asset stage
#[derive(Debug, Clone)]
pub struct AssetReport {
    /// Document with every placeholder resolved
    pub document: Document,
    /// Placeholders resolved by the backend
    pub synthesized: usize,
    /// Placeholders that fell back
    pub failures: Vec<AssetResolutionError>,
}

impl AssetReport {
    /// Placeholders handled in total
    #[inline]
    #[must_use]
    pub fn total(&self) -> usize {
        self.synthesized + self.failures.len()
    }
}

/// Resolve all placeholders of `document`
///
/// Issues no call at all when the document has no placeholders.
pub async fn fill_assets(
    document: &Document,
    imager: &dyn ImageCapability,
    max_in_flight: usize,
    status: &dyn StatusSink,
) -> AssetReport {
    let placeholders = document.placeholders();
    if placeholders.is_empty() {
        tracing::debug!("No image placeholders");
        return AssetReport {
            document: document.clone(),
            synthesized: 0,
            failures: Vec::new(),
        };
    }

    status.report(&status_generating_images(placeholders.len()));
    tracing::info!(
        "Resolving {} image placeholders (max {} in flight)",
        placeholders.len(),
        max_in_flight.max(1)
    );

    let permits = Semaphore::new(max_in_flight.max(1));
    let calls = placeholders.iter().map(|placeholder| {
        let permits = &permits;
        async move {
            let _permit = permits.acquire().await.ok();
            let result = match imager.synthesize(&placeholder.prompt).await {
                Ok(src) if src.trim().is_empty() => Err(CapabilityError::EmptyResponse {
                    capability: Capability::ImageSynthesis,
                }),
                other => other,
            };
            (placeholder, result)
        }
    });
    let settled = join_all(calls).await;

    let mut resolved = Vec::with_capacity(settled.len());
    let mut failures = Vec::new();
    for (placeholder, result) in settled {
        match result {
            Ok(src) => resolved.push(ResolvedAsset::new(placeholder.position, src)),
            Err(source) => {
                let failure = AssetResolutionError {
                    prompt: placeholder.prompt.clone(),
                    source,
                };
                tracing::warn!("{}", failure);
                resolved.push(ResolvedAsset::new(
                    placeholder.position,
                    fallback_image_url(&placeholder.prompt),
                ));
                failures.push(failure);
            }
        }
    }

    AssetReport {
        document: document.with_resolved_assets(&resolved),
        synthesized: resolved.len() - failures.len(),
        failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::MockImageCapability;
    use crate::status::{NoStatus, StatusLog};

    #[test]
    fn fallback_url_encodes_prompt() {
        assert_eq!(
            fallback_image_url("Fresh bread & coffee"),
            "https://placehold.co/800x600?text=Fresh+bread+%26+coffee"
        );
        assert_eq!(fallback_image_url("x"), fallback_image_url("x"));
    }

    #[tokio::test]
    async fn no_placeholders_means_no_calls() {
        let mut imager = MockImageCapability::new();
        imager.expect_synthesize().never();

        let doc = Document::new("<img src=\"a.png\"><p>x</p>");
        let status = StatusLog::new();
        let report = fill_assets(&doc, &imager, 4, &status).await;

        assert_eq!(report.document, doc);
        assert_eq!(report.total(), 0);
        assert!(status.lines().is_empty());
    }

    #[tokio::test]
    async fn failed_image_gets_fallback_and_others_survive() {
        let mut imager = MockImageCapability::new();
        imager
            .expect_synthesize()
            .times(2)
            .returning(|prompt| {
                if prompt == "broken" {
                    Err(CapabilityError::Status {
                        capability: Capability::ImageSynthesis,
                        status: 500,
                        message: "boom".into(),
                    })
                } else {
                    Ok(format!("data:image/png;base64,{}", prompt.len()))
                }
            });

        let doc = Document::new(
            r#"<img data-image-prompt="sunset"><img data-image-prompt="broken">"#,
        );
        let report = fill_assets(&doc, &imager, 1, &NoStatus).await;

        assert_eq!(report.synthesized, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].prompt, "broken");
        assert!(report.document.placeholders().is_empty());
        assert!(report.document.markup().contains("src=\"data:image/png;base64,6\""));
        assert!(report
            .document
            .markup()
            .contains("src=\"https://placehold.co/800x600?text=broken\""));
    }

    #[tokio::test]
    async fn blank_resource_counts_as_failure() {
        let mut imager = MockImageCapability::new();
        imager.expect_synthesize().times(1).returning(|_| Ok("  ".into()));

        let doc = Document::new(r#"<img data-image-prompt="cat">"#);
        let report = fill_assets(&doc, &imager, 6, &NoStatus).await;

        assert_eq!(report.failures.len(), 1);
        assert!(report.document.markup().contains("text=cat"));
    }
}

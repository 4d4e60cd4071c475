//! Generation pipeline
//!
//! Turns an [`Instruction`] into a new [`Document`] in three stages:
//! - planning: request → plan (blank plans fall back, never fail)
//! - coding: plan → annotated document (failure ends the turn)
//! - filling assets: placeholders → images (failures fall back)
//!
//! The pipeline is value-in/value-out: it never touches the displayed
//! document, so a failed turn cannot disturb it.

mod assets;
mod state;

pub use assets::{fill_assets, fallback_image_url, AssetReport, FALLBACK_IMAGE_BASE};
pub use state::{advance, allowed_transitions, validate_transition, PipelineStage, PipelineState};

use crate::capability::{CodingCapability, ImageCapability, PlanningCapability};
use crate::error::{AssetResolutionError, Capability, CapabilityError, ConfigurationError, PipelineError};
use crate::prompts::{coder_directive, planning_context, CODER_USER_TURN, PLANNER_DIRECTIVE};
use crate::status::{StatusSink, STATUS_CODING, STATUS_FINALIZING, STATUS_PLANNING, STATUS_SCANNING_IMAGES};
use crate::types::{Instruction, Plan, PipelineConfig};
use std::sync::Arc;
use vibe_document::Document;

/// Output of a successful turn
#[derive(Debug, Clone)]
pub struct Generation {
    /// The finished document
    pub document: Document,
    /// Whether the planner's answer was replaced by the fallback plan
    pub fallback_plan: bool,
    /// Images resolved by the backend
    pub images_synthesized: usize,
    /// Images that received a fallback resource
    pub image_failures: Vec<AssetResolutionError>,
}

#[derive(Debug, Default)]
struct TurnNotes {
    fallback_plan: bool,
    images_synthesized: usize,
    image_failures: Vec<AssetResolutionError>,
}

/// Plan → code → asset-fill pipeline
#[derive(Clone)]
pub struct GenerationPipeline {
    planner: Arc<dyn PlanningCapability>,
    coder: Arc<dyn CodingCapability>,
    imager: Arc<dyn ImageCapability>,
    config: PipelineConfig,
}

impl std::fmt::Debug for GenerationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationPipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl GenerationPipeline {
    /// Create a pipeline over the given capabilities
    #[must_use]
    pub fn new(
        planner: Arc<dyn PlanningCapability>,
        coder: Arc<dyn CodingCapability>,
        imager: Arc<dyn ImageCapability>,
    ) -> Self {
        Self {
            planner,
            coder,
            imager,
            config: PipelineConfig::default(),
        }
    }

    /// Set configuration
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Current configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Check that every capability has a credential
    ///
    /// # Errors
    /// [`ConfigurationError::MissingCredential`] if any does not.
    pub fn ensure_configured(&self) -> Result<(), ConfigurationError> {
        if self.planner.is_configured() && self.coder.is_configured() && self.imager.is_configured() {
            Ok(())
        } else {
            Err(ConfigurationError::MissingCredential)
        }
    }

    /// Run one turn
    ///
    /// Fails before any backend call when a credential is missing.
    ///
    /// # Errors
    /// - `PipelineError::Configuration` if a capability is not configured
    /// - `PipelineError::Capability` if planning or coding fails
    pub async fn run(
        &self,
        instruction: Instruction,
        status: &dyn StatusSink,
    ) -> Result<Generation, PipelineError> {
        let mut notes = TurnNotes::default();
        let mut state = PipelineState::Idle(instruction);

        while !state.stage().is_terminal() {
            let from = state.stage();
            let next = self.step(state, status, &mut notes).await;
            tracing::debug!("Pipeline {} -> {}", from, next.stage());
            state = advance(from, next);
        }

        let document = state.into_result().map_err(|error| {
            tracing::error!("Generation failed: {}", error);
            error
        })?;
        Ok(Generation {
            document,
            fallback_plan: notes.fallback_plan,
            images_synthesized: notes.images_synthesized,
            image_failures: notes.image_failures,
        })
    }

    /// Execute one stage
    async fn step(
        &self,
        state: PipelineState,
        status: &dyn StatusSink,
        notes: &mut TurnNotes,
    ) -> PipelineState {
        match state {
            PipelineState::Idle(instruction) => match self.ensure_configured() {
                Ok(()) => {
                    status.report(STATUS_PLANNING);
                    PipelineState::Planning(instruction)
                }
                Err(error) => PipelineState::Error(error.into()),
            },
            PipelineState::Planning(instruction) => match self.plan(&instruction).await {
                Ok(plan) => {
                    notes.fallback_plan = plan.is_fallback();
                    status.report(STATUS_CODING);
                    PipelineState::Coding { instruction, plan }
                }
                Err(error) => PipelineState::Error(error.into()),
            },
            PipelineState::Coding { instruction, plan } => {
                match self.code(&instruction, &plan).await {
                    Ok(document) => {
                        status.report(STATUS_SCANNING_IMAGES);
                        PipelineState::FillingAssets(document)
                    }
                    Err(error) => PipelineState::Error(error.into()),
                }
            }
            PipelineState::FillingAssets(document) => {
                let report = fill_assets(
                    &document,
                    self.imager.as_ref(),
                    self.config.image_permits(),
                    status,
                )
                .await;
                notes.images_synthesized = report.synthesized;
                notes.image_failures = report.failures;
                status.report(STATUS_FINALIZING);
                PipelineState::Done(report.document)
            }
            terminal @ (PipelineState::Done(_) | PipelineState::Error(_)) => terminal,
        }
    }

    async fn plan(&self, instruction: &Instruction) -> Result<Plan, CapabilityError> {
        let context = planning_context(instruction);
        tracing::info!("Planning request ({})", context);
        let response = self
            .planner
            .plan(PLANNER_DIRECTIVE, &instruction.text, &context)
            .await?;
        let plan = Plan::from_response(response);
        if plan.is_fallback() {
            tracing::warn!("Planner returned nothing, using fallback plan");
        }
        Ok(plan)
    }

    async fn code(&self, instruction: &Instruction, plan: &Plan) -> Result<Document, CapabilityError> {
        let directive = coder_directive(instruction, plan);
        tracing::info!("Generating markup");
        let raw = self.coder.generate(&directive, CODER_USER_TURN).await?;

        let document = Document::from_generated(&raw);
        if document.is_empty() {
            return Err(CapabilityError::EmptyResponse {
                capability: Capability::Coding,
            });
        }
        tracing::info!(
            "Generated document {} ({} bytes, {} boxes)",
            document.hash().short(),
            document.len(),
            document.boxes().len()
        );
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{MockCodingCapability, MockImageCapability, MockPlanningCapability};
    use crate::status::{status_generating_images, StatusLog};
    use pretty_assertions::assert_eq;

    fn planner(response: Option<&'static str>) -> MockPlanningCapability {
        let mut planner = MockPlanningCapability::new();
        planner.expect_is_configured().return_const(true);
        planner
            .expect_plan()
            .times(1)
            .returning(move |_, _, _| Ok(response.map(str::to_string)));
        planner
    }

    fn coder(markup: &'static str) -> MockCodingCapability {
        let mut coder = MockCodingCapability::new();
        coder.expect_is_configured().return_const(true);
        coder
            .expect_generate()
            .times(1)
            .returning(move |_, _| Ok(markup.to_string()));
        coder
    }

    fn imager(calls: usize) -> MockImageCapability {
        let mut imager = MockImageCapability::new();
        imager.expect_is_configured().return_const(true);
        imager
            .expect_synthesize()
            .times(calls)
            .returning(|prompt| Ok(format!("data:image/png;base64,{}", prompt.len())));
        imager
    }

    fn pipeline(
        planner: MockPlanningCapability,
        coder: MockCodingCapability,
        imager: MockImageCapability,
    ) -> GenerationPipeline {
        GenerationPipeline::new(Arc::new(planner), Arc::new(coder), Arc::new(imager))
    }

    #[tokio::test]
    async fn full_turn_reports_every_stage() {
        let pipeline = pipeline(
            planner(Some("{\"sections\":[\"hero\"]}")),
            coder("```html\n<section><h1>Hi</h1><img data-image-prompt=\"hero shot\"></section>\n```"),
            imager(1),
        );
        let status = StatusLog::new();

        let generation = pipeline.run(Instruction::new("a site"), &status).await.unwrap();

        assert!(generation.document.check_box_numbering().is_ok());
        assert!(generation.document.placeholders().is_empty());
        assert_eq!(generation.images_synthesized, 1);
        assert!(!generation.fallback_plan);
        assert_eq!(
            status.lines(),
            vec![
                STATUS_PLANNING.to_string(),
                STATUS_CODING.to_string(),
                STATUS_SCANNING_IMAGES.to_string(),
                status_generating_images(1),
                STATUS_FINALIZING.to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn empty_plan_uses_fallback() {
        let mut coder = MockCodingCapability::new();
        coder.expect_is_configured().return_const(true);
        coder
            .expect_generate()
            .withf(|directive, turn| directive.contains(crate::types::FALLBACK_PLAN) && turn.contains(CODER_USER_TURN))
            .times(1)
            .returning(|_, _| Ok("<p>ok</p>".into()));

        let pipeline = pipeline(planner(Some("   ")), coder, imager(0));
        let generation = pipeline.run(Instruction::new("x"), &StatusLog::new()).await.unwrap();
        assert!(generation.fallback_plan);
    }

    #[tokio::test]
    async fn missing_credential_fails_before_any_call() {
        let mut planner = MockPlanningCapability::new();
        planner.expect_is_configured().return_const(false);
        planner.expect_plan().never();
        let mut coder = MockCodingCapability::new();
        coder.expect_is_configured().return_const(true);
        coder.expect_generate().never();
        let mut imager = MockImageCapability::new();
        imager.expect_is_configured().return_const(true);
        imager.expect_synthesize().never();

        let status = StatusLog::new();
        let err = pipeline(planner, coder, imager)
            .run(Instruction::new("x"), &status)
            .await
            .unwrap_err();

        assert_eq!(err, PipelineError::Configuration(ConfigurationError::MissingCredential));
        assert!(status.lines().is_empty());
    }

    #[tokio::test]
    async fn coder_failure_ends_turn_without_images() {
        let mut coder = MockCodingCapability::new();
        coder.expect_is_configured().return_const(true);
        coder.expect_generate().times(1).returning(|_, _| {
            Err(CapabilityError::Request {
                capability: Capability::Coding,
                message: "connection reset".into(),
            })
        });

        let err = pipeline(planner(None), coder, imager(0))
            .run(Instruction::new("x"), &StatusLog::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Capability(_)));
    }

    #[tokio::test]
    async fn blank_markup_is_a_capability_error() {
        let err = pipeline(planner(None), coder("```html\n```"), imager(0))
            .run(Instruction::new("x"), &StatusLog::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            PipelineError::Capability(CapabilityError::EmptyResponse {
                capability: Capability::Coding
            })
        );
    }

    #[tokio::test]
    async fn planner_failure_is_fatal() {
        let mut planner = MockPlanningCapability::new();
        planner.expect_is_configured().return_const(true);
        planner.expect_plan().times(1).returning(|_, _, _| {
            Err(CapabilityError::Status {
                capability: Capability::Planning,
                status: 429,
                message: "quota".into(),
            })
        });
        let mut coder = MockCodingCapability::new();
        coder.expect_is_configured().return_const(true);
        coder.expect_generate().never();

        let err = pipeline(planner, coder, imager(0))
            .run(Instruction::new("x"), &StatusLog::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Capability(e) if e.capability() == Some(Capability::Planning)));
    }
}

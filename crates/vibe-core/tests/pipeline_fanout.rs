use std::sync::Arc;
use std::time::Duration;
use vibe_core::{fallback_image_url, Instruction, PipelineError, StatusLog};
use vibe_document::Document;
use vibe_test_utils::{page_with_boxes, page_with_placeholders, pipeline_with, RecordingImager, ScriptedCoder, ScriptedPlanner};

const LATENCY: Duration = Duration::from_millis(20);

#[tokio::test]
async fn two_placeholders_issue_two_concurrent_calls() {
    let imager = Arc::new(RecordingImager::new(LATENCY));
    let coder = Arc::new(ScriptedCoder::new().then_markup(page_with_placeholders(2)));
    let pipeline = pipeline_with(Arc::new(ScriptedPlanner::new(Some("plan"))), coder, imager.clone(), 6);

    let prior = Document::from_generated(&page_with_boxes(4));
    let instruction = Instruction::new("make the hero red").with_prior(prior);
    let generation = pipeline.run(instruction, &StatusLog::new()).await.unwrap();

    assert_eq!(imager.calls(), 2);
    assert_eq!(imager.peak_in_flight(), 2);
    assert_eq!(imager.in_flight(), 0);
    assert_eq!(generation.images_synthesized, 2);
    assert!(generation.document.placeholders().is_empty());
    assert!(generation.document.check_box_numbering().is_ok());
}

#[tokio::test]
async fn fan_out_respects_the_concurrency_bound() {
    let imager = Arc::new(RecordingImager::new(LATENCY));
    let coder = Arc::new(ScriptedCoder::new().then_markup(page_with_placeholders(7)));
    let pipeline = pipeline_with(Arc::new(ScriptedPlanner::new(None)), coder, imager.clone(), 3);

    let generation = pipeline.run(Instruction::new("gallery"), &StatusLog::new()).await.unwrap();

    assert_eq!(imager.calls(), 7);
    assert_eq!(imager.peak_in_flight(), 3);
    assert_eq!(generation.images_synthesized, 7);
}

#[tokio::test]
async fn no_placeholders_no_image_calls() {
    let imager = Arc::new(RecordingImager::new(LATENCY));
    let coder = Arc::new(ScriptedCoder::new().then_markup(page_with_boxes(3)));
    let pipeline = pipeline_with(Arc::new(ScriptedPlanner::new(None)), coder, imager.clone(), 6);
    let status = StatusLog::new();

    pipeline.run(Instruction::new("text only"), &status).await.unwrap();

    assert_eq!(imager.calls(), 0);
    assert!(!status.lines().iter().any(|l| l.contains("Generating")));
}

#[tokio::test]
async fn failed_image_falls_back_and_turn_completes() {
    let imager = Arc::new(RecordingImager::new(LATENCY).failing_on("picture 1"));
    let coder = Arc::new(ScriptedCoder::new().then_markup(page_with_placeholders(3)));
    let pipeline = pipeline_with(Arc::new(ScriptedPlanner::new(None)), coder, imager.clone(), 6);

    let generation = pipeline.run(Instruction::new("gallery"), &StatusLog::new()).await.unwrap();

    assert_eq!(imager.calls(), 3);
    assert_eq!(generation.images_synthesized, 2);
    assert_eq!(generation.image_failures.len(), 1);
    assert!(generation
        .document
        .markup()
        .contains(&format!("src=\"{}\"", fallback_image_url("picture 1"))));
    assert!(generation.document.placeholders().is_empty());
}

#[tokio::test]
async fn unconfigured_planner_stops_before_any_call() {
    let planner = Arc::new(ScriptedPlanner::unconfigured());
    let coder = Arc::new(ScriptedCoder::new().then_markup(page_with_boxes(1)));
    let imager = Arc::new(RecordingImager::new(LATENCY));
    let pipeline = pipeline_with(planner.clone(), coder.clone(), imager.clone(), 6);

    let err = pipeline.run(Instruction::new("x"), &StatusLog::new()).await.unwrap_err();

    assert!(matches!(err, PipelineError::Configuration(_)));
    assert_eq!(planner.calls(), 0);
    assert_eq!(coder.calls(), 0);
    assert_eq!(imager.calls(), 0);
}

#[tokio::test]
async fn selection_reaches_planner_and_coder() {
    let planner = Arc::new(ScriptedPlanner::new(Some("recolor")));
    let coder = Arc::new(ScriptedCoder::new().then_markup(page_with_boxes(2)));
    let pipeline = pipeline_with(planner.clone(), coder.clone(), Arc::new(RecordingImager::new(LATENCY)), 6);

    let prior = Document::from_generated(&page_with_boxes(4));
    let instruction = Instruction::new("make it red")
        .with_prior(prior)
        .with_selection(vibe_document::BoxId::new(3));
    pipeline.run(instruction, &StatusLog::new()).await.unwrap();

    assert_eq!(planner.contexts(), vec!["Editing existing site. Selected element: Box 3"]);
    let directive = &coder.directives()[0];
    assert!(directive.contains("Selected Box: Box 3"));
    assert!(directive.contains("Plan: recolor"));
    assert!(directive.contains("data-vibe-box=\"4\""));
}

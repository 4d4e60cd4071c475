use std::sync::Arc;
use std::time::Duration;
use vibe_core::{
    EditingSession, Role, SaveState, SessionError, SiteRepository, StatusLog, TurnOutcome, APOLOGY,
    CONFIRMATION, DEFAULT_TITLE, INITIAL_HTML,
};
use vibe_document::BoxId;
use vibe_test_utils::{
    page_with_boxes, page_with_placeholders, pipeline_with, test_user, InMemoryRepository,
    RecordingImager, ScriptedCoder, ScriptedPlanner,
};

fn session_parts(coder: ScriptedCoder) -> (vibe_core::GenerationPipeline, Arc<InMemoryRepository>) {
    let pipeline = pipeline_with(
        Arc::new(ScriptedPlanner::new(Some("plan"))),
        Arc::new(coder),
        Arc::new(RecordingImager::new(Duration::from_millis(5))),
        6,
    );
    (pipeline, Arc::new(InMemoryRepository::new()))
}

#[tokio::test]
async fn new_session_autosaves_welcome_page() {
    let (pipeline, repo) = session_parts(ScriptedCoder::new());
    let session = EditingSession::start(pipeline, repo.clone(), test_user()).await;

    assert_eq!(session.document().markup(), INITIAL_HTML);
    assert_eq!(session.save_state(), SaveState::Saved);
    assert_eq!(session.title(), DEFAULT_TITLE);
    let site_id = session.site_id().unwrap();

    let versions = repo.list_versions(site_id).await.unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].sequence_number, 1);
    assert!(session.conversation().messages()[0].content.starts_with("Hi Ada!"));
}

#[tokio::test]
async fn successful_turn_replaces_document_and_saves_next_version() {
    let (pipeline, repo) = session_parts(ScriptedCoder::new().then_markup(page_with_placeholders(2)));
    let mut session = EditingSession::start(pipeline, repo.clone(), test_user()).await;
    session.select_box(BoxId::new(2).unwrap()).unwrap();

    let outcome = session.submit("make the hero red", &StatusLog::new()).await.unwrap();

    assert!(matches!(outcome, TurnOutcome::Completed { saved: true, .. }));
    assert_ne!(session.document().markup(), INITIAL_HTML);
    assert!(session.document().placeholders().is_empty());
    assert_eq!(session.selected_box(), None);
    assert_eq!(session.conversation().last().unwrap().content, CONFIRMATION);

    let versions = repo.list_versions(session.site_id().unwrap()).await.unwrap();
    assert_eq!(versions.iter().map(|v| v.sequence_number).collect::<Vec<_>>(), vec![1, 2]);
    let summary = repo.load_site(session.site_id().unwrap()).await.unwrap();
    assert_eq!(summary.site.current_version_id, Some(versions[1].id));
}

#[tokio::test]
async fn failed_turn_keeps_document_and_apologizes_once() {
    let (pipeline, repo) = session_parts(ScriptedCoder::new().then_fail("backend down"));
    let mut session = EditingSession::start(pipeline, repo.clone(), test_user()).await;
    session.select_box(BoxId::new(3).unwrap()).unwrap();
    let before = session.document().clone();
    let messages_before = session.conversation().len();

    let outcome = session.submit("add a gallery", &StatusLog::new()).await.unwrap();

    assert!(matches!(outcome, TurnOutcome::Failed(_)));
    assert_eq!(session.document().markup().as_bytes(), before.markup().as_bytes());
    assert_eq!(session.selected_box(), BoxId::new(3));
    assert_eq!(session.save_state(), SaveState::Saved);
    assert_eq!(session.conversation().len(), messages_before + 2);
    let apologies = session
        .conversation()
        .by_role(Role::Assistant)
        .filter(|m| m.content == APOLOGY)
        .count();
    assert_eq!(apologies, 1);
    assert_eq!(repo.version_count(), 1);
}

#[tokio::test]
async fn save_failure_surfaces_as_error_until_next_success() {
    let coder = ScriptedCoder::new()
        .then_markup(page_with_boxes(2))
        .then_markup(page_with_boxes(3));
    let (pipeline, repo) = session_parts(coder);
    let mut session = EditingSession::start(pipeline, repo.clone(), test_user()).await;

    repo.set_fail_writes(true);
    let outcome = session.submit("first", &StatusLog::new()).await.unwrap();
    assert!(matches!(outcome, TurnOutcome::Completed { saved: false, .. }));
    assert_eq!(session.save_state(), SaveState::Error);
    assert_eq!(session.document().boxes().len(), 2);

    repo.set_fail_writes(false);
    session.submit("second", &StatusLog::new()).await.unwrap();
    assert_eq!(session.save_state(), SaveState::Saved);
    assert!(session.save_tracker().last_error().is_none());
}

#[tokio::test]
async fn title_commit_renames_without_new_version() {
    let (pipeline, repo) = session_parts(ScriptedCoder::new());
    let mut session = EditingSession::start(pipeline, repo.clone(), test_user()).await;

    let state = session.commit_title("  Bakery  ").await;

    assert_eq!(state, SaveState::Saved);
    assert_eq!(session.title(), "Bakery");
    assert_eq!(repo.version_count(), 1);
    let summary = repo.load_site(session.site_id().unwrap()).await.unwrap();
    assert_eq!(summary.site.title, "Bakery");
}

#[tokio::test]
async fn unsaved_session_saves_on_title_commit() {
    let (pipeline, repo) = session_parts(ScriptedCoder::new());
    repo.set_fail_writes(true);
    let mut session = EditingSession::start(pipeline, repo.clone(), test_user()).await;
    assert_eq!(session.save_state(), SaveState::Error);
    assert_eq!(session.site_id(), None);

    repo.set_fail_writes(false);
    assert_eq!(session.commit_title("Shop").await, SaveState::Saved);
    assert!(session.site_id().is_some());
    assert_eq!(repo.site_count(), 1);
}

#[tokio::test]
async fn selecting_missing_box_is_rejected() {
    let (pipeline, repo) = session_parts(ScriptedCoder::new());
    let mut session = EditingSession::start(pipeline, repo, test_user()).await;

    assert_eq!(session.select_box(BoxId::new(4).unwrap()).unwrap(), "Change Box 4 to ");
    let missing = BoxId::new(9).unwrap();
    assert_eq!(session.select_box(missing), Err(SessionError::UnknownBox(missing)));
    assert_eq!(session.selected_box(), BoxId::new(4));
}

#[tokio::test]
async fn blank_instruction_is_refused_without_logging() {
    let (pipeline, repo) = session_parts(ScriptedCoder::new());
    let mut session = EditingSession::start(pipeline, repo, test_user()).await;
    let before = session.conversation().len();

    let err = session.submit("   ", &StatusLog::new()).await.unwrap_err();

    assert_eq!(err, SessionError::EmptyInstruction);
    assert_eq!(session.conversation().len(), before);
}

#[tokio::test]
async fn reopening_loads_current_version() {
    let (pipeline, repo) = session_parts(ScriptedCoder::new().then_markup(page_with_boxes(5)));
    let user = test_user();
    let mut first = EditingSession::start(pipeline.clone(), repo.clone(), user.clone()).await;
    first.commit_title("Portfolio").await;
    first.submit("portfolio", &StatusLog::new()).await.unwrap();
    let site_id = first.site_id().unwrap();

    let reopened = EditingSession::reopen(pipeline, repo, user, site_id).await.unwrap();

    assert_eq!(reopened.document(), first.document());
    assert_eq!(reopened.title(), "Portfolio");
    assert_eq!(reopened.save_state(), SaveState::Saved);
    assert_eq!(
        reopened.conversation().messages()[0].content,
        "Welcome back! I've loaded Portfolio. What would you like to change?"
    );
}

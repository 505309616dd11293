//! Integration tests for ComposeSession
//!
//! Drives whole composition sessions against the mock remote and a
//! file-backed store.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use libtootcast::remote::mock::{MockApi, MockAuthorizer};
use libtootcast::scheduling::format_schedule;
use libtootcast::service::draft::DraftUpdate;
use libtootcast::service::events::{Event, PublishPhase};
use libtootcast::service::publish::{PUBLISHED_TITLE, OPEN_PUBLISHED_STATUS_LABEL};
use libtootcast::service::ui::{RecordingNavigator, RecordingNotifier, ToastStyle, UiCommand};
use libtootcast::service::{Collaborators, ComposeSession};
use libtootcast::store::FileStore;
use libtootcast::{Config, ContentType, RemoteFailure, TootcastError, Visibility};
use tempfile::TempDir;

struct TestSession {
    session: ComposeSession,
    api: MockApi,
    notifier: RecordingNotifier,
    navigator: RecordingNavigator,
    dir: TempDir,
}

fn test_config() -> Config {
    let mut config = Config::default_config();
    config.compose.navigation_delay_ms = 20;
    config
}

fn store_path(dir: &TempDir) -> PathBuf {
    dir.path().join("store.json")
}

async fn open_session(api: MockApi, dir: TempDir) -> TestSession {
    let notifier = RecordingNotifier::new();
    let navigator = RecordingNavigator::new();
    let store = Arc::new(FileStore::open(store_path(&dir)).unwrap());

    let session = ComposeSession::with_collaborators(
        &test_config(),
        Collaborators {
            api: Arc::new(api.clone()),
            authorizer: Arc::new(MockAuthorizer::resolving("alice", "akkoma.example")),
            store,
            notifier: Arc::new(notifier.clone()),
            navigator: Arc::new(navigator.clone()),
        },
    )
    .await;

    TestSession {
        session,
        api,
        notifier,
        navigator,
        dir,
    }
}

async fn setup(api: MockApi) -> TestSession {
    open_session(api, TempDir::new().unwrap()).await
}

fn attachment(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, b"not really an image").unwrap();
    path
}

#[tokio::test]
async fn test_empty_draft_makes_no_remote_calls() {
    let mut t = setup(MockApi::success()).await;

    let err = t.session.submit().await.unwrap_err();

    assert!(matches!(err, TootcastError::Validation(_)));
    assert_eq!(err.exit_code(), 3);
    assert_eq!(t.api.total_calls(), 0);
    assert!(t.session.display().last_published.is_none());
}

#[tokio::test]
async fn test_text_only_publish() {
    let mut t = setup(MockApi::success()).await;
    t.session.update(DraftUpdate::status("Hello fediverse"));

    let status = t.session.submit().await.unwrap();

    assert_eq!(t.api.upload_call_count(), 0);
    let requests = t.api.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].status, "Hello fediverse");
    assert!(requests[0].media_ids.is_empty());
    assert!(status.url.is_some());
    assert_eq!(t.notifier.last().unwrap().title, PUBLISHED_TITLE);
}

#[tokio::test]
async fn test_attachment_ids_follow_input_order() {
    let dir = TempDir::new().unwrap();
    let files = vec![
        attachment(&dir, "a.png"),
        attachment(&dir, "b.png"),
        attachment(&dir, "c.png"),
    ];
    let api = MockApi::success()
        .with_upload_delay("a.png", Duration::from_millis(60))
        .with_upload_delay("b.png", Duration::from_millis(5))
        .with_upload_delay("c.png", Duration::from_millis(120));
    let mut t = open_session(api, dir).await;

    t.session.update(DraftUpdate::files(files.clone()));
    t.session.update(DraftUpdate {
        description: Some(Some("three squares".to_string())),
        ..Default::default()
    });
    t.session.submit().await.unwrap();

    assert_eq!(
        t.api.completion_order(),
        vec![files[1].clone(), files[0].clone(), files[2].clone()]
    );
    let expected: Vec<String> = files.iter().map(|f| MockApi::media_id_for(f)).collect();
    assert_eq!(t.api.requests()[0].media_ids, expected);

    let uploads = t.api.uploads();
    let described: Vec<_> = uploads.iter().filter(|(_, d)| d.is_some()).collect();
    assert_eq!(described.len(), 1);
    assert_eq!(described[0].0, files[0]);
}

#[tokio::test]
async fn test_success_updates_cache_and_resets_text() {
    let mut t = setup(MockApi::success()).await;
    t.session.update(DraftUpdate::visibility(Visibility::Private));
    t.session.update(DraftUpdate::markdown(false));
    t.session.update(DraftUpdate::sensitive(true));
    t.session.update(DraftUpdate::spoiler_text("long thread"));
    t.session.update(DraftUpdate::status("1/12"));

    let status = t.session.submit().await.unwrap();
    t.session.shutdown();

    let draft = t.session.draft();
    assert!(draft.status.is_empty());
    assert!(draft.spoiler_text.is_empty());
    assert_eq!(draft.visibility, Visibility::Private);
    assert_eq!(draft.content_type, ContentType::Plain);

    let display = t.session.display();
    assert_eq!(display.last_published.as_ref(), Some(&status));
    assert_eq!(display.open_action_label, OPEN_PUBLISHED_STATUS_LABEL);

    // A fresh session on the same store sees exactly this status
    let dir = t.dir;
    let next = open_session(MockApi::success(), dir).await;
    assert_eq!(next.session.display().last_published, Some(status));
    assert!(next.session.draft().status.is_empty());
    assert_eq!(next.session.draft().visibility, Visibility::Private);
}

#[tokio::test]
async fn test_failure_leaves_cache_and_draft_untouched() {
    let dir = TempDir::new().unwrap();
    let file = attachment(&dir, "photo.jpg");

    // Seed the cache with a first successful publish
    let mut first = open_session(MockApi::success(), dir).await;
    first.session.update(DraftUpdate::status("first"));
    let cached = first.session.submit().await.unwrap();
    first.session.shutdown();

    let api = MockApi::success().with_upload_failure(
        "photo.jpg",
        RemoteFailure::http(413, Some("File is too large".to_string())),
    );
    let mut t = open_session(api, first.dir).await;
    t.session.update(DraftUpdate::status("second"));
    t.session.update(DraftUpdate::files(vec![file]));
    let before = t.session.draft().clone();
    let stored_before = std::fs::read(store_path(&t.dir)).unwrap();

    let err = t.session.submit().await.unwrap_err();

    assert!(matches!(err, TootcastError::Upload { .. }));
    assert_eq!(t.api.publish_call_count(), 0);
    assert_eq!(t.session.draft(), &before);
    assert_eq!(t.session.display().last_published, Some(cached));
    // Nothing was written to disk by the failed submit
    assert_eq!(std::fs::read(store_path(&t.dir)).unwrap(), stored_before);
    assert_eq!(t.session.phase(), PublishPhase::Idle);

    let toast = t.notifier.last().unwrap();
    assert_eq!(toast.style, ToastStyle::Failure);
    assert_eq!(toast.title, "Error");
    assert_eq!(toast.message.as_deref(), Some("File is too large"));
}

#[tokio::test]
async fn test_retry_after_failure_succeeds_without_reentering() {
    let mut t = setup(MockApi::publish_failure(503, Some("Try again later"))).await;
    t.session.update(DraftUpdate::status("persistent"));
    assert!(t.session.submit().await.is_err());

    // Same draft, fresh collaborators on the same store
    let mut retry = open_session(MockApi::success(), t.dir).await;
    assert_eq!(retry.session.draft().status, "persistent");
    retry.session.submit().await.unwrap();
    assert_eq!(retry.api.requests()[0].status, "persistent");
}

#[tokio::test]
async fn test_scheduled_publish_message() {
    let mut t = setup(MockApi::success()).await;
    let scheduled_at = chrono::Utc::now() + chrono::Duration::days(1);
    t.session.update(DraftUpdate::status("tomorrow's news"));
    t.session.update(DraftUpdate {
        scheduled_at: Some(Some(scheduled_at)),
        ..Default::default()
    });

    let status = t.session.submit().await.unwrap();

    assert!(status.scheduled);
    let title = t.notifier.last().unwrap().title;
    assert!(title.contains(&format_schedule(&scheduled_at)));
    assert_ne!(title, PUBLISHED_TITLE);
    assert!(t.session.draft().scheduled_at.is_none());
}

#[tokio::test]
async fn test_content_warning_toggle_round_trip() {
    let mut t = setup(MockApi::success()).await;

    let shown = t.session.update(DraftUpdate::sensitive(true));
    assert_eq!(
        shown,
        vec![UiCommand::ShowContentWarning, UiCommand::FocusContentWarning]
    );
    t.session.update(DraftUpdate::spoiler_text("eye contact"));

    let hidden = t.session.update(DraftUpdate::sensitive(false));
    assert_eq!(hidden, vec![UiCommand::HideContentWarning]);
    assert!(!t.session.drafts().content_warning_visible());
    assert_eq!(t.session.draft().spoiler_text, "eye contact");
}

#[tokio::test]
async fn test_navigation_returns_to_root_once() {
    let mut t = setup(MockApi::success()).await;
    let mut events = t.session.subscribe();
    t.session.update(DraftUpdate::status("bye"));

    t.session.submit().await.unwrap();
    assert_eq!(t.navigator.call_count(), 0);
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(t.navigator.call_count(), 1);
    assert_eq!(t.session.phase(), PublishPhase::Idle);

    let mut saw_published = false;
    let mut last_phase = None;
    while let Ok(event) = events.try_recv() {
        match event {
            Event::StatusPublished { .. } => saw_published = true,
            Event::PhaseChanged { phase } => last_phase = Some(phase),
            _ => {}
        }
    }
    assert!(saw_published);
    assert_eq!(last_phase, Some(PublishPhase::Idle));
}

#[tokio::test]
async fn test_unauthorized_publish_maps_to_auth_exit_code() {
    let mut t = setup(MockApi::publish_failure(401, Some("The access token is invalid"))).await;
    t.session.update(DraftUpdate::status("hello"));

    let err = t.session.submit().await.unwrap_err();
    assert_eq!(err.exit_code(), 2);
    assert_eq!(err.user_message(), "The access token is invalid");
}

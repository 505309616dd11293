//! Service layer for Tootcast
//!
//! Business logic of one composition session, independent of how it is
//! presented. [`ComposeSession`] is the entry point and coordinates the
//! specialized services:
//!
//! - `AuthBootstrap`: credential check and account identity at start
//! - `DraftStore`: the editable draft and its sticky preferences
//! - `PublishCoordinator`: validation, uploads, publish and its side effects
//! - `LastPublishedCache`: the most recent successful publish
//! - `EventBus`: progress event distribution
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use libtootcast::service::ComposeSession;
//! use libtootcast::service::draft::DraftUpdate;
//! use libtootcast::service::ui::{RecordingNavigator, RecordingNotifier};
//! use libtootcast::Config;
//!
//! # async fn example() -> libtootcast::Result<()> {
//! let config = Config::load()?;
//! let mut session = ComposeSession::start(
//!     &config,
//!     Arc::new(RecordingNotifier::new()),
//!     Arc::new(RecordingNavigator::new()),
//! )
//! .await?;
//!
//! session.update(DraftUpdate::status("Hello fediverse!"));
//! let status = session.submit().await?;
//! println!("Published {:?}", status.url);
//! session.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod cache;
pub mod draft;
pub mod events;
pub mod publish;
pub mod ui;
pub mod upload;

use std::sync::Arc;

use tracing::info;

use self::auth::AuthBootstrap;
use self::cache::LastPublishedCache;
use self::draft::{DraftStore, DraftUpdate};
use self::events::{EventBus, EventReceiver, PublishPhase};
use self::publish::{PublishCoordinator, PublishSettings, SessionDisplay};
use self::ui::{Navigator, Notifier, UiCommand};
use crate::remote::mastodon::{MastodonApi, MegalodonAuthorizer};
use crate::remote::{Authorizer, StatusApi};
use crate::store::{FileStore, KeyValueStore};
use crate::types::{Draft, PublishedStatus};
use crate::{Config, Result};

/// Collaborators of a session
///
/// [`ComposeSession::start`] builds the real ones from the configuration;
/// tests pass mocks to [`ComposeSession::with_collaborators`].
#[derive(Clone)]
pub struct Collaborators {
    pub api: Arc<dyn StatusApi>,
    pub authorizer: Arc<dyn Authorizer>,
    pub store: Arc<dyn KeyValueStore>,
    pub notifier: Arc<dyn Notifier>,
    pub navigator: Arc<dyn Navigator>,
}

/// One composition session
///
/// Owns the draft and the coordinator, applies the draft reset after a
/// successful publish, and cancels the pending navigation on shutdown.
pub struct ComposeSession {
    drafts: DraftStore,
    coordinator: PublishCoordinator,
    events: EventBus,
}

impl ComposeSession {
    /// Start a session against the configured instance and store
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be read, the HTTP clients cannot
    /// be built, or the store file is unusable.
    pub async fn start(
        config: &Config,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(config.storage_path())?);
        let collaborators = Collaborators {
            api: Arc::new(MastodonApi::from_config(config)?),
            authorizer: Arc::new(MegalodonAuthorizer::from_config(config)?),
            store,
            notifier,
            navigator,
        };
        Ok(Self::with_collaborators(config, collaborators).await)
    }

    /// Start a session with the given collaborators
    pub async fn with_collaborators(config: &Config, collaborators: Collaborators) -> Self {
        let Collaborators {
            api,
            authorizer,
            store,
            notifier,
            navigator,
        } = collaborators;

        let account = AuthBootstrap::new(authorizer, store.clone())
            .ensure_ready()
            .await;
        let cache = LastPublishedCache::new(store.clone());
        let who = if account.is_empty() {
            "an unresolved account".to_string()
        } else {
            account.fqn()
        };
        info!("Compose session started for {}", who);
        let session_display =
            SessionDisplay::new(account, cache.get(), config.instance_home_url());

        let events = EventBus::new(100);
        let coordinator = PublishCoordinator::new(
            api,
            cache,
            notifier,
            navigator,
            PublishSettings::from_config(config),
            events.clone(),
            session_display,
        );
        let drafts = DraftStore::load(store, config.compose.default_visibility);

        Self {
            drafts,
            coordinator,
            events,
        }
    }

    pub fn draft(&self) -> &Draft {
        self.drafts.draft()
    }

    pub fn drafts(&self) -> &DraftStore {
        &self.drafts
    }

    pub fn update(&mut self, update: DraftUpdate) -> Vec<UiCommand> {
        self.drafts.update(update)
    }

    /// Publish the current draft
    ///
    /// On success the status text and content warning are cleared; on
    /// failure the draft is left for a retry.
    pub async fn submit(&mut self) -> Result<PublishedStatus> {
        let draft = self.drafts.draft().clone();
        let status = self.coordinator.submit(&draft).await?;
        self.drafts.clear_after_publish();
        Ok(status)
    }

    pub fn display(&self) -> &SessionDisplay {
        self.coordinator.display()
    }

    pub fn phase(&self) -> PublishPhase {
        self.coordinator.phase()
    }

    pub fn has_pending_navigation(&self) -> bool {
        self.coordinator.has_pending_navigation()
    }

    /// Subscribe to progress events
    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    /// End the session, cancelling the pending navigation
    pub fn shutdown(&mut self) {
        self.coordinator.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::mock::{MockApi, MockAuthorizer};
    use crate::service::ui::{RecordingNavigator, RecordingNotifier};
    use crate::store::{keys, KeyValueStoreExt, MemoryStore};
    use crate::types::{ContentType, Visibility};

    fn collaborators(api: MockApi, store: Arc<MemoryStore>) -> Collaborators {
        Collaborators {
            api: Arc::new(api),
            authorizer: Arc::new(MockAuthorizer::resolving("alice", "akkoma.example")),
            store,
            notifier: Arc::new(RecordingNotifier::new()),
            navigator: Arc::new(RecordingNavigator::new()),
        }
    }

    #[tokio::test]
    async fn test_start_resolves_account_and_seeds_display() {
        let store = Arc::new(MemoryStore::new());
        store
            .set_json(
                keys::LATEST_PUBLISHED_STATUS,
                &PublishedStatus::from_response(
                    serde_json::json!({ "id": "1", "url": "https://akkoma.example/notice/1" }),
                    false,
                )
                .unwrap(),
            )
            .unwrap();

        let session = ComposeSession::with_collaborators(
            &Config::default_config(),
            collaborators(MockApi::success(), store),
        )
        .await;

        let display = session.display();
        assert_eq!(display.account.fqn(), "alice@akkoma.example");
        assert_eq!(
            display.open_action_url(),
            Some("https://akkoma.example/notice/1")
        );
        assert_eq!(
            display.instance_home_url,
            "https://akkoma.example/main/friends/"
        );
        assert_eq!(session.phase(), PublishPhase::Idle);
    }

    #[tokio::test]
    async fn test_submit_clears_text_but_keeps_preferences() {
        let store = Arc::new(MemoryStore::new());
        let mut session = ComposeSession::with_collaborators(
            &Config::default_config(),
            collaborators(MockApi::success(), store),
        )
        .await;

        session.update(DraftUpdate::visibility(Visibility::Unlisted));
        session.update(DraftUpdate::markdown(false));
        session.update(DraftUpdate::sensitive(true));
        session.update(DraftUpdate::spoiler_text("cw"));
        session.update(DraftUpdate::status("hello"));

        session.submit().await.unwrap();
        session.shutdown();

        let draft = session.draft();
        assert!(draft.status.is_empty());
        assert!(draft.spoiler_text.is_empty());
        assert_eq!(draft.visibility, Visibility::Unlisted);
        assert_eq!(draft.content_type, ContentType::Plain);
        assert!(draft.sensitive);
    }

    #[tokio::test]
    async fn test_failed_submit_keeps_draft() {
        let store = Arc::new(MemoryStore::new());
        let mut session = ComposeSession::with_collaborators(
            &Config::default_config(),
            collaborators(MockApi::publish_failure(500, None), store),
        )
        .await;
        session.update(DraftUpdate::status("keep me"));
        let before = session.draft().clone();

        assert!(session.submit().await.is_err());
        assert_eq!(session.draft(), &before);
    }
}

//! The submit workflow
//!
//! [`PublishCoordinator::submit`] moves a draft through
//! `Idle → Validating → (UploadingAttachments) → Publishing → Succeeded | Failed`.
//! Validation never touches the network. Once the status is out, the cache
//! and display state are updated and a [`NavigationTask`] returns the view to
//! its root after a short delay. Any failure produces a single "Error" toast
//! and leaves the draft and cache as they were.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::cache::LastPublishedCache;
use super::events::{Event, EventBus, PublishPhase};
use super::ui::{Navigator, Notifier, Toast, ToastStyle};
use super::upload::AttachmentUploader;
use crate::config::Config;
use crate::error::{RemoteFailure, Result, TootcastError};
use crate::remote::StatusApi;
use crate::scheduling::format_schedule;
use crate::types::{AccountIdentity, Draft, PublishedStatus, StatusRequest};

pub const PUBLISHING_TITLE: &str = "Publishing to the Fediverse ...";
pub const PUBLISHED_TITLE: &str = "Status has been published";
pub const FAILURE_TITLE: &str = "Error";

/// Label of the open action while it points at a status from an earlier session
pub const OPEN_LAST_STATUS_LABEL: &str = "Open the last published status";
/// Label of the open action once this session has published
pub const OPEN_PUBLISHED_STATUS_LABEL: &str = "Open the status in Browser";

/// Success toast title for a scheduled status
pub fn scheduled_title(scheduled_at: &chrono::DateTime<Utc>) -> String {
    format!("Status has been scheduled for {}", format_schedule(scheduled_at))
}

/// Limits and timings applied by the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishSettings {
    pub max_attachments: usize,
    pub max_characters: Option<usize>,
    pub max_in_flight: usize,
    pub navigation_delay: Duration,
}

impl PublishSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attachments: config.compose.max_attachments,
            max_characters: config.compose.max_characters,
            max_in_flight: config.upload.max_in_flight,
            navigation_delay: Duration::from_millis(config.compose.navigation_delay_ms),
        }
    }
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self::from_config(&Config::default_config())
    }
}

/// What the compose view shows around the form
#[derive(Debug, Clone, PartialEq)]
pub struct SessionDisplay {
    pub account: AccountIdentity,
    pub last_published: Option<PublishedStatus>,
    pub open_action_label: String,
    pub instance_home_url: String,
}

impl SessionDisplay {
    pub fn new(
        account: AccountIdentity,
        last_published: Option<PublishedStatus>,
        instance_home_url: impl Into<String>,
    ) -> Self {
        Self {
            account,
            last_published,
            open_action_label: OPEN_LAST_STATUS_LABEL.to_string(),
            instance_home_url: instance_home_url.into(),
        }
    }

    /// URL behind the open action, when there is a status to open
    pub fn open_action_url(&self) -> Option<&str> {
        self.last_published.as_ref()?.url.as_deref()
    }
}

/// Delayed `return_to_root` after a successful publish
///
/// Aborted when dropped or cancelled before the delay elapses.
pub struct NavigationTask {
    handle: JoinHandle<()>,
}

impl NavigationTask {
    fn spawn(
        delay: Duration,
        navigator: Arc<dyn Navigator>,
        phase: Arc<Mutex<PublishPhase>>,
        events: EventBus,
    ) -> Self {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            navigator.return_to_root();

            let mut phase = phase.lock().unwrap_or_else(|e| e.into_inner());
            if *phase == PublishPhase::Succeeded {
                *phase = PublishPhase::Idle;
                events.emit(Event::PhaseChanged {
                    phase: PublishPhase::Idle,
                });
            }
        });
        Self { handle }
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for NavigationTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub struct PublishCoordinator {
    api: Arc<dyn StatusApi>,
    uploader: AttachmentUploader,
    cache: LastPublishedCache,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    settings: PublishSettings,
    events: EventBus,
    phase: Arc<Mutex<PublishPhase>>,
    display: SessionDisplay,
    navigation: Option<NavigationTask>,
}

impl PublishCoordinator {
    pub fn new(
        api: Arc<dyn StatusApi>,
        cache: LastPublishedCache,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
        settings: PublishSettings,
        events: EventBus,
        display: SessionDisplay,
    ) -> Self {
        let uploader = AttachmentUploader::new(api.clone(), settings.max_in_flight, events.clone());
        Self {
            api,
            uploader,
            cache,
            notifier,
            navigator,
            settings,
            events,
            phase: Arc::new(Mutex::new(PublishPhase::Idle)),
            display,
            navigation: None,
        }
    }

    pub fn phase(&self) -> PublishPhase {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn display(&self) -> &SessionDisplay {
        &self.display
    }

    /// True while a delayed navigation is waiting to run
    pub fn has_pending_navigation(&self) -> bool {
        self.navigation
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Publish `draft`
    ///
    /// The draft itself is never modified here; resetting it after success
    /// is up to the caller.
    ///
    /// # Errors
    ///
    /// Returns the validation, upload or publish error that aborted the
    /// submit, after it has been reported through the notifier.
    pub async fn submit(&mut self, draft: &Draft) -> Result<PublishedStatus> {
        // A new submit supersedes a navigation still pending from the last one
        if let Some(task) = self.navigation.take() {
            task.cancel();
        }

        match self.run(draft).await {
            Ok(status) => {
                self.complete(draft, &status);
                Ok(status)
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Cancel the pending navigation, if any
    pub fn shutdown(&mut self) {
        if let Some(task) = self.navigation.take() {
            debug!("Cancelling pending navigation");
            task.cancel();
        }
    }

    async fn run(&self, draft: &Draft) -> Result<PublishedStatus> {
        self.set_phase(PublishPhase::Validating);
        self.validate(draft)?;

        self.notifier
            .notify(Toast::new(ToastStyle::Animated, PUBLISHING_TITLE));

        let media_ids = if draft.files.is_empty() {
            Vec::new()
        } else {
            self.set_phase(PublishPhase::UploadingAttachments);
            self.uploader
                .upload_all(&draft.files, draft.description.as_deref())
                .await?
                .into_iter()
                .map(|handle| handle.id)
                .collect()
        };

        self.set_phase(PublishPhase::Publishing);
        let request = StatusRequest::from_draft(draft, media_ids);
        info!(
            "Publishing {} status with {} attachment(s)",
            request.visibility,
            request.media_ids.len()
        );

        let raw = self
            .api
            .create_status(&request)
            .await
            .map_err(TootcastError::Publish)?;

        PublishedStatus::from_response(raw, draft.scheduled_at.is_some()).ok_or_else(|| {
            TootcastError::Publish(RemoteFailure::transport(
                "Server response did not include a status id",
            ))
        })
    }

    fn validate(&self, draft: &Draft) -> Result<()> {
        if !draft.has_content() {
            return Err(TootcastError::Validation(
                "Nothing to publish: write a status or attach a file".to_string(),
            ));
        }

        if draft.files.len() > self.settings.max_attachments {
            return Err(TootcastError::Validation(format!(
                "Too many attachments: {} (at most {})",
                draft.files.len(),
                self.settings.max_attachments
            )));
        }

        if let Some(missing) = draft.files.iter().find(|file| !file.is_file()) {
            return Err(TootcastError::Validation(format!(
                "Attachment not found: {}",
                missing.display()
            )));
        }

        if let Some(max) = self.settings.max_characters {
            let length = draft.status.chars().count();
            if length > max {
                return Err(TootcastError::Validation(format!(
                    "Status is {} characters long, the limit is {}",
                    length, max
                )));
            }
        }

        if let Some(scheduled_at) = draft.scheduled_at {
            if scheduled_at <= Utc::now() {
                return Err(TootcastError::Validation(
                    "Scheduled time must be in the future".to_string(),
                ));
            }
        }

        Ok(())
    }

    fn complete(&mut self, draft: &Draft, status: &PublishedStatus) {
        let title = match &draft.scheduled_at {
            Some(scheduled_at) => scheduled_title(scheduled_at),
            None => PUBLISHED_TITLE.to_string(),
        };
        self.notifier.notify(Toast::new(ToastStyle::Success, title));

        if let Err(e) = self.cache.set(status) {
            warn!("Published, but caching the status failed: {}", e);
        }
        self.display.last_published = Some(status.clone());
        self.display.open_action_label = OPEN_PUBLISHED_STATUS_LABEL.to_string();

        self.events.emit(Event::StatusPublished {
            id: status.id.clone(),
            url: status.url.clone(),
            scheduled: status.scheduled,
        });
        self.set_phase(PublishPhase::Succeeded);

        self.navigation = Some(NavigationTask::spawn(
            self.settings.navigation_delay,
            self.navigator.clone(),
            self.phase.clone(),
            self.events.clone(),
        ));
    }

    fn fail(&self, error: &TootcastError) {
        warn!("Submit failed: {}", error);
        self.set_phase(PublishPhase::Failed);

        let message = error.user_message();
        self.events.emit(Event::PublishFailed {
            error: message.clone(),
        });
        self.notifier
            .notify(Toast::new(ToastStyle::Failure, FAILURE_TITLE).with_message(message));

        self.set_phase(PublishPhase::Idle);
    }

    fn set_phase(&self, next: PublishPhase) {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner()) = next;
        self.events.emit(Event::PhaseChanged { phase: next });
    }
}

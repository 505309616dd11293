//! Draft state for one composition session
//!
//! [`DraftStore`] owns the [`Draft`] and applies partial updates to it. The
//! merge itself is the pure function [`merge`]; the store adds persistence
//! on top:
//!
//! - `visibility`, `content_type` and `sensitive` are sticky preferences,
//!   each saved under its own key and used as the next session's default
//! - `status` and `spoiler_text` are saved for draft recovery and dropped
//!   after a successful publish
//! - attachments, their description and the schedule live for the session
//!   only

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::ui::UiCommand;
use crate::store::{keys, KeyValueStore, KeyValueStoreExt};
use crate::types::{ContentType, Draft, Visibility};

/// Partial update of a draft; `None` leaves a field as it is
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftUpdate {
    pub status: Option<String>,
    pub spoiler_text: Option<String>,
    pub sensitive: Option<bool>,
    pub visibility: Option<Visibility>,
    pub content_type: Option<ContentType>,
    pub scheduled_at: Option<Option<DateTime<Utc>>>,
    pub files: Option<Vec<PathBuf>>,
    pub description: Option<Option<String>>,
}

impl DraftUpdate {
    pub fn status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..Default::default()
        }
    }

    pub fn spoiler_text(spoiler_text: impl Into<String>) -> Self {
        Self {
            spoiler_text: Some(spoiler_text.into()),
            ..Default::default()
        }
    }

    pub fn sensitive(sensitive: bool) -> Self {
        Self {
            sensitive: Some(sensitive),
            ..Default::default()
        }
    }

    pub fn visibility(visibility: Visibility) -> Self {
        Self {
            visibility: Some(visibility),
            ..Default::default()
        }
    }

    pub fn markdown(markdown: bool) -> Self {
        Self {
            content_type: Some(ContentType::from_markdown(markdown)),
            ..Default::default()
        }
    }

    pub fn files(files: Vec<PathBuf>) -> Self {
        Self {
            files: Some(files),
            ..Default::default()
        }
    }
}

/// The part of a draft kept for recovery on relaunch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct DraftValues {
    status: String,
    spoiler_text: String,
}

/// Merge `update` into `draft` (last writer wins per field)
///
/// Turning `sensitive` on reveals the content-warning field and moves focus
/// to it; turning it off hides the field and keeps its text.
pub fn merge(mut draft: Draft, update: DraftUpdate) -> (Draft, Vec<UiCommand>) {
    let mut commands = Vec::new();

    if let Some(sensitive) = update.sensitive {
        match (draft.sensitive, sensitive) {
            (false, true) => {
                commands.push(UiCommand::ShowContentWarning);
                commands.push(UiCommand::FocusContentWarning);
            }
            (true, false) => commands.push(UiCommand::HideContentWarning),
            _ => {}
        }
        draft.sensitive = sensitive;
    }
    if let Some(status) = update.status {
        draft.status = status;
    }
    if let Some(spoiler_text) = update.spoiler_text {
        draft.spoiler_text = spoiler_text;
    }
    if let Some(visibility) = update.visibility {
        draft.visibility = visibility;
    }
    if let Some(content_type) = update.content_type {
        draft.content_type = content_type;
    }
    if let Some(scheduled_at) = update.scheduled_at {
        draft.scheduled_at = scheduled_at;
    }
    if let Some(files) = update.files {
        draft.files = files;
    }
    if let Some(description) = update.description {
        draft.description = description;
    }

    (draft, commands)
}

pub struct DraftStore {
    draft: Draft,
    store: Arc<dyn KeyValueStore>,
}

impl DraftStore {
    /// Restore sticky preferences and any recovered draft text from `store`
    pub fn load(store: Arc<dyn KeyValueStore>, default_visibility: Visibility) -> Self {
        let visibility =
            read_or_default(store.as_ref(), keys::PREF_VISIBILITY).unwrap_or(default_visibility);
        let markdown = read_or_default(store.as_ref(), keys::PREF_MARKDOWN).unwrap_or(true);
        let sensitive = read_or_default(store.as_ref(), keys::PREF_SENSITIVE).unwrap_or(false);
        let values: DraftValues =
            read_or_default(store.as_ref(), keys::DRAFT_VALUES).unwrap_or_default();

        let draft = Draft {
            status: values.status,
            spoiler_text: values.spoiler_text,
            sensitive,
            visibility,
            content_type: ContentType::from_markdown(markdown),
            ..Default::default()
        };

        Self { draft, store }
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    /// The content-warning field is shown while the draft is sensitive
    pub fn content_warning_visible(&self) -> bool {
        self.draft.sensitive
    }

    /// Apply a partial update and persist what changed
    ///
    /// Returns the commands the view should carry out.
    pub fn update(&mut self, update: DraftUpdate) -> Vec<UiCommand> {
        let before = self.draft.clone();
        let (draft, commands) = merge(std::mem::take(&mut self.draft), update);
        self.draft = draft;
        self.persist_changes(&before);
        commands
    }

    /// Reset after a successful publish
    ///
    /// Clears the text fields and the session-only attachment and schedule
    /// fields; sticky preferences stay as they are.
    pub fn clear_after_publish(&mut self) {
        self.draft.status.clear();
        self.draft.spoiler_text.clear();
        self.draft.files.clear();
        self.draft.description = None;
        self.draft.scheduled_at = None;

        if let Err(e) = self.store.remove(keys::DRAFT_VALUES) {
            warn!("Failed to clear recovered draft: {}", e);
        }
    }

    fn persist_changes(&self, before: &Draft) {
        let draft = &self.draft;

        if draft.visibility != before.visibility {
            self.persist(keys::PREF_VISIBILITY, &draft.visibility);
        }
        if draft.content_type != before.content_type {
            self.persist(keys::PREF_MARKDOWN, &draft.content_type.is_markdown());
        }
        if draft.sensitive != before.sensitive {
            self.persist(keys::PREF_SENSITIVE, &draft.sensitive);
        }
        if draft.status != before.status || draft.spoiler_text != before.spoiler_text {
            let values = DraftValues {
                status: draft.status.clone(),
                spoiler_text: draft.spoiler_text.clone(),
            };
            self.persist(keys::DRAFT_VALUES, &values);
        }
    }

    fn persist<T: Serialize>(&self, key: &str, value: &T) {
        if let Err(e) = self.store.set_json(key, value) {
            warn!("Failed to persist {}: {}", key, e);
        }
    }
}

/// Read a stored value, treating unreadable entries as absent
fn read_or_default<T: serde::de::DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Option<T> {
    store.get_json(key).unwrap_or_else(|e| {
        warn!("Ignoring unreadable value for {}: {}", key, e);
        None
    })
}

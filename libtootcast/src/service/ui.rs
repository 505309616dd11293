//! Presentation-layer collaborators
//!
//! The workflow never renders anything itself. It hands toasts to a
//! [`Notifier`], asks a [`Navigator`] to leave the compose view, and returns
//! [`UiCommand`]s from draft updates for the view to act on.

use std::sync::{Arc, Mutex};

/// Severity of a toast
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastStyle {
    /// Work in progress
    Animated,
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub style: ToastStyle,
    pub title: String,
    pub message: Option<String>,
}

impl Toast {
    pub fn new(style: ToastStyle, title: impl Into<String>) -> Self {
        Self {
            style,
            title: title.into(),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Fire-and-forget notification surface
pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);
}

/// Navigation control of the host UI
pub trait Navigator: Send + Sync {
    fn return_to_root(&self);
}

/// Commands for the view, emitted by draft updates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiCommand {
    ShowContentWarning,
    /// Move input focus to the content-warning field
    FocusContentWarning,
    HideContentWarning,
}

/// Notifier that keeps every toast, for tests and headless sessions
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    toasts: Arc<Mutex<Vec<Toast>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn last(&self) -> Option<Toast> {
        self.toasts().pop()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, toast: Toast) {
        self.toasts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(toast);
    }
}

/// Navigator that counts `return_to_root` calls
#[derive(Debug, Clone, Default)]
pub struct RecordingNavigator {
    calls: Arc<Mutex<usize>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Navigator for RecordingNavigator {
    fn return_to_root(&self) {
        *self.calls.lock().unwrap_or_else(|e| e.into_inner()) += 1;
    }
}

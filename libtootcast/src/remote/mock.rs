//! Mock remote collaborators for testing
//!
//! [`MockApi`] can simulate per-file upload latency (to force out-of-order
//! completion), upload and publish failures, and records every call so tests
//! can assert on what reached the "server". [`MockAuthorizer`] plays the
//! credential check.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use crate::error::{RemoteFailure, Result, TootcastError};
use crate::remote::{Authorizer, StatusApi};
use crate::types::{AccountIdentity, MediaHandle, StatusRequest};

/// Configuration for mock API behavior
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Upload latency per file name
    pub upload_delays: HashMap<String, Duration>,

    /// Upload failures per file name
    pub upload_failures: HashMap<String, RemoteFailure>,

    /// Failure returned by create_status
    pub publish_failure: Option<RemoteFailure>,

    /// Delay before create_status answers
    pub publish_delay: Duration,
}

#[derive(Debug, Default)]
struct Recorded {
    uploads: Vec<(PathBuf, Option<String>)>,
    completed_uploads: Vec<PathBuf>,
    requests: Vec<StatusRequest>,
    in_flight: usize,
    max_in_flight: usize,
}

/// Mock [`StatusApi`]
///
/// Clones share the recorded state, so a test can keep one handle while the
/// coordinator owns another.
#[derive(Debug, Clone, Default)]
pub struct MockApi {
    config: MockConfig,
    recorded: Arc<Mutex<Recorded>>,
}

impl MockApi {
    pub fn new(config: MockConfig) -> Self {
        Self {
            config,
            recorded: Arc::new(Mutex::new(Recorded::default())),
        }
    }

    /// Mock where every call succeeds immediately
    pub fn success() -> Self {
        Self::new(MockConfig::default())
    }

    /// Mock whose create_status fails with the given payload message
    pub fn publish_failure(status: u16, server_message: Option<&str>) -> Self {
        Self::new(MockConfig {
            publish_failure: Some(RemoteFailure::http(
                status,
                server_message.map(str::to_string),
            )),
            ..Default::default()
        })
    }

    /// Add upload latency for a file name
    pub fn with_upload_delay(mut self, file_name: &str, delay: Duration) -> Self {
        self.config
            .upload_delays
            .insert(file_name.to_string(), delay);
        self
    }

    /// Make the upload of a file name fail
    pub fn with_upload_failure(mut self, file_name: &str, failure: RemoteFailure) -> Self {
        self.config
            .upload_failures
            .insert(file_name.to_string(), failure);
        self
    }

    /// Hold every create_status call for a while before answering
    pub fn with_publish_delay(mut self, delay: Duration) -> Self {
        self.config.publish_delay = delay;
        self
    }

    /// Media id the mock assigns to a file
    pub fn media_id_for(file: &Path) -> String {
        format!("media-{}", file_name(file))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of upload calls made
    pub fn upload_call_count(&self) -> usize {
        self.lock().uploads.len()
    }

    /// Upload calls as (file, description) in dispatch order
    pub fn uploads(&self) -> Vec<(PathBuf, Option<String>)> {
        self.lock().uploads.clone()
    }

    /// Files in the order their uploads finished
    pub fn completion_order(&self) -> Vec<PathBuf> {
        self.lock().completed_uploads.clone()
    }

    /// Highest number of uploads observed running at once
    pub fn max_concurrent_uploads(&self) -> usize {
        self.lock().max_in_flight
    }

    /// Number of create_status calls made
    pub fn publish_call_count(&self) -> usize {
        self.lock().requests.len()
    }

    /// Every create_status request received
    pub fn requests(&self) -> Vec<StatusRequest> {
        self.lock().requests.clone()
    }

    /// Total calls of any kind
    pub fn total_calls(&self) -> usize {
        let recorded = self.lock();
        recorded.uploads.len() + recorded.requests.len()
    }
}

fn file_name(file: &Path) -> String {
    file.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[async_trait]
impl StatusApi for MockApi {
    async fn upload_attachment(
        &self,
        file: &Path,
        description: Option<&str>,
    ) -> std::result::Result<MediaHandle, RemoteFailure> {
        let name = file_name(file);
        {
            let mut recorded = self.lock();
            recorded
                .uploads
                .push((file.to_path_buf(), description.map(str::to_string)));
            recorded.in_flight += 1;
            recorded.max_in_flight = recorded.max_in_flight.max(recorded.in_flight);
        }

        if let Some(delay) = self.config.upload_delays.get(&name) {
            sleep(*delay).await;
        }

        let mut recorded = self.lock();
        recorded.in_flight -= 1;

        if let Some(failure) = self.config.upload_failures.get(&name) {
            return Err(failure.clone());
        }

        recorded.completed_uploads.push(file.to_path_buf());
        Ok(MediaHandle {
            id: Self::media_id_for(file),
        })
    }

    async fn create_status(
        &self,
        request: &StatusRequest,
    ) -> std::result::Result<serde_json::Value, RemoteFailure> {
        self.lock().requests.push(request.clone());

        if !self.config.publish_delay.is_zero() {
            sleep(self.config.publish_delay).await;
        }

        if let Some(failure) = &self.config.publish_failure {
            return Err(failure.clone());
        }

        let id = uuid::Uuid::new_v4().simple().to_string();
        let response = match request.scheduled_at {
            Some(scheduled_at) => serde_json::json!({
                "id": id,
                "scheduled_at": scheduled_at,
                "params": { "text": request.status, "visibility": request.visibility },
                "media_attachments": [],
            }),
            None => serde_json::json!({
                "id": id,
                "url": format!("https://mock.example/notice/{}", id),
                "created_at": "2024-01-01T00:00:00.000Z",
                "content": request.status,
                "visibility": request.visibility,
                "spoiler_text": request.spoiler_text.clone().unwrap_or_default(),
                "sensitive": request.sensitive,
                "media_attachments": request
                    .media_ids
                    .iter()
                    .map(|id| serde_json::json!({ "id": id }))
                    .collect::<Vec<_>>(),
            }),
        };
        Ok(response)
    }
}

/// Mock [`Authorizer`]
#[derive(Debug, Clone)]
pub struct MockAuthorizer {
    identity: Option<AccountIdentity>,
    error: Option<String>,
    calls: Arc<Mutex<usize>>,
}

impl MockAuthorizer {
    /// Authorizer that resolves the given identity
    pub fn resolving(username: &str, host: &str) -> Self {
        Self {
            identity: Some(AccountIdentity::new(username, host)),
            error: None,
            calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Authorizer that succeeds without resolving an identity
    pub fn silent() -> Self {
        Self {
            identity: None,
            error: None,
            calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Authorizer that always fails
    pub fn failing(error: &str) -> Self {
        Self {
            identity: None,
            error: Some(error.to_string()),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Authorizer for MockAuthorizer {
    async fn authorize(&self) -> Result<Option<AccountIdentity>> {
        *self.calls.lock().unwrap_or_else(|e| e.into_inner()) += 1;

        match &self.error {
            Some(error) => Err(TootcastError::Auth(error.clone())),
            None => Ok(self.identity.clone()),
        }
    }
}

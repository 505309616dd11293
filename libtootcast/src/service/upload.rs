//! Bounded-concurrency attachment uploads

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info};

use super::events::{Event, EventBus};
use crate::error::{RemoteFailure, Result, TootcastError};
use crate::remote::StatusApi;
use crate::types::MediaHandle;

/// Turns local files into server-side media handles
pub struct AttachmentUploader {
    api: Arc<dyn StatusApi>,
    max_in_flight: usize,
    events: EventBus,
}

impl AttachmentUploader {
    pub fn new(api: Arc<dyn StatusApi>, max_in_flight: usize, events: EventBus) -> Self {
        Self {
            api,
            max_in_flight: max_in_flight.max(1),
            events,
        }
    }

    /// Upload every file, returning handles in input order
    ///
    /// At most `max_in_flight` uploads run at once and they may finish in any
    /// order. The description goes with the first file only. The first
    /// failure aborts the batch; media already uploaded stays on the server.
    pub async fn upload_all(
        &self,
        files: &[PathBuf],
        description: Option<&str>,
    ) -> Result<Vec<MediaHandle>> {
        if files.is_empty() {
            return Ok(Vec::new());
        }

        info!(
            "Uploading {} attachment(s), {} at a time",
            files.len(),
            self.max_in_flight
        );

        let mut uploads = stream::iter(files.iter().enumerate())
            .map(|(index, file)| {
                let description = if index == 0 { description } else { None };
                async move { (index, file, self.upload_one(file, description).await) }
            })
            .buffer_unordered(self.max_in_flight);

        let mut handles: Vec<Option<MediaHandle>> = vec![None; files.len()];
        while let Some((index, file, result)) = uploads.next().await {
            let handle = result.map_err(|failure| TootcastError::Upload {
                file: file.display().to_string(),
                failure,
            })?;

            debug!("Uploaded {} as media {}", file.display(), handle.id);
            self.events.emit(Event::AttachmentUploaded {
                index,
                file: file.display().to_string(),
                media_id: handle.id.clone(),
            });
            handles[index] = Some(handle);
        }

        Ok(handles.into_iter().flatten().collect())
    }

    async fn upload_one(
        &self,
        file: &Path,
        description: Option<&str>,
    ) -> std::result::Result<MediaHandle, RemoteFailure> {
        self.api.upload_attachment(file, description).await
    }
}

//! Single-slot cache of the last published status

use std::sync::Arc;

use tracing::warn;

use crate::store::{keys, KeyValueStore, KeyValueStoreExt};
use crate::types::PublishedStatus;
use crate::Result;

/// Holds the most recent successful publish response
///
/// Every `set` overwrites the slot; failed attempts never reach it.
#[derive(Clone)]
pub struct LastPublishedCache {
    store: Arc<dyn KeyValueStore>,
}

impl LastPublishedCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Cached status, or `None` when empty or unreadable
    pub fn get(&self) -> Option<PublishedStatus> {
        match self
            .store
            .get_json::<PublishedStatus>(keys::LATEST_PUBLISHED_STATUS)
        {
            Ok(status) => status,
            Err(e) => {
                warn!("Ignoring unreadable cached status: {}", e);
                None
            }
        }
    }

    pub fn set(&self, status: &PublishedStatus) -> Result<()> {
        self.store
            .set_json(keys::LATEST_PUBLISHED_STATUS, status)
    }
}

//! Remote collaborators
//!
//! The composition workflow talks to the server through two seams:
//!
//! - [`StatusApi`]: media upload and status creation
//! - [`Authorizer`]: credential check and account lookup at session start
//!
//! `mastodon` holds the real implementations, `mock` configurable fakes used
//! by the integration tests.
//!
//! # Examples
//!
//! ```no_run
//! use libtootcast::remote::{mastodon::MastodonApi, StatusApi};
//! use libtootcast::types::{Draft, StatusRequest};
//! use libtootcast::Config;
//!
//! # async fn example() -> libtootcast::Result<()> {
//! let config = Config::load()?;
//! let api = MastodonApi::from_config(&config)?;
//!
//! let draft = Draft {
//!     status: "Hello, fediverse!".to_string(),
//!     ..Default::default()
//! };
//! let raw = api
//!     .create_status(&StatusRequest::from_draft(&draft, vec![]))
//!     .await
//!     .map_err(libtootcast::TootcastError::Publish)?;
//! println!("{}", raw["url"]);
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use async_trait::async_trait;

use crate::error::{RemoteFailure, Result};
use crate::types::{AccountIdentity, MediaHandle, StatusRequest};

pub mod mastodon;

// Available in all builds so integration tests can use it
pub mod mock;

/// Remote operations used while publishing
#[async_trait]
pub trait StatusApi: Send + Sync {
    /// Upload one local file, returning its server-side handle
    async fn upload_attachment(
        &self,
        file: &Path,
        description: Option<&str>,
    ) -> std::result::Result<MediaHandle, RemoteFailure>;

    /// Create (or schedule) a status, returning the raw JSON response
    async fn create_status(
        &self,
        request: &StatusRequest,
    ) -> std::result::Result<serde_json::Value, RemoteFailure>;
}

/// Provides or refreshes the credential used implicitly by [`StatusApi`]
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Check the credential
    ///
    /// Returns the account identity when the check could resolve it.
    async fn authorize(&self) -> Result<Option<AccountIdentity>>;
}

//! Tootcast - compose and publish statuses to the Fediverse
//!
//! This library holds the composition workflow for Mastodon and
//! Akkoma/Pleroma servers: draft state, attachment uploads, publishing and
//! the small amount of state kept between sessions.

pub mod config;
pub mod error;
pub mod logging;
pub mod remote;
pub mod scheduling;
pub mod service;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{RemoteFailure, Result, TootcastError};
pub use types::{AccountIdentity, ContentType, Draft, MediaHandle, PublishedStatus, Visibility};

//! Error types for Tootcast

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TootcastError>;

#[derive(Error, Debug)]
pub enum TootcastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Rejected locally before any network activity
    #[error("Invalid status: {0}")]
    Validation(String),

    /// The server rejected an attachment; the submit is aborted
    #[error("Upload of {file} failed: {failure}")]
    Upload { file: String, failure: RemoteFailure },

    /// The server rejected the create-status call
    #[error("Publishing failed: {0}")]
    Publish(RemoteFailure),

    #[error("Authorization failed: {0}")]
    Auth(String),
}

impl TootcastError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            TootcastError::Validation(_) => 3,
            TootcastError::Auth(_) => 2,
            TootcastError::Upload { failure, .. } | TootcastError::Publish(failure)
                if failure.is_authentication() =>
            {
                2
            }
            TootcastError::Upload { .. } | TootcastError::Publish(_) => 1,
            TootcastError::Config(_) => 1,
            TootcastError::Store(_) => 1,
        }
    }

    /// Human-readable text for the failure toast
    ///
    /// Remote failures prefer the message the server put in its error payload
    /// and fall back to the full error text when the payload had none.
    pub fn user_message(&self) -> String {
        match self {
            TootcastError::Validation(msg) => msg.clone(),
            TootcastError::Upload { failure, .. } | TootcastError::Publish(failure) => failure
                .server_message
                .clone()
                .unwrap_or_else(|| self.to_string()),
            _ => self.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization failed for key '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A failed call to the remote API
///
/// `server_message` carries the human-readable `error` or `message` field of
/// the JSON error payload when the server sent one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{detail}")]
pub struct RemoteFailure {
    pub status: Option<u16>,
    pub server_message: Option<String>,
    pub detail: String,
}

impl RemoteFailure {
    /// Failure that never reached an HTTP response (DNS, TLS, IO, ...)
    pub fn transport(detail: impl Into<String>) -> Self {
        Self {
            status: None,
            server_message: None,
            detail: detail.into(),
        }
    }

    /// Failure carrying an HTTP status and, optionally, the payload message
    pub fn http(status: u16, server_message: Option<String>) -> Self {
        let detail = match &server_message {
            Some(msg) => format!("HTTP {}: {}", status, msg),
            None => format!("HTTP {}", status),
        };
        Self {
            status: Some(status),
            server_message,
            detail,
        }
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self.status, Some(401) | Some(403))
    }
}

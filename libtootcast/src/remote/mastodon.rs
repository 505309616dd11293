//! Mastodon-compatible remote implementation
//!
//! [`MastodonApi`] talks to the REST API directly with reqwest so that the
//! Akkoma/Pleroma `content_type` field can be sent and the JSON error payload
//! can be read back verbatim. [`MegalodonAuthorizer`] uses megalodon to verify
//! the access token and look up the account.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use megalodon::{Megalodon, SNS};
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::config::{Config, Flavour};
use crate::error::{RemoteFailure, Result, TootcastError};
use crate::remote::{Authorizer, StatusApi};
use crate::types::{AccountIdentity, MediaHandle, StatusRequest};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// REST client for media upload and status creation
pub struct MastodonApi {
    http: reqwest::Client,

    /// Base URL without trailing slash (e.g. "https://akkoma.example")
    base_url: String,

    token: SecretString,
}

impl MastodonApi {
    /// Create a client for `base_url` authenticated with `token`
    pub fn new(base_url: String, token: SecretString) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("tootcast/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TootcastError::Auth(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Create a client from configuration, reading the token file
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.instance_url(), config.read_token()?)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl StatusApi for MastodonApi {
    async fn upload_attachment(
        &self,
        file: &Path,
        description: Option<&str>,
    ) -> std::result::Result<MediaHandle, RemoteFailure> {
        let bytes = tokio::fs::read(file).await.map_err(|e| {
            RemoteFailure::transport(format!("Failed to read {}: {}", file.display(), e))
        })?;

        let file_name = file
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("attachment")
            .to_string();
        let mime = mime_guess::from_path(file).first_or_octet_stream();

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime.essence_str())
            .map_err(|e| RemoteFailure::transport(format!("Invalid MIME type: {}", e)))?;

        let mut form = Form::new().part("file", part);
        if let Some(description) = description {
            form = form.text("description", description.to_string());
        }

        debug!("Uploading {} ({})", file.display(), mime);

        let response = self
            .http
            .post(self.endpoint("/api/v1/media"))
            .bearer_auth(self.token.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let body = read_json(response).await?;
        let id = json_id(&body)
            .ok_or_else(|| RemoteFailure::transport("Media upload response has no id"))?;

        Ok(MediaHandle { id })
    }

    async fn create_status(
        &self,
        request: &StatusRequest,
    ) -> std::result::Result<serde_json::Value, RemoteFailure> {
        let response = self
            .http
            .post(self.endpoint("/api/v1/statuses"))
            .bearer_auth(self.token.expose_secret())
            .json(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        read_json(response).await
    }
}

/// Read a JSON body, turning non-2xx responses into a [`RemoteFailure`]
async fn read_json(
    response: reqwest::Response,
) -> std::result::Result<serde_json::Value, RemoteFailure> {
    let status = response.status();
    let text = response.text().await.map_err(map_reqwest_error)?;

    if !status.is_success() {
        return Err(RemoteFailure::http(
            status.as_u16(),
            extract_server_message(&text),
        ));
    }

    serde_json::from_str(&text)
        .map_err(|e| RemoteFailure::transport(format!("Unexpected response body: {}", e)))
}

fn map_reqwest_error(error: reqwest::Error) -> RemoteFailure {
    match error.status() {
        Some(status) => RemoteFailure::http(status.as_u16(), None),
        None => RemoteFailure::transport(error.to_string()),
    }
}

/// Pull the human-readable message out of an error payload
///
/// Mastodon answers `{"error": "..."}`; some Pleroma endpoints use
/// `{"message": "..."}`.
fn extract_server_message(body: &str) -> Option<String> {
    let payload: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error", "message"]
        .iter()
        .filter_map(|field| payload.get(*field))
        .filter_map(|value| value.as_str())
        .map(str::trim)
        .find(|msg| !msg.is_empty())
        .map(str::to_string)
}

fn json_id(body: &serde_json::Value) -> Option<String> {
    match body.get("id")? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Verifies the access token with megalodon and resolves the account
pub struct MegalodonAuthorizer {
    client: Box<dyn Megalodon + Send + Sync>,
    instance_host: String,
}

impl MegalodonAuthorizer {
    pub fn new(
        flavour: Flavour,
        instance_url: String,
        instance_host: String,
        token: &SecretString,
    ) -> Result<Self> {
        let sns = match flavour {
            Flavour::Mastodon => SNS::Mastodon,
            Flavour::Pleroma => SNS::Pleroma,
        };

        let client = megalodon::generator(
            sns,
            instance_url,
            Some(token.expose_secret().to_string()),
            None,
        )
        .map_err(|e| TootcastError::Auth(format!("Failed to create client: {:?}", e)))?;

        Ok(Self {
            client,
            instance_host,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let token = config.read_token()?;
        Self::new(
            config.instance.flavour,
            config.instance_url(),
            config.instance_host()?,
            &token,
        )
    }
}

#[async_trait]
impl Authorizer for MegalodonAuthorizer {
    async fn authorize(&self) -> Result<Option<AccountIdentity>> {
        let response = self
            .client
            .verify_account_credentials()
            .await
            .map_err(|e| map_megalodon_error(&e.to_string()))?;

        let username = response.json.username;
        if username.is_empty() {
            return Ok(None);
        }

        Ok(Some(AccountIdentity::new(username, self.instance_host.clone())))
    }
}

/// Map a megalodon error message to an authorization error with a hint
fn map_megalodon_error(error_str: &str) -> TootcastError {
    match extract_http_status(error_str) {
        Some(401) | Some(403) => TootcastError::Auth(format!(
            "Access token rejected: {}. \
                Suggestion: Verify your OAuth token is valid and has not expired.",
            error_str
        )),
        Some(code) => TootcastError::Auth(format!(
            "Credential check failed with HTTP {}: {}",
            code, error_str
        )),
        None => TootcastError::Auth(format!(
            "Credential check failed: {}. \
                Suggestion: Check your network connection and instance URL.",
            error_str
        )),
    }
}

/// Find an HTTP status code in an error message ("HTTP 401", "status 403", "401:")
fn extract_http_status(error_str: &str) -> Option<u16> {
    for prefix in ["HTTP ", "status ", "code: "] {
        if let Some(pos) = error_str.find(prefix) {
            let code = error_str[pos + prefix.len()..]
                .get(0..3)
                .and_then(|code| code.parse::<u16>().ok());
            if let Some(code) = code.filter(|c| (100..=599).contains(c)) {
                return Some(code);
            }
        }
    }

    let bytes = error_str.as_bytes();
    for (i, window) in bytes.windows(4).enumerate() {
        let digits = window[..3].iter().all(u8::is_ascii_digit);
        let preceded_by_digit = i > 0 && bytes[i - 1].is_ascii_digit();
        if digits && !preceded_by_digit && (window[3] == b':' || window[3] == b' ') {
            let code = std::str::from_utf8(&window[..3])
                .ok()
                .and_then(|s| s.parse::<u16>().ok());
            if let Some(code) = code.filter(|c| (100..=599).contains(c)) {
                return Some(code);
            }
        }
    }

    None
}

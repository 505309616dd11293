//! Core types for Tootcast

use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Audience scope of a status
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Unlisted,
    /// Followers only
    Private,
    Direct,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Unlisted => "unlisted",
            Self::Private => "private",
            Self::Direct => "direct",
        }
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "public" => Ok(Self::Public),
            "unlisted" => Ok(Self::Unlisted),
            "private" | "followers" => Ok(Self::Private),
            "direct" => Ok(Self::Direct),
            _ => Err(format!(
                "Invalid visibility: '{}'. Valid options: public, unlisted, private, direct",
                s
            )),
        }
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the server should interpret the status text
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Markdown,
    Plain,
}

impl ContentType {
    pub fn from_markdown(markdown: bool) -> Self {
        if markdown {
            Self::Markdown
        } else {
            Self::Plain
        }
    }

    pub fn is_markdown(&self) -> bool {
        matches!(self, Self::Markdown)
    }

    /// MIME string sent as `content_type`
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Markdown => "text/markdown",
            Self::Plain => "text/plain",
        }
    }
}

/// The user-editable fields of one composition session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub status: String,
    pub spoiler_text: String,
    pub sensitive: bool,
    pub visibility: Visibility,
    pub content_type: ContentType,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub files: Vec<PathBuf>,
    /// Alt text for the first attachment
    pub description: Option<String>,
}

impl Draft {
    /// True when there is something to publish
    pub fn has_content(&self) -> bool {
        !self.status.trim().is_empty() || !self.files.is_empty()
    }
}

/// Server-side identifier of an uploaded attachment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaHandle {
    pub id: String,
}

/// Body of the create-status call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRequest {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spoiler_text: Option<String>,
    pub visibility: Visibility,
    pub sensitive: bool,
    pub content_type: String,
    pub media_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl StatusRequest {
    /// Assemble the request from a draft and the media ids resolved for its files
    ///
    /// The content warning is only sent while the sensitive toggle is on; a
    /// hidden CW field keeps its text locally but is not submitted.
    pub fn from_draft(draft: &Draft, media_ids: Vec<String>) -> Self {
        let spoiler_text = if draft.sensitive && !draft.spoiler_text.is_empty() {
            Some(draft.spoiler_text.clone())
        } else {
            None
        };

        Self {
            status: draft.status.clone(),
            spoiler_text,
            visibility: draft.visibility,
            sensitive: draft.sensitive,
            content_type: draft.content_type.mime().to_string(),
            media_ids,
            scheduled_at: draft.scheduled_at,
        }
    }
}

/// A successful create-status response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedStatus {
    pub id: String,
    /// Absent for scheduled statuses
    pub url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub scheduled: bool,
    pub raw: serde_json::Value,
}

impl PublishedStatus {
    /// Build from the raw JSON body returned by the server
    ///
    /// Returns `None` when the body carries no `id`.
    pub fn from_response(raw: serde_json::Value, scheduled: bool) -> Option<Self> {
        let id = match raw.get("id")? {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            _ => return None,
        };
        let url = raw
            .get("url")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let created_at = raw
            .get("created_at")
            .and_then(|v| v.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Some(Self {
            id,
            url,
            created_at,
            scheduled,
            raw,
        })
    }
}

/// Display identity of the active account
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountIdentity {
    pub username: String,
    pub instance_host: String,
}

impl AccountIdentity {
    pub fn new(username: impl Into<String>, instance_host: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            instance_host: instance_host.into(),
        }
    }

    /// Parse `user@host` (a leading `@` is tolerated)
    pub fn parse_fqn(fqn: &str) -> Option<Self> {
        let (username, host) = fqn.trim().trim_start_matches('@').split_once('@')?;
        if username.is_empty() || host.is_empty() {
            return None;
        }
        Some(Self::new(username, host))
    }

    pub fn is_empty(&self) -> bool {
        self.username.is_empty() || self.instance_host.is_empty()
    }

    /// `user@host`, or an empty string for an unresolved identity
    pub fn fqn(&self) -> String {
        if self.is_empty() {
            String::new()
        } else {
            format!("{}@{}", self.username, self.instance_host)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_from_str() {
        assert_eq!("public".parse::<Visibility>().unwrap(), Visibility::Public);
        assert_eq!("Unlisted".parse::<Visibility>().unwrap(), Visibility::Unlisted);
        assert_eq!("followers".parse::<Visibility>().unwrap(), Visibility::Private);
        assert_eq!("DIRECT".parse::<Visibility>().unwrap(), Visibility::Direct);
        assert!("everyone".parse::<Visibility>().is_err());
    }

    #[test]
    fn test_content_type_mime() {
        assert_eq!(ContentType::from_markdown(true).mime(), "text/markdown");
        assert_eq!(ContentType::from_markdown(false).mime(), "text/plain");
    }

    #[test]
    fn test_draft_has_content() {
        let mut draft = Draft::default();
        assert!(!draft.has_content());

        draft.status = "   \n".to_string();
        assert!(!draft.has_content());

        draft.files.push(PathBuf::from("cat.png"));
        assert!(draft.has_content());

        draft.files.clear();
        draft.status = "hello".to_string();
        assert!(draft.has_content());
    }

    #[test]
    fn test_status_request_omits_hidden_content_warning() {
        let draft = Draft {
            status: "spoilers ahead".to_string(),
            spoiler_text: "movie plot".to_string(),
            sensitive: false,
            ..Default::default()
        };

        let request = StatusRequest::from_draft(&draft, vec![]);
        assert_eq!(request.spoiler_text, None);
        assert!(!request.sensitive);

        let request = StatusRequest::from_draft(
            &Draft {
                sensitive: true,
                ..draft
            },
            vec![],
        );
        assert_eq!(request.spoiler_text.as_deref(), Some("movie plot"));
        assert!(request.sensitive);
    }

    #[test]
    fn test_status_request_serialization() {
        let scheduled_at = DateTime::parse_from_rfc3339("2030-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        let draft = Draft {
            status: "hello".to_string(),
            visibility: Visibility::Unlisted,
            content_type: ContentType::Plain,
            scheduled_at: Some(scheduled_at),
            ..Default::default()
        };

        let json = serde_json::to_value(StatusRequest::from_draft(&draft, vec!["7".to_string()]))
            .unwrap();
        assert_eq!(json["visibility"], "unlisted");
        assert_eq!(json["content_type"], "text/plain");
        assert_eq!(json["media_ids"], serde_json::json!(["7"]));
        assert_eq!(json["scheduled_at"], "2030-01-02T03:04:05Z");
        assert!(json.get("spoiler_text").is_none());
    }

    #[test]
    fn test_published_status_from_response() {
        let raw = serde_json::json!({
            "id": "AbC123",
            "url": "https://akkoma.example/notice/AbC123",
            "created_at": "2024-05-01T12:00:00.000Z",
            "content": "<p>hello</p>"
        });

        let status = PublishedStatus::from_response(raw.clone(), false).unwrap();
        assert_eq!(status.id, "AbC123");
        assert_eq!(status.url.as_deref(), Some("https://akkoma.example/notice/AbC123"));
        assert!(status.created_at.is_some());
        assert!(!status.scheduled);
        assert_eq!(status.raw, raw);
    }

    #[test]
    fn test_published_status_scheduled_has_no_url() {
        let raw = serde_json::json!({ "id": 42, "scheduled_at": "2030-01-01T00:00:00Z" });
        let status = PublishedStatus::from_response(raw, true).unwrap();
        assert_eq!(status.id, "42");
        assert_eq!(status.url, None);
        assert!(status.scheduled);

        assert!(PublishedStatus::from_response(serde_json::json!({}), false).is_none());
    }

    #[test]
    fn test_account_identity_fqn() {
        let identity = AccountIdentity::parse_fqn("@alice@akkoma.example").unwrap();
        assert_eq!(identity.username, "alice");
        assert_eq!(identity.instance_host, "akkoma.example");
        assert_eq!(identity.fqn(), "alice@akkoma.example");

        assert!(AccountIdentity::parse_fqn("alice").is_none());
        assert!(AccountIdentity::parse_fqn("@host").is_none());
        assert_eq!(AccountIdentity::default().fqn(), "");
    }
}

//! Moltbook REST client and the posting tools built on it.
//!
//! Two endpoints: `POST /posts` and `POST /posts/{id}/comments`, both
//! authenticated with a bearer token. Requests are sent once; there is no
//! retry.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use moltclaw_core::config::MoltbookConfig;

use crate::{Tool, ToolContext, ToolOutput};

#[derive(Debug, thiserror::Error)]
pub enum MoltbookError {
    #[error("missing Moltbook API key (set MOLTBOOK_API_KEY or moltbook.api_key)")]
    MissingCredential,

    #[error("invalid Moltbook base URL: {0}")]
    InvalidUrl(String),

    #[error("Moltbook returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Moltbook request failed: {0}")]
    Request(#[from] reqwest::Error),
}

impl MoltbookError {
    /// HTTP status for a non-success response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct NewPost<'a> {
    submolt: &'a str,
    title: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct NewComment<'a> {
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_id: Option<&'a str>,
}

/// Client for one Moltbook account.
///
/// The API key is resolved once, when the client is built, and lives as
/// long as the client.
pub struct MoltbookClient {
    base_url: reqwest::Url,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl MoltbookClient {
    /// Build a client. A missing key is not an error here; each request
    /// checks for it before touching the network.
    pub fn new(config: &MoltbookConfig) -> Result<Self, MoltbookError> {
        let raw = config.base_url();
        let base_url = reqwest::Url::parse(&raw)
            .map_err(|e| MoltbookError::InvalidUrl(format!("{raw}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(MoltbookError::InvalidUrl(raw));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            base_url,
            api_key: config.resolve_api_key(),
            client,
        })
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// Create a post in `submolt`.
    pub async fn create_post(
        &self,
        submolt: &str,
        title: &str,
        content: &str,
    ) -> Result<serde_json::Value, MoltbookError> {
        info!(%submolt, "creating Moltbook post");
        let body = NewPost {
            submolt,
            title,
            content,
        };
        self.post_json(&["posts"], &body).await
    }

    /// Comment on a post, optionally as a reply to `parent_id`.
    pub async fn add_comment(
        &self,
        post_id: &str,
        content: &str,
        parent_id: Option<&str>,
    ) -> Result<serde_json::Value, MoltbookError> {
        info!(%post_id, parent_id = ?parent_id, "adding Moltbook comment");
        let body = NewComment {
            content,
            parent_id: parent_id.filter(|p| !p.is_empty()),
        };
        self.post_json(&["posts", post_id, "comments"], &body).await
    }

    async fn post_json<B: Serialize>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<serde_json::Value, MoltbookError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(MoltbookError::MissingCredential)?;

        let url = self.endpoint(segments)?;
        debug!(%url, "POST");

        let resp = self
            .client
            .post(url.clone())
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(%url, %status, "Moltbook request failed");
            return Err(MoltbookError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.json().await?)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<reqwest::Url, MoltbookError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| MoltbookError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

// --- Tools ---

#[derive(Deserialize)]
struct CreatePostParams {
    submolt: String,
    title: String,
    content: String,
}

pub struct CreatePostTool {
    client: Arc<MoltbookClient>,
}

impl CreatePostTool {
    pub fn new(client: Arc<MoltbookClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for CreatePostTool {
    fn name(&self) -> &str {
        "create_post"
    }

    fn description(&self) -> &str {
        "Create a Moltbook post in a submolt."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "submolt": {
                    "type": "string",
                    "description": "Submolt (community) to post in"
                },
                "title": {
                    "type": "string",
                    "description": "Post title"
                },
                "content": {
                    "type": "string",
                    "description": "Post body"
                }
            },
            "required": ["submolt", "title", "content"]
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _context: &ToolContext,
    ) -> anyhow::Result<ToolOutput> {
        let p: CreatePostParams = serde_json::from_value(params)?;
        match self.client.create_post(&p.submolt, &p.title, &p.content).await {
            Ok(resp) => ToolOutput::json(&resp),
            Err(e) => Ok(ToolOutput::error(format!("Moltbook error: {e}"))),
        }
    }
}

#[derive(Deserialize)]
struct AddCommentParams {
    post_id: String,
    content: String,
    #[serde(default)]
    parent_id: Option<String>,
}

pub struct AddCommentTool {
    client: Arc<MoltbookClient>,
}

impl AddCommentTool {
    pub fn new(client: Arc<MoltbookClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for AddCommentTool {
    fn name(&self) -> &str {
        "add_comment"
    }

    fn description(&self) -> &str {
        "Add a comment to a Moltbook post, optionally replying to another comment."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "post_id": {
                    "type": "string",
                    "description": "Post to comment on"
                },
                "content": {
                    "type": "string",
                    "description": "Comment body"
                },
                "parent_id": {
                    "type": "string",
                    "description": "Comment to reply to (optional)"
                }
            },
            "required": ["post_id", "content"]
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _context: &ToolContext,
    ) -> anyhow::Result<ToolOutput> {
        let p: AddCommentParams = serde_json::from_value(params)?;
        match self
            .client
            .add_comment(&p.post_id, &p.content, p.parent_id.as_deref())
            .await
        {
            Ok(resp) => ToolOutput::json(&resp),
            Err(e) => Ok(ToolOutput::error(format!("Moltbook error: {e}"))),
        }
    }
}

use serde_json::Value;

use crate::domain::{BlogPostPatch, NewBlogPost, PageParams};

/// One logical operation to replay against the mirror. Payloads are carried
/// opaquely; the client serializes them without inspecting their contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorOperation {
    Create { post: NewBlogPost },
    List { page: PageParams },
    Retrieve { post_id: i64 },
    Update { post_id: i64, patch: BlogPostPatch },
    Delete { post_id: i64 },
}

#[derive(Debug)]
pub enum MirrorError {
    /// Connect, timeout, or body-decode fault before a usable response.
    Transport(reqwest::Error),
    /// The mirror answered outside the 2xx range. `body` is the raw
    /// response text.
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

impl std::fmt::Display for MirrorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "mirror request failed: {e}"),
            Self::Status { status, body } => {
                write!(f, "mirror returned {status}")?;
                if !body.is_empty() {
                    write!(f, ": {body}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for MirrorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Status { .. } => None,
        }
    }
}

/// HTTP client for the mirror service. Issues exactly one request per
/// operation and keeps no state between calls: each call builds its own
/// transport session and drops it on return, success or failure.
pub struct MirrorClient {
    base_url: String,
}

impl MirrorClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn execute(&self, op: &MirrorOperation) -> Result<Option<Value>, MirrorError> {
        match op {
            MirrorOperation::Create { post } => self.create(post).await.map(Some),
            MirrorOperation::List { page } => self.list(*page).await.map(Some),
            MirrorOperation::Retrieve { post_id } => self.retrieve(*post_id).await.map(Some),
            MirrorOperation::Update { post_id, patch } => {
                self.update(*post_id, patch).await.map(Some)
            }
            MirrorOperation::Delete { post_id } => self.delete(*post_id).await.map(|()| None),
        }
    }

    async fn create(&self, post: &NewBlogPost) -> Result<Value, MirrorError> {
        let resp = self
            .session()?
            .post(format!("{}/blog", self.base_url))
            .json(post)
            .send()
            .await
            .map_err(MirrorError::Transport)?;
        let resp = success_or_status_error(resp).await?;
        resp.json().await.map_err(MirrorError::Transport)
    }

    async fn list(&self, page: PageParams) -> Result<Value, MirrorError> {
        let resp = self
            .session()?
            .get(format!("{}/blog", self.base_url))
            .query(&page)
            .send()
            .await
            .map_err(MirrorError::Transport)?;
        let resp = success_or_status_error(resp).await?;
        resp.json().await.map_err(MirrorError::Transport)
    }

    async fn retrieve(&self, post_id: i64) -> Result<Value, MirrorError> {
        let resp = self
            .session()?
            .get(format!("{}/blog/{post_id}", self.base_url))
            .send()
            .await
            .map_err(MirrorError::Transport)?;
        let resp = success_or_status_error(resp).await?;
        resp.json().await.map_err(MirrorError::Transport)
    }

    async fn update(&self, post_id: i64, patch: &BlogPostPatch) -> Result<Value, MirrorError> {
        let resp = self
            .session()?
            .patch(format!("{}/blog/{post_id}", self.base_url))
            .json(patch)
            .send()
            .await
            .map_err(MirrorError::Transport)?;
        let resp = success_or_status_error(resp).await?;
        resp.json().await.map_err(MirrorError::Transport)
    }

    /// Delete carries no payload back; success is the 2xx itself.
    async fn delete(&self, post_id: i64) -> Result<(), MirrorError> {
        let resp = self
            .session()?
            .delete(format!("{}/blog/{post_id}", self.base_url))
            .send()
            .await
            .map_err(MirrorError::Transport)?;
        success_or_status_error(resp).await?;
        Ok(())
    }

    // One session per call: no pooling, nothing held across operations.
    fn session(&self) -> Result<reqwest::Client, MirrorError> {
        reqwest::Client::builder()
            .user_agent(format!("tandem/{}", crate::version::VERSION))
            .build()
            .map_err(MirrorError::Transport)
    }
}

async fn success_or_status_error(
    resp: reqwest::Response,
) -> Result<reqwest::Response, MirrorError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(MirrorError::Status { status, body })
}

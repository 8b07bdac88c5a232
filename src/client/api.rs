//! HTTP boundary between a voting session and the idea server.
//!
//! [`IdeaApi`] is the seam the session talks through; [`HttpIdeaApi`] is the
//! reqwest implementation used against a real server.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, de::DeserializeOwned};

use super::session::ClientConfig;
use crate::models::idea::{
    GroupCreated, GroupReplaced, GroupSubmission, GroupSummary, Idea, IdeaInput, IdeaPage,
    OwnerRequest, ViewCount, VoteRequest, VoteType,
};

// ── Error ───────────────────────────────────────────────────────────

/// Client-side API error.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP {status}: {message}")]
    Server {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("network: {0}")]
    Network(#[from] reqwest::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("decode: {0}")]
    Decode(String),
}

impl ApiError {
    /// Network failures, timeouts and 5xx are worth retrying; 4xx and bad payloads are not.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Network(_) | ApiError::Timeout(_) => true,
            ApiError::Server { status, .. } => *status >= 500,
            ApiError::Decode(_) => false,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

// ── IdeaApi ─────────────────────────────────────────────────────────

/// Operations a voting session needs from the server.
#[async_trait]
pub trait IdeaApi: Send + Sync + 'static {
    async fn list_page(&self, group_id: &str, offset: usize, limit: usize)
    -> Result<IdeaPage, ApiError>;

    async fn submit_vote(&self, shareable_id: &str, vote: VoteType) -> Result<Idea, ApiError>;

    async fn undo_vote(&self, shareable_id: &str, vote: VoteType) -> Result<Idea, ApiError>;

    async fn record_view(&self, shareable_id: &str) -> Result<i64, ApiError>;
}

// ── HttpIdeaApi ─────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: String,
}

/// JSON-over-HTTP client for the `/ideas` routes.
#[derive(Clone)]
pub struct HttpIdeaApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpIdeaApi {
    /// `timeout` bounds every request end to end.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Client for `config.base_url`, bounded by `config.vote_timeout`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        Self::new(config.base_url.clone(), config.vote_timeout)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/ideas{}", self.base_url, path)
    }

    /// Parse an API response, mapping HTTP errors to `ApiError`.
    async fn parse<R: DeserializeOwned>(resp: reqwest::Response) -> Result<R, ApiError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let (code, message) = match serde_json::from_str::<ErrorEnvelope>(&body) {
                Ok(env) => (env.error.code, env.error.message),
                Err(_) => (None, body),
            };
            return Err(ApiError::Server {
                status: status.as_u16(),
                code,
                message,
            });
        }
        resp.json::<R>()
            .await
            .map_err(|e| ApiError::Decode(format!("response body: {}", e)))
    }

    /// Submit a new group of ideas.
    pub async fn create_group(
        &self,
        creator_id: &str,
        ideas: Vec<IdeaInput>,
    ) -> Result<GroupCreated, ApiError> {
        let body = GroupSubmission {
            ideas,
            creator_id: creator_id.to_string(),
        };
        let resp = self.http.post(self.url("")).json(&body).send().await?;
        Self::parse(resp).await
    }

    /// Replace every idea of an owned group.
    pub async fn replace_group(
        &self,
        group_id: &str,
        creator_id: &str,
        ideas: Vec<IdeaInput>,
    ) -> Result<GroupReplaced, ApiError> {
        let body = GroupSubmission {
            ideas,
            creator_id: creator_id.to_string(),
        };
        let resp = self
            .http
            .put(self.url(&format!("/group/{group_id}")))
            .json(&body)
            .send()
            .await?;
        Self::parse(resp).await
    }

    /// Delete an owned group.
    pub async fn delete_group(&self, group_id: &str, creator_id: &str) -> Result<(), ApiError> {
        let body = OwnerRequest {
            creator_id: creator_id.to_string(),
        };
        let resp = self
            .http
            .delete(self.url(&format!("/group/{group_id}")))
            .json(&body)
            .send()
            .await?;
        Self::parse::<serde_json::Value>(resp).await.map(|_| ())
    }

    pub async fn get_idea(&self, shareable_id: &str) -> Result<Idea, ApiError> {
        let resp = self.http.get(self.url(&format!("/{shareable_id}"))).send().await?;
        Self::parse(resp).await
    }

    pub async fn creator_groups(&self, creator_id: &str) -> Result<Vec<GroupSummary>, ApiError> {
        let resp = self
            .http
            .get(self.url(&format!("/creator/{creator_id}")))
            .send()
            .await?;
        Self::parse(resp).await
    }
}

#[async_trait]
impl IdeaApi for HttpIdeaApi {
    async fn list_page(
        &self,
        group_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<IdeaPage, ApiError> {
        let resp = self
            .http
            .get(self.url(&format!("/group/{group_id}")))
            .query(&[("offset", offset), ("limit", limit)])
            .send()
            .await?;
        Self::parse(resp).await
    }

    async fn submit_vote(&self, shareable_id: &str, vote: VoteType) -> Result<Idea, ApiError> {
        let resp = self
            .http
            .post(self.url(&format!("/{shareable_id}/vote")))
            .json(&VoteRequest { vote })
            .send()
            .await?;
        Self::parse(resp).await
    }

    async fn undo_vote(&self, shareable_id: &str, vote: VoteType) -> Result<Idea, ApiError> {
        let resp = self
            .http
            .post(self.url(&format!("/{shareable_id}/vote/undo")))
            .json(&VoteRequest { vote })
            .send()
            .await?;
        Self::parse(resp).await
    }

    async fn record_view(&self, shareable_id: &str) -> Result<i64, ApiError> {
        let resp = self
            .http
            .post(self.url(&format!("/{shareable_id}/view")))
            .send()
            .await?;
        Self::parse::<ViewCount>(resp).await.map(|v| v.views)
    }
}

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tracing::{debug, warn};

use crate::api::{ChatQuery, ChatReply};
use crate::core::birth::BirthDetails;
use crate::core::constants::SESSION_HEADER;
use crate::core::session::SessionId;
use crate::utils::url::construct_api_url;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// The operations the chat page and the CLI need from the astrology backend.
#[async_trait]
pub trait AstrologyBackend: Send + Sync {
    /// Submit birth details; returns the backend's chart summary as text.
    async fn submit_kundli(
        &self,
        session: &SessionId,
        details: &BirthDetails,
    ) -> Result<String, ApiError>;

    async fn chat(&self, session: &SessionId, query: &str) -> Result<String, ApiError>;

    /// Cold-start warm-up.
    async fn ping(&self, session: &SessionId) -> Result<(), ApiError>;
}

#[derive(Clone, Debug)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn read_success(response: reqwest::Response) -> Result<String, ApiError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            warn!(status = status.as_u16(), %body, "backend returned an error");
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl AstrologyBackend for BackendClient {
    async fn submit_kundli(
        &self,
        session: &SessionId,
        details: &BirthDetails,
    ) -> Result<String, ApiError> {
        let url = construct_api_url(&self.base_url, "kundli");
        debug!(%url, session = %session, "submitting birth details");
        let response = self
            .client
            .post(url)
            .header(SESSION_HEADER, session.as_str())
            .json(details)
            .send()
            .await?;
        let body = Self::read_success(response).await?;
        Ok(normalize_kundli_reply(&body))
    }

    async fn chat(&self, session: &SessionId, query: &str) -> Result<String, ApiError> {
        let url = construct_api_url(&self.base_url, "chat");
        debug!(%url, session = %session, "sending chat query");
        let response = self
            .client
            .post(url)
            .header(SESSION_HEADER, session.as_str())
            .header(CONTENT_TYPE, "application/json")
            .json(&ChatQuery {
                query: query.to_string(),
            })
            .send()
            .await?;
        let body = Self::read_success(response).await?;
        let reply: ChatReply = serde_json::from_str(&body)?;
        Ok(reply.response)
    }

    async fn ping(&self, session: &SessionId) -> Result<(), ApiError> {
        let url = construct_api_url(&self.base_url, "ping");
        let response = self
            .client
            .get(url)
            .header(SESSION_HEADER, session.as_str())
            .send()
            .await?;
        Self::read_success(response).await.map(|_| ())
    }
}

/// Flatten the shapes the kundli endpoint has been seen to return into text.
///
/// A JSON array of strings is joined with newlines, a JSON string is
/// unquoted, an object carrying `response` yields that field. Anything else,
/// including non-JSON, is returned as-is.
pub fn normalize_kundli_reply(raw: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) else {
        return raw.to_string();
    };
    match value {
        serde_json::Value::Array(items) => items
            .iter()
            .map(|item| match item {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        serde_json::Value::String(s) => s,
        serde_json::Value::Object(map) => match map.get("response") {
            Some(serde_json::Value::String(s)) => s.clone(),
            _ => raw.to_string(),
        },
        _ => raw.to_string(),
    }
}

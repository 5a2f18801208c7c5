//! Client for the HeyGen streaming avatar REST API.
//!
//! Token issuance runs server side with the account API key. The session
//! calls (`streaming.new`, `streaming.start`, `streaming.task`,
//! `streaming.stop`) authenticate with the short-lived token instead, so they
//! can be made by whoever holds the session.

use reqwest::{header::AUTHORIZATION, Client};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::ChatError;

pub const DEFAULT_HEYGEN_BASE_URL: &str = "https://api.heygen.com/";

#[derive(Debug, Error)]
pub enum HeyGenError {
    #[error("API key is missing from .env")]
    MissingApiKey,

    #[error("Failed to fetch from Heygen: {0}")]
    Upstream(String),

    #[error("Invalid response format from Heygen API")]
    InvalidResponse,

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl From<HeyGenError> for ChatError {
    fn from(value: HeyGenError) -> Self {
        match value {
            HeyGenError::MissingApiKey => ChatError::Config(value.to_string()),
            other => ChatError::Avatar(other.to_string()),
        }
    }
}

/// Envelope every HeyGen endpoint answers with.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct TokenData {
    token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionInfo {
    pub session_id: String,
    /// LiveKit room URL the media stream is published to.
    #[serde(default)]
    pub url: Option<String>,
    /// LiveKit access token for joining the room.
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewSessionRequest {
    pub quality: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<serde_json::Value>,
    pub version: String,
}

impl Default for NewSessionRequest {
    fn default() -> Self {
        Self {
            quality: "low".to_string(),
            avatar_name: None,
            voice: None,
            version: "v2".to_string(),
        }
    }
}

/// How the avatar treats the text of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum TaskType {
    /// Speak the text verbatim.
    Repeat,
    /// Let the avatar's own model answer the text.
    Chat,
}

#[derive(Clone, Debug)]
pub struct HeyGenClient {
    base_url: String,
    client: Client,
}

impl HeyGenClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            base_url,
            client: Client::new(),
        }
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.base_url, route)
    }

    /// Exchanges the account API key for a streaming session token.
    pub async fn create_token(&self, api_key: Option<&str>) -> Result<String, HeyGenError> {
        let api_key = api_key
            .filter(|key| !key.is_empty())
            .ok_or(HeyGenError::MissingApiKey)?;

        let response = self
            .client
            .post(self.url("v1/streaming.create_token"))
            .header("x-api-key", api_key)
            .json(&json!({}))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let envelope = serde_json::from_str::<Envelope<TokenData>>(&text).ok();

        if !status.is_success() {
            tracing::error!(%status, body = %text, "Heygen API error response");
            let message = envelope
                .and_then(|envelope| envelope.message)
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or(status.as_str())
                        .to_string()
                });
            return Err(HeyGenError::Upstream(message));
        }

        envelope
            .and_then(|envelope| envelope.data)
            .and_then(|data| data.token)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                tracing::error!(body = %text, "Invalid response format");
                HeyGenError::InvalidResponse
            })
    }

    async fn session_call<T>(
        &self,
        token: &str,
        route: &str,
        body: serde_json::Value,
    ) -> Result<Option<T>, HeyGenError>
    where
        T: DeserializeOwned,
    {
        tracing::debug!("Heygen Request[POST] {}", route);
        let response = self
            .client
            .post(self.url(route))
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await?;
            let message = serde_json::from_str::<Envelope<serde_json::Value>>(&text)
                .ok()
                .and_then(|envelope| envelope.message)
                .unwrap_or(text);
            return Err(HeyGenError::Upstream(message));
        }

        let envelope: Envelope<T> = response.json().await?;
        Ok(envelope.data)
    }

    pub async fn new_session(
        &self,
        token: &str,
        request: &NewSessionRequest,
    ) -> Result<SessionInfo, HeyGenError> {
        self.session_call(token, "v1/streaming.new", serde_json::to_value(request).unwrap_or_default())
            .await?
            .ok_or(HeyGenError::InvalidResponse)
    }

    pub async fn start_session(&self, token: &str, session_id: &str) -> Result<(), HeyGenError> {
        self.session_call::<serde_json::Value>(
            token,
            "v1/streaming.start",
            json!({ "session_id": session_id }),
        )
        .await?;
        Ok(())
    }

    pub async fn send_task(
        &self,
        token: &str,
        session_id: &str,
        text: &str,
        task_type: TaskType,
    ) -> Result<(), HeyGenError> {
        self.session_call::<serde_json::Value>(
            token,
            "v1/streaming.task",
            json!({
                "session_id": session_id,
                "text": text,
                "task_type": task_type.to_string(),
            }),
        )
        .await?;
        Ok(())
    }

    pub async fn stop_session(&self, token: &str, session_id: &str) -> Result<(), HeyGenError> {
        self.session_call::<serde_json::Value>(
            token,
            "v1/streaming.stop",
            json!({ "session_id": session_id }),
        )
        .await?;
        Ok(())
    }
}

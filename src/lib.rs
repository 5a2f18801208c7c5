use serde::{Deserialize, Serialize};
use std::env;

pub mod assistants;
pub mod audio;
pub mod avatar;
pub mod chat;
pub mod client;
pub mod configuration;
pub mod conversation;
pub mod error;
pub mod heygen;
pub mod routes;
pub mod state;

pub use client::OpenAiClient;
pub use error::ChatError;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct OpenAiError {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
    pub param: Option<String>,
    pub code: Option<String>,
}

impl OpenAiError {
    pub fn new(message: String, error_type: String) -> OpenAiError {
        OpenAiError {
            message,
            error_type,
            param: None,
            code: None,
        }
    }
}

impl std::fmt::Display for OpenAiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for OpenAiError {}

impl From<reqwest::Error> for OpenAiError {
    fn from(value: reqwest::Error) -> Self {
        OpenAiError::new(value.to_string(), "reqwest".to_string())
    }
}

impl From<std::io::Error> for OpenAiError {
    fn from(value: std::io::Error) -> Self {
        OpenAiError::new(value.to_string(), "io".to_string())
    }
}

impl From<serde_json::Error> for OpenAiError {
    fn from(value: serde_json::Error) -> Self {
        OpenAiError::new(value.to_string(), "serde".to_string())
    }
}

pub type ApiResponseOrError<T> = Result<T, OpenAiError>;

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Key and endpoint used for every OpenAI request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
    base_url: String,
}

impl Credentials {
    /// Creates credentials with the given API key and base URL.
    ///
    /// A trailing slash is appended to the base URL when missing, since
    /// routes are joined onto it verbatim.
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if base_url.is_empty() {
            base_url = DEFAULT_BASE_URL.to_string();
        }
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            api_key: api_key.into(),
            base_url,
        }
    }

    /// Fetches the credentials from the environment variables
    /// `OPENAI_KEY` (or `OPENAI_API_KEY`) and `OPENAI_BASE_URL`.
    ///
    /// Returns `None` when no key is set.
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("OPENAI_KEY")
            .or_else(|_| env::var("OPENAI_API_KEY"))
            .ok()?;
        let base_url = env::var("OPENAI_BASE_URL").unwrap_or_default();
        Some(Self::new(api_key, base_url))
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

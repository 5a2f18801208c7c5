use std::time::Duration;

use thiserror::Error;

use crate::OpenAiError;

/// Failures of the chat flows and the avatar session.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Network failure or error response from the AI provider.
    #[error(transparent)]
    Provider(#[from] OpenAiError),

    #[error("No files were successfully uploaded")]
    NoFilesUploaded,

    #[error("Run failed with status: {status}")]
    RunFailed { status: String },

    #[error("Run did not finish within {waited:?}")]
    PollTimeout { waited: Duration },

    #[error("Request was cancelled")]
    Cancelled,

    #[error("Thread has no messages")]
    EmptyThread,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Avatar session error: {0}")]
    Avatar(String),
}

impl From<reqwest::Error> for ChatError {
    fn from(value: reqwest::Error) -> Self {
        ChatError::Provider(value.into())
    }
}

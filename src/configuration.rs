use std::{net::SocketAddr, time::Duration};

use clap::{Parser, ValueEnum};

use crate::{
    assistants::runs::PollPolicy,
    conversation::{ChatSettings, FileScope, DEFAULT_ASSISTANT_NAME, DEFAULT_MODEL},
    heygen::DEFAULT_HEYGEN_BASE_URL,
};

/// Where uploaded files are made visible to the assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FileScopeArg {
    Thread,
    Assistant,
}

impl From<FileScopeArg> for FileScope {
    fn from(value: FileScopeArg) -> Self {
        match value {
            FileScopeArg::Thread => FileScope::Thread,
            FileScopeArg::Assistant => FileScope::Assistant,
        }
    }
}

/// Server settings. Every flag can also be given through the environment
/// (a `.env` file is loaded first).
#[derive(Debug, Clone, Parser)]
#[command(name = "gyb-chat", version, about = "Chat assistant back end")]
pub struct ServerConfig {
    /// Address to listen on.
    #[arg(long, env = "GYB_BIND", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,

    /// Model for new assistants and stateless replies.
    #[arg(long, env = "GYB_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Use this provisioned assistant instead of looking one up by name.
    #[arg(long, env = "GYB_ASSISTANT_ID")]
    pub assistant_id: Option<String>,

    /// Name used to find or create the file search assistant.
    #[arg(long, env = "GYB_ASSISTANT_NAME", default_value = DEFAULT_ASSISTANT_NAME)]
    pub assistant_name: String,

    #[arg(long, env = "GYB_FILE_SCOPE", value_enum, default_value_t = FileScopeArg::Thread)]
    pub file_scope: FileScopeArg,

    /// Wait between run status fetches, in milliseconds.
    #[arg(long, env = "GYB_POLL_INTERVAL_MS", default_value_t = 1000)]
    pub poll_interval_ms: u64,

    /// Stop polling a run after this many seconds. Unbounded when unset.
    #[arg(long, env = "GYB_POLL_MAX_WAIT_SECS")]
    pub poll_max_wait_secs: Option<u64>,

    /// Multiplier applied to the poll interval after every fetch.
    #[arg(long, env = "GYB_POLL_BACKOFF", default_value_t = 1.0, value_parser = parse_backoff)]
    pub poll_backoff: f64,

    #[arg(long, env = "HEYGEN_API_KEY", hide_env_values = true)]
    pub heygen_api_key: Option<String>,

    #[arg(long, env = "HEYGEN_BASE_URL", default_value = DEFAULT_HEYGEN_BASE_URL)]
    pub heygen_base_url: String,

    /// Voice for text-to-speech replies.
    #[arg(long, env = "GYB_TTS_VOICE", default_value = "alloy")]
    pub tts_voice: String,
}

/// A backoff factor must be a finite number no smaller than 1.
fn parse_backoff(value: &str) -> Result<f64, String> {
    let backoff: f64 = value
        .parse()
        .map_err(|e| format!("`{value}` is not a number: {e}"))?;
    if !backoff.is_finite() || backoff < 1.0 {
        return Err(format!("`{value}` must be a finite number of at least 1.0"));
    }
    Ok(backoff)
}

impl ServerConfig {
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.poll_interval_ms),
            backoff: self.poll_backoff,
            max_wait: self.poll_max_wait_secs.map(Duration::from_secs),
            ..Default::default()
        }
    }

    pub fn chat_settings(&self) -> ChatSettings {
        ChatSettings {
            model: self.model.clone(),
            assistant_id: self.assistant_id.clone().filter(|id| !id.is_empty()),
            assistant_name: self.assistant_name.clone(),
            file_scope: self.file_scope.into(),
            poll: self.poll_policy(),
        }
    }
}

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::{
    configuration::ServerConfig, conversation::ChatService, heygen::HeyGenClient, ChatError,
    Credentials, OpenAiClient,
};

/// Shared application state for the HTTP routes.
#[derive(Clone, Debug)]
pub struct AppState {
    pub chat: Arc<ChatService>,
    pub heygen: HeyGenClient,
    pub heygen_api_key: Option<String>,
    pub tts_voice: String,
    /// Cancelled on shutdown; every request polls with a child of it.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(chat: ChatService, heygen: HeyGenClient) -> Self {
        Self {
            chat: Arc::new(chat),
            heygen,
            heygen_api_key: None,
            tts_voice: "alloy".to_string(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_heygen_api_key(mut self, api_key: Option<String>) -> Self {
        self.heygen_api_key = api_key.filter(|key| !key.is_empty());
        self
    }

    pub fn with_tts_voice(mut self, voice: impl Into<String>) -> Self {
        self.tts_voice = voice.into();
        self
    }

    pub fn from_config(config: &ServerConfig, credentials: Credentials) -> Result<Self, ChatError> {
        let client = OpenAiClient::new(credentials)?;
        let chat = ChatService::new(client, config.chat_settings());
        Ok(Self::new(chat, HeyGenClient::new(config.heygen_base_url.as_str()))
            .with_heygen_api_key(config.heygen_api_key.clone())
            .with_tts_voice(config.tts_voice.as_str()))
    }

    /// Token for one request's work; cancelled when the server shuts down.
    pub fn request_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }
}

//! Voice conversation with a streaming avatar.
//!
//! An [`AvatarSession`] owns the provider session and the local media tracks.
//! The caller feeds it the events reported by the avatar stream; the session
//! collects what the user says, gets a reply from a [`Responder`] and has the
//! avatar speak it. Every way out of the session (explicit close, the Escape
//! key, the owning view going away, the stream dropping) goes through
//! [`AvatarSession::close`], which always stops the provider session and the
//! media tracks and forgets the chat history.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::{
    assistants::messages::Role,
    conversation::{ChatReply, ChatService, ConverseRequest},
    heygen::{HeyGenClient, NewSessionRequest, SessionInfo, TaskType},
    routes::heygen::TokenResponse,
    ChatError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SessionState {
    Idle,
    Connecting,
    Streaming,
    Closing,
    Closed,
}

/// Events reported by the avatar stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvatarEvent {
    StreamReady,
    AvatarStartTalking,
    AvatarStopTalking,
    AvatarTalkingMessage(String),
    StreamDisconnected,
    UserStart,
    /// A fragment of live transcription while the user is talking.
    UserTalkingMessage(String),
    UserStop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum CloseReason {
    Explicit,
    EscapeKey,
    Unmount,
    Disconnected,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub role: Role,
    pub text: String,
}

#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch_token(&self) -> Result<String, ChatError>;
}

#[async_trait]
pub trait AvatarTransport: Send {
    async fn start(&mut self, token: &str) -> Result<(), ChatError>;
    async fn speak(&mut self, text: &str) -> Result<(), ChatError>;
    async fn stop(&mut self) -> Result<(), ChatError>;
}

/// Local capture and playback tracks held by a session.
pub trait MediaTracks: Send {
    fn stop_all(&mut self);
    fn active(&self) -> usize;
}

#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, transcript: &str) -> Result<String, ChatError>;
}

pub struct AvatarSession {
    tokens: Box<dyn TokenSource>,
    transport: Box<dyn AvatarTransport>,
    media: Box<dyn MediaTracks>,
    responder: Box<dyn Responder>,
    state: SessionState,
    transport_started: bool,
    user_talking: bool,
    avatar_talking: bool,
    transcript: Vec<String>,
    history: Vec<HistoryEntry>,
}

impl std::fmt::Debug for AvatarSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvatarSession")
            .field("state", &self.state)
            .field("active_tracks", &self.media.active())
            .field("history", &self.history.len())
            .finish()
    }
}

impl AvatarSession {
    pub fn new(
        tokens: Box<dyn TokenSource>,
        transport: Box<dyn AvatarTransport>,
        media: Box<dyn MediaTracks>,
        responder: Box<dyn Responder>,
    ) -> Self {
        Self {
            tokens,
            transport,
            media,
            responder,
            state: SessionState::Idle,
            transport_started: false,
            user_talking: false,
            avatar_talking: false,
            transcript: Vec::new(),
            history: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn active_tracks(&self) -> usize {
        self.media.active()
    }

    pub fn is_user_talking(&self) -> bool {
        self.user_talking
    }

    pub fn is_avatar_talking(&self) -> bool {
        self.avatar_talking
    }

    /// What the user has said so far in the current turn.
    pub fn transcript(&self) -> String {
        self.transcript.join(" ")
    }

    /// Fetches a token and starts the avatar stream.
    ///
    /// A session opens once. Closing stops its media tracks for good, so a
    /// new conversation needs a new session with fresh tracks.
    pub async fn open(&mut self) -> Result<(), ChatError> {
        if self.state != SessionState::Idle {
            return Err(ChatError::Avatar(format!(
                "cannot open a session that is {}",
                self.state
            )));
        }
        self.state = SessionState::Connecting;

        let token = match self.tokens.fetch_token().await {
            Ok(token) => token,
            Err(e) => {
                self.close(CloseReason::Failed).await;
                return Err(e);
            }
        };

        self.transport_started = true;
        if let Err(e) = self.transport.start(&token).await {
            self.close(CloseReason::Failed).await;
            return Err(e);
        }

        self.state = SessionState::Streaming;
        tracing::info!("Avatar session streaming");
        Ok(())
    }

    /// Applies one stream event. Events that arrive while the session is not
    /// connecting or streaming are dropped.
    pub async fn handle_event(&mut self, event: AvatarEvent) -> Result<(), ChatError> {
        if !matches!(self.state, SessionState::Connecting | SessionState::Streaming) {
            tracing::debug!(?event, state = %self.state, "Ignoring avatar event");
            return Ok(());
        }

        match event {
            AvatarEvent::StreamReady => tracing::debug!("Avatar stream ready"),
            AvatarEvent::AvatarStartTalking => self.avatar_talking = true,
            AvatarEvent::AvatarStopTalking => self.avatar_talking = false,
            AvatarEvent::AvatarTalkingMessage(text) => {
                tracing::debug!(%text, "Avatar talking");
            }
            AvatarEvent::StreamDisconnected => {
                self.close(CloseReason::Disconnected).await;
            }
            AvatarEvent::UserStart => {
                self.user_talking = true;
                self.transcript.clear();
            }
            AvatarEvent::UserTalkingMessage(fragment) => {
                let fragment = fragment.trim();
                if self.user_talking && !fragment.is_empty() {
                    self.transcript.push(fragment.to_string());
                }
            }
            AvatarEvent::UserStop => {
                self.user_talking = false;
                self.reply_to_user().await?;
            }
        }
        Ok(())
    }

    async fn reply_to_user(&mut self) -> Result<(), ChatError> {
        let transcript = self.transcript();
        self.transcript.clear();
        if transcript.is_empty() {
            return Ok(());
        }

        let reply = self.responder.respond(&transcript).await?;
        self.history.push(HistoryEntry {
            role: Role::User,
            text: transcript,
        });
        self.history.push(HistoryEntry {
            role: Role::Assistant,
            text: reply.clone(),
        });
        self.transport.speak(&reply).await
    }

    /// Closes on the Escape key. Returns whether the key closed the session.
    pub async fn handle_key(&mut self, key: &str) -> bool {
        if key != "Escape" || self.state == SessionState::Closed {
            return false;
        }
        self.close(CloseReason::EscapeKey).await;
        true
    }

    /// Stops the provider session and the media tracks and clears the chat
    /// history. Safe to call in any state, any number of times.
    pub async fn close(&mut self, reason: CloseReason) {
        self.state = SessionState::Closing;

        if self.transport_started {
            self.transport_started = false;
            if let Err(e) = self.transport.stop().await {
                tracing::warn!("Failed to stop avatar session: {}", e);
            }
        }
        self.release_local();

        self.state = SessionState::Closed;
        tracing::info!(%reason, "Avatar session closed");
    }

    fn release_local(&mut self) {
        self.media.stop_all();
        self.history.clear();
        self.transcript.clear();
        self.user_talking = false;
        self.avatar_talking = false;
    }
}

impl Drop for AvatarSession {
    fn drop(&mut self) {
        if self.state != SessionState::Closed || self.media.active() > 0 {
            if self.transport_started {
                tracing::warn!("Avatar session dropped without close; provider session left running");
            }
            self.release_local();
        }
    }
}

/// Media tracks tracked by id.
#[derive(Debug, Default, Clone)]
pub struct TrackSet {
    tracks: Vec<(String, bool)>,
}

impl TrackSet {
    pub fn add(&mut self, id: impl Into<String>) {
        self.tracks.push((id.into(), true));
    }

    pub fn stop(&mut self, id: &str) {
        for (track_id, live) in &mut self.tracks {
            if track_id == id {
                *live = false;
            }
        }
    }
}

impl MediaTracks for TrackSet {
    fn stop_all(&mut self) {
        for (_, live) in &mut self.tracks {
            *live = false;
        }
    }

    fn active(&self) -> usize {
        self.tracks.iter().filter(|(_, live)| *live).count()
    }
}

/// Fetches tokens from the server's `/api/heygen` route.
#[derive(Debug, Clone)]
pub struct HttpTokenSource {
    client: Client,
    url: String,
}

impl HttpTokenSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl TokenSource for HttpTokenSource {
    async fn fetch_token(&self) -> Result<String, ChatError> {
        let response = self.client.post(&self.url).send().await?;
        if !response.status().is_success() {
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            let error = body["error"].as_str().unwrap_or("Failed to retrieve access token");
            return Err(ChatError::Avatar(error.to_string()));
        }
        let token: TokenResponse = response.json().await?;
        Ok(token.token)
    }
}

/// Sends transcripts to the server's `/api/chat` route as stateless
/// messages.
#[derive(Debug, Clone)]
pub struct HttpChatResponder {
    client: Client,
    url: String,
}

impl HttpChatResponder {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl Responder for HttpChatResponder {
    async fn respond(&self, transcript: &str) -> Result<String, ChatError> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "message": transcript }))
            .send()
            .await?;
        if !response.status().is_success() {
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            let details = body["details"]
                .as_str()
                .or(body["error"].as_str())
                .unwrap_or("Failed to get response from AI");
            return Err(ChatError::Avatar(details.to_string()));
        }
        let reply: ChatReply = response.json().await?;
        Ok(reply.message)
    }
}

#[async_trait]
impl Responder for ChatService {
    async fn respond(&self, transcript: &str) -> Result<String, ChatError> {
        let request = ConverseRequest {
            message: transcript.to_string(),
            ..Default::default()
        };
        Ok(self.converse(request, &CancellationToken::new()).await?.message)
    }
}

/// Drives a HeyGen streaming session over REST with the issued token.
#[derive(Debug, Clone)]
pub struct HeyGenTransport {
    client: HeyGenClient,
    request: NewSessionRequest,
    token: Option<String>,
    session: Option<SessionInfo>,
}

impl HeyGenTransport {
    pub fn new(client: HeyGenClient, request: NewSessionRequest) -> Self {
        Self {
            client,
            request,
            token: None,
            session: None,
        }
    }

    pub fn session(&self) -> Option<&SessionInfo> {
        self.session.as_ref()
    }

    fn active(&self) -> Result<(&str, &str), ChatError> {
        match (&self.token, &self.session) {
            (Some(token), Some(session)) => Ok((token.as_str(), session.session_id.as_str())),
            _ => Err(ChatError::Avatar("avatar session is not started".to_string())),
        }
    }
}

#[async_trait]
impl AvatarTransport for HeyGenTransport {
    async fn start(&mut self, token: &str) -> Result<(), ChatError> {
        let session = self.client.new_session(token, &self.request).await?;
        self.client.start_session(token, &session.session_id).await?;
        tracing::info!(session_id = %session.session_id, "Started avatar session");
        self.token = Some(token.to_string());
        self.session = Some(session);
        Ok(())
    }

    async fn speak(&mut self, text: &str) -> Result<(), ChatError> {
        let (token, session_id) = self.active()?;
        self.client
            .send_task(token, session_id, text, TaskType::Repeat)
            .await?;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), ChatError> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        let token = self.token.take().unwrap_or_default();
        self.client.stop_session(&token, &session.session_id).await?;
        Ok(())
    }
}

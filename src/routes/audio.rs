use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request, State},
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use crate::{
    audio::{SpeechRequest, Transcription, DEFAULT_SPEECH_MODEL, DEFAULT_TRANSCRIPTION_MODEL},
    routes::errors::ErrorResponse,
    state::AppState,
    ChatError,
};

const AUDIO_FIELD: &str = "audio";

#[derive(Debug, Deserialize)]
pub struct SpeakRequest {
    pub text: String,
}

/// Transcribes the `audio` part of a multipart upload.
pub async fn transcribe(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<Transcription>, ErrorResponse> {
    let mut multipart = Multipart::from_request(request, &state)
        .await
        .map_err(|rejection| ChatError::InvalidRequest(rejection.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ChatError::InvalidRequest(e.body_text()))?
    {
        if field.name() != Some(AUDIO_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or("recording.wav").to_string();
        let mime_type = field.content_type().unwrap_or("audio/wav").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ChatError::InvalidRequest(e.body_text()))?;

        let transcription = state
            .chat
            .client()
            .transcribe(&filename, &mime_type, bytes.to_vec(), DEFAULT_TRANSCRIPTION_MODEL)
            .await
            .map_err(|e| {
                tracing::error!("Transcription error: {}", e);
                ChatError::from(e)
            })?;
        return Ok(Json(transcription));
    }

    Err(ChatError::InvalidRequest("No audio file provided".to_string()).into())
}

/// Reads the text aloud, answering with MP3 audio.
pub async fn speak(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, ErrorResponse> {
    let body = Bytes::from_request(request, &state)
        .await
        .map_err(|rejection| ChatError::InvalidRequest(rejection.body_text()))?;
    let request: SpeakRequest = serde_json::from_slice(&body)
        .map_err(|e| ChatError::InvalidRequest(e.to_string()))?;

    if request.text.trim().is_empty() {
        return Err(ChatError::InvalidRequest("No text provided".to_string()).into());
    }

    let audio = state
        .chat
        .client()
        .speech(SpeechRequest {
            model: DEFAULT_SPEECH_MODEL.to_string(),
            input: request.text,
            voice: state.tts_voice.clone(),
            response_format: None,
            speed: None,
        })
        .await
        .map_err(|e| {
            tracing::error!("Text-to-speech error: {}", e);
            ChatError::from(e)
        })?;

    Ok(([(CONTENT_TYPE, "audio/mpeg")], audio).into_response())
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/transcribe", post(transcribe))
        .route("/api/tts", post(speak))
}

//! Speech-to-text and text-to-speech.

use crate::{client::OpenAiClient, ApiResponseOrError};
use bytes::Bytes;
use derive_builder::Builder;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";
pub const DEFAULT_SPEECH_MODEL: &str = "tts-1";

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Transcription {
    pub text: String,
}

#[derive(Serialize, Builder, Debug, Clone)]
#[builder(pattern = "owned")]
#[builder(name = "SpeechBuilder")]
#[builder(setter(strip_option, into))]
pub struct SpeechRequest {
    /// One of the available TTS models, e.g. `tts-1`.
    pub model: String,
    /// The text to generate audio for. The maximum length is 4096 characters.
    pub input: String,
    /// The voice to use when generating the audio, e.g. `alloy`.
    pub voice: String,
    /// `mp3`, `opus`, `aac`, `flac`, `wav` or `pcm`. Defaults to `mp3`.
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<String>,
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
}

impl OpenAiClient {
    /// Transcribes an in-memory audio clip.
    pub async fn transcribe(
        &self,
        filename: &str,
        mime_type: &str,
        bytes: Vec<u8>,
        model: &str,
    ) -> ApiResponseOrError<Transcription> {
        let file_part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mime_type)?;
        let form = Form::new()
            .part("file", file_part)
            .text("model", model.to_string());
        self.post_multipart("audio/transcriptions", form).await
    }

    /// Synthesizes speech, returning the encoded audio.
    pub async fn speech(&self, request: SpeechRequest) -> ApiResponseOrError<Bytes> {
        self.post_raw("audio/speech", request).await
    }
}

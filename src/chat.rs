//! Given a chat conversation, the model will return a chat completion response.
//!
//! Used for stateless replies, when no assistant thread is involved.

use crate::{client::OpenAiClient, ApiResponseOrError, OpenAiError, Usage};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct ChatCompletion {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<ChatCompletionChoice>,
    pub usage: Option<Usage>,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct ChatCompletionChoice {
    pub index: u64,
    pub finish_reason: Option<String>,
    pub message: ChatCompletionMessage,
}

#[derive(Deserialize, Serialize, Debug, Clone, Eq, PartialEq, Default)]
pub struct ChatCompletionMessage {
    /// The contents of the message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// The refusal message generated by the model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refusal: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Eq, PartialEq)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ChatMessage {
    System {
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    User {
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    Assistant(ChatCompletionMessage),
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage::User {
            content: content.into(),
            name: None,
        }
    }
}

#[derive(Serialize, Builder, Debug, Clone)]
#[builder(derive(Clone, Debug, PartialEq))]
#[builder(pattern = "owned")]
#[builder(name = "ChatCompletionBuilder")]
#[builder(setter(strip_option, into))]
pub struct ChatCompletionRequest {
    /// ID of the model to use.
    model: String,
    /// The messages to generate chat completions for.
    messages: Vec<ChatMessage>,
    /// What sampling temperature to use, between 0 and 2.
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    /// The maximum number of tokens allowed for the generated answer.
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u64>,
    /// A unique identifier representing your end-user.
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<String>,
}

impl ChatCompletion {
    pub fn builder(model: &str, messages: impl Into<Vec<ChatMessage>>) -> ChatCompletionBuilder {
        ChatCompletionBuilder::create_empty()
            .model(model)
            .messages(messages)
    }

    pub async fn create(
        client: &OpenAiClient,
        request: ChatCompletionRequest,
    ) -> ApiResponseOrError<Self> {
        client.post("chat/completions", request).await
    }

    /// Text of the first choice, or an empty string when the model returned
    /// no content.
    pub fn first_content(&self) -> String {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_default()
    }
}

impl ChatCompletionBuilder {
    pub async fn create(self, client: &OpenAiClient) -> ApiResponseOrError<ChatCompletion> {
        let request = self
            .build()
            .map_err(|e| OpenAiError::new(e.to_string(), "builder".to_string()))?;
        ChatCompletion::create(client, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Credentials;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn chat() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_json(serde_json::json!({
                "model": "gpt-4-turbo-preview",
                "messages": [{ "role": "user", "content": "Hello!" }],
                "temperature": 0.0
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-1",
                "object": "chat.completion",
                "created": 1700000000,
                "model": "gpt-4-turbo-preview",
                "choices": [{
                    "index": 0,
                    "finish_reason": "stop",
                    "message": { "role": "assistant", "content": "Hello! How can I assist you today?" }
                }],
                "usage": { "prompt_tokens": 9, "completion_tokens": 9, "total_tokens": 18 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiClient::new(Credentials::new("sk-test", server.uri())).unwrap();
        let chat_completion = ChatCompletion::builder("gpt-4-turbo-preview", [ChatMessage::user("Hello!")])
            .temperature(0.0)
            .create(&client)
            .await
            .unwrap();

        assert_eq!(chat_completion.first_content(), "Hello! How can I assist you today?");
    }

    #[test]
    fn missing_content_is_empty() {
        let completion: ChatCompletion = serde_json::from_value(serde_json::json!({
            "id": "chatcmpl-2",
            "object": "chat.completion",
            "created": 1700000000,
            "model": "gpt-4-turbo-preview",
            "choices": [],
            "usage": null
        }))
        .unwrap();
        assert_eq!(completion.first_content(), "");
    }

    #[test]
    fn builder_clone_and_eq() {
        let builder_a = ChatCompletion::builder("gpt-4", []).temperature(0.0);
        let builder_b = builder_a.clone();
        let builder_c = builder_b.clone().temperature(1.0);
        let builder_d = ChatCompletionBuilder::default();
        assert_eq!(builder_a, builder_b);
        assert_ne!(builder_a, builder_c);
        assert_ne!(builder_a, builder_d);
    }
}

#![allow(dead_code)]

use std::time::Duration;

use gyb_chat::{
    assistants::runs::PollPolicy,
    conversation::{ChatService, ChatSettings, UploadPart},
    Credentials, OpenAiClient,
};
use serde_json::{json, Value};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

pub const THREAD: &str = "thread_1";
pub const RUN: &str = "run_1";
pub const ASSISTANT: &str = "asst_1";

pub fn client(server: &MockServer) -> OpenAiClient {
    OpenAiClient::new(Credentials::new("sk-test", server.uri())).unwrap()
}

pub fn fast_settings() -> ChatSettings {
    ChatSettings {
        poll: PollPolicy::fixed(Duration::from_millis(10)),
        ..Default::default()
    }
}

pub fn service(server: &MockServer, settings: ChatSettings) -> ChatService {
    ChatService::new(client(server), settings)
}

pub fn part(filename: &str, contents: &'static str) -> UploadPart {
    UploadPart {
        filename: filename.to_string(),
        content_type: "text/plain".to_string(),
        bytes: contents.as_bytes().to_vec().into(),
    }
}

pub fn assistant_json(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "object": "assistant",
        "created_at": 1700000000,
        "name": name,
        "model": "gpt-4-turbo-preview",
        "instructions": null,
        "tools": [{ "type": "file_search" }],
        "tool_resources": {},
        "metadata": {}
    })
}

pub fn list_json(data: Vec<Value>) -> Value {
    json!({
        "object": "list",
        "data": data,
        "first_id": null,
        "last_id": null,
        "has_more": false
    })
}

pub fn file_json(id: &str, filename: &str) -> Value {
    json!({
        "id": id,
        "object": "file",
        "created_at": 1700000000,
        "bytes": 12,
        "filename": filename,
        "purpose": "assistants"
    })
}

pub fn thread_json(id: &str) -> Value {
    json!({
        "id": id,
        "object": "thread",
        "created_at": 1700000000,
        "tool_resources": null,
        "metadata": {}
    })
}

pub fn run_json(status: &str) -> Value {
    json!({
        "id": RUN,
        "object": "thread.run",
        "created_at": 1700000000,
        "assistant_id": ASSISTANT,
        "thread_id": THREAD,
        "status": status
    })
}

pub fn message_json(role: &str, texts: &[&str]) -> Value {
    let content: Vec<Value> = texts
        .iter()
        .map(|text| json!({ "type": "text", "text": { "value": text, "annotations": [] } }))
        .collect();
    json!({
        "id": "msg_1",
        "object": "thread.message",
        "created_at": 1700000000,
        "thread_id": THREAD,
        "role": role,
        "content": content
    })
}

pub fn vector_store_json(id: &str) -> Value {
    json!({
        "id": id,
        "object": "vector_store",
        "created_at": 1700000000,
        "name": "uploads",
        "status": "completed"
    })
}

pub fn completion_json(content: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "created": 1700000000,
        "model": "gpt-4-turbo-preview",
        "choices": [{
            "index": 0,
            "finish_reason": "stop",
            "message": { "role": "assistant", "content": content }
        }]
    })
}

/// Mounts one run that goes `queued` once and then reports `final_status`,
/// followed by the thread's newest message.
pub async fn mount_run(server: &MockServer, final_status: &str, reply: &[&str]) {
    Mock::given(method("POST"))
        .and(path(format!("/threads/{THREAD}/runs")))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_json("queued")))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/threads/{THREAD}/runs/{RUN}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_json("in_progress")))
        .up_to_n_times(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/threads/{THREAD}/runs/{RUN}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_json(final_status)))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/threads/{THREAD}/messages")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(list_json(vec![message_json("assistant", reply)])),
        )
        .mount(server)
        .await;
}

/// Mounts the calls that start an analysis: two distinct uploaded files, an
/// empty assistant list, assistant creation, a new thread and the prompt.
pub async fn mount_analysis(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(file_json("file_1", "a.txt")))
        .up_to_n_times(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(file_json("file_2", "b.txt")))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/assistants"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_json(vec![])))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/assistants"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(assistant_json(ASSISTANT, "File Search Assistant")),
        )
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/threads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(thread_json(THREAD)))
        .mount(server)
        .await;
}

pub async fn mount_prompt(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(format!("/threads/{THREAD}/messages")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(message_json("user", &["prompt"])),
        )
        .mount(server)
        .await;
}

mod common;

use std::time::Duration;

use common::*;
use gyb_chat::{
    assistants::runs::PollPolicy,
    conversation::{ChatSettings, ConverseRequest, FileScope},
    ChatError,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::{
    matchers::{body_partial_json, method, path, path_regex},
    Mock, MockServer, ResponseTemplate,
};

fn threaded(message: &str) -> ConverseRequest {
    ConverseRequest {
        message: message.to_string(),
        thread_id: Some(THREAD.to_string()),
        assistant_id: Some(ASSISTANT.to_string()),
    }
}

#[tokio::test]
async fn analysis_returns_one_file_id_per_upload() {
    let server = MockServer::start().await;
    mount_analysis(&server).await;
    Mock::given(method("POST"))
        .and(path(format!("/threads/{THREAD}/messages")))
        .and(body_partial_json(json!({
            "role": "user",
            "content": "Please analyze these files and provide insights about their contents.",
            "attachments": [{ "file_id": "file_1" }, { "file_id": "file_2" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(message_json("user", &["prompt"])))
        .expect(1)
        .mount(&server)
        .await;
    mount_run(&server, "completed", &["Both files list expenses."]).await;

    let reply = service(&server, fast_settings())
        .analyze_files(
            vec![part("a.txt", "rent: 100"), part("b.txt", "food: 50")],
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(reply.message, "Both files list expenses.");
    assert_eq!(reply.thread_id.as_deref(), Some(THREAD));
    assert_eq!(reply.assistant_id.as_deref(), Some(ASSISTANT));
    assert_eq!(
        reply.file_ids,
        Some(vec!["file_1".to_string(), "file_2".to_string()])
    );
}

#[tokio::test]
async fn empty_upload_never_reaches_assistant_or_thread() {
    let server = MockServer::start().await;

    let error = service(&server, fast_settings())
        .analyze_files(Vec::new(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(error, ChatError::NoFilesUploaded));
    assert_eq!(error.to_string(), "No files were successfully uploaded");
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn upload_failure_aborts_analysis() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "message": "Invalid file format",
                "type": "invalid_request_error",
                "param": null,
                "code": null
            }
        })))
        .mount(&server)
        .await;
    Mock::given(path_regex("^/(assistants|threads)"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let error = service(&server, fast_settings())
        .analyze_files(vec![part("a.txt", "x")], &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(error.to_string(), "Invalid file format");
}

#[tokio::test]
async fn failed_analysis_run_reports_status() {
    let server = MockServer::start().await;
    mount_analysis(&server).await;
    mount_prompt(&server).await;
    mount_run(&server, "failed", &["unused"]).await;

    let error = service(&server, fast_settings())
        .analyze_files(vec![part("a.txt", "x")], &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(error, ChatError::RunFailed { .. }));
    assert!(error.to_string().contains("failed"));
}

#[tokio::test]
async fn threaded_reply_joins_text_blocks_of_newest_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/threads/{THREAD}/messages")))
        .and(body_partial_json(json!({ "role": "user", "content": "And the totals?" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(message_json("user", &["q"])))
        .expect(1)
        .mount(&server)
        .await;
    mount_run(&server, "completed", &["Rent is 100.", "Food is 50."]).await;
    Mock::given(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let reply = service(&server, fast_settings())
        .converse(threaded("And the totals?"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(reply.message, "Rent is 100.\nFood is 50.");
    assert_eq!(reply.thread_id, None);
    assert_eq!(reply.file_ids, None);
}

#[tokio::test]
async fn failed_threaded_run_is_an_error() {
    let server = MockServer::start().await;
    mount_prompt(&server).await;
    mount_run(&server, "expired", &["stale"]).await;

    let error = service(&server, fast_settings())
        .converse(threaded("hello"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(error.to_string(), "Run failed with status: expired");
}

#[tokio::test]
async fn stateless_reply_makes_exactly_one_completion_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "model": "gpt-4-turbo-preview",
            "messages": [{ "role": "user", "content": "Hi there" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_json("Hello!")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path_regex("^/(assistants|threads|files)"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let request = ConverseRequest {
        message: "Hi there".to_string(),
        thread_id: Some(THREAD.to_string()),
        assistant_id: None,
    };
    let reply = service(&server, fast_settings())
        .converse(request, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(reply.message, "Hello!");
    assert_eq!(reply.thread_id, None);
}

#[tokio::test]
async fn empty_thread_id_counts_as_absent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_json("Hi")))
        .expect(1)
        .mount(&server)
        .await;

    let request = ConverseRequest {
        message: "hey".to_string(),
        thread_id: Some(String::new()),
        assistant_id: Some(ASSISTANT.to_string()),
    };
    service(&server, fast_settings())
        .converse(request, &CancellationToken::new())
        .await
        .unwrap();
}

#[tokio::test]
async fn configured_assistant_skips_lookup_and_creation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/assistants/asst_cfg"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(assistant_json("asst_cfg", "Provisioned")),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/assistants"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let settings = ChatSettings {
        assistant_id: Some("asst_cfg".to_string()),
        ..fast_settings()
    };
    let assistant = service(&server, settings).assistant().await.unwrap();
    assert_eq!(assistant.id, "asst_cfg");
}

#[tokio::test]
async fn newest_assistant_with_matching_name_is_reused() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/assistants"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_json(vec![
            assistant_json("asst_existing", "File Search Assistant"),
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/assistants"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let assistant = service(&server, fast_settings()).assistant().await.unwrap();
    assert_eq!(assistant.id, "asst_existing");
}

#[tokio::test]
async fn assistant_is_created_when_newest_has_another_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/assistants"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_json(vec![
            assistant_json("asst_other", "Something Else"),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/assistants"))
        .and(body_partial_json(json!({
            "name": "File Search Assistant",
            "tools": [{ "type": "file_search" }]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(assistant_json(ASSISTANT, "File Search Assistant")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let assistant = service(&server, fast_settings()).assistant().await.unwrap();
    assert_eq!(assistant.id, ASSISTANT);
}

#[tokio::test]
async fn assistant_scope_replaces_vector_store() {
    let server = MockServer::start().await;
    mount_analysis(&server).await;
    Mock::given(method("POST"))
        .and(path("/vector_stores"))
        .and(body_partial_json(json!({ "file_ids": ["file_1", "file_2"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(vector_store_json("vs_1")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/assistants/{ASSISTANT}")))
        .and(body_partial_json(json!({
            "tool_resources": { "file_search": { "vector_store_ids": ["vs_1"] } }
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(assistant_json(ASSISTANT, "File Search Assistant")),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_prompt(&server).await;
    mount_run(&server, "completed", &["Done."]).await;

    let settings = ChatSettings {
        file_scope: FileScope::Assistant,
        ..fast_settings()
    };
    let reply = service(&server, settings)
        .analyze_files(
            vec![part("a.txt", "x"), part("b.txt", "y")],
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(reply.message, "Done.");

    let prompt = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .find(|request| request.url.path() == format!("/threads/{THREAD}/messages"))
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&prompt.body).unwrap();
    assert!(body.get("attachments").is_none());
}

#[tokio::test]
async fn bounded_polling_times_out() {
    let server = MockServer::start().await;
    mount_prompt(&server).await;
    Mock::given(method("POST"))
        .and(path(format!("/threads/{THREAD}/runs")))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_json("queued")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/threads/{THREAD}/runs/{RUN}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_json("in_progress")))
        .mount(&server)
        .await;

    let settings = ChatSettings {
        poll: PollPolicy::fixed(Duration::from_millis(10)).with_max_wait(Duration::from_millis(60)),
        ..Default::default()
    };
    let error = service(&server, settings)
        .converse(threaded("slow"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(error, ChatError::PollTimeout { .. }));
}

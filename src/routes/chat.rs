use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request, State},
    http::header::CONTENT_TYPE,
    routing::post,
    Json, Router,
};

use crate::{
    conversation::{ChatReply, ConverseRequest, UploadPart},
    routes::errors::ErrorResponse,
    state::AppState,
    ChatError,
};

const FILES_FIELD: &str = "files";

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("multipart/form-data"))
}

/// Collects every `files` part that carries a file name. Anything else in
/// the form is ignored.
async fn collect_file_parts(mut multipart: Multipart) -> Result<Vec<UploadPart>, ChatError> {
    let mut parts = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ChatError::InvalidRequest(e.body_text()))?
    {
        let (Some(FILES_FIELD), Some(filename)) = (field.name(), field.file_name()) else {
            tracing::warn!(field = ?field.name(), "Skipping non-file form field");
            continue;
        };
        let filename = filename.to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ChatError::InvalidRequest(e.body_text()))?;

        parts.push(UploadPart {
            filename,
            content_type,
            bytes,
        });
    }

    Ok(parts)
}

/// Handles both chat entry shapes: a multipart upload of files to analyse,
/// or a JSON text message.
pub async fn chat(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<ChatReply>, ErrorResponse> {
    let cancel = state.request_token();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let result = if is_multipart(&request) {
        tracing::info!("Processing file upload request");
        match Multipart::from_request(request, &state).await {
            Ok(multipart) => match collect_file_parts(multipart).await {
                Ok(parts) => state.chat.analyze_files(parts, &cancel).await,
                Err(e) => Err(e),
            },
            Err(rejection) => Err(ChatError::InvalidRequest(rejection.body_text())),
        }
    } else {
        match Bytes::from_request(request, &state).await {
            Ok(body) => match serde_json::from_slice::<ConverseRequest>(&body) {
                Ok(converse) => {
                    tracing::info!("Received text message");
                    state.chat.converse(converse, &cancel).await
                }
                Err(e) => Err(ChatError::InvalidRequest(e.to_string())),
            },
            Err(rejection) => Err(ChatError::InvalidRequest(rejection.body_text())),
        }
    };

    result.map(Json).map_err(|e| {
        tracing::error!("Error in chat route: {}", e);
        ErrorResponse::from(e)
    })
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/chat", post(chat))
}

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::{heygen::HeyGenError, routes::errors::ErrorResponse, state::AppState};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenResponse {
    pub token: String,
}

/// Issues a streaming avatar session token.
pub async fn create_token(
    State(state): State<AppState>,
) -> Result<Json<TokenResponse>, ErrorResponse> {
    state
        .heygen
        .create_token(state.heygen_api_key.as_deref())
        .await
        .map(|token| Json(TokenResponse { token }))
        .map_err(|e| {
            tracing::error!("Error in Heygen route: {}", e);
            let response = ErrorResponse::new(e.to_string());
            match e {
                HeyGenError::Http(inner) => response.with_details(format!("{inner:?}")),
                _ => response,
            }
        })
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/heygen", post(create_token))
}

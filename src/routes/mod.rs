pub mod audio;
pub mod chat;
pub mod errors;
pub mod heygen;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

const MAX_BODY_BYTES: usize = 100 * 1024 * 1024;

async fn status() -> &'static str {
    "ok"
}

pub fn configure(state: AppState) -> Router {
    Router::new()
        .route("/status", get(status))
        .merge(chat::routes())
        .merge(heygen::routes())
        .merge(audio::routes())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

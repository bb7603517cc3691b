pub mod error;
pub mod files;
pub mod homework;
pub mod state;
pub mod upload;
pub mod webhook;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Json, Router};

use diary_types::api::PingResponse;
use diary_types::clock;

use crate::state::AppState;

/// All HTTP routes. The body limit leaves headroom above the upload cap
/// for multipart framing; the cap itself is enforced per request in the
/// upload handler.
pub fn router(state: AppState) -> Router {
    let body_limit = (state.max_upload_bytes as usize).saturating_add(1024 * 1024);
    Router::new()
        .route("/api/hw", get(homework::get_hw))
        .route("/api/hw_all", get(homework::get_hw_all))
        .route("/api/hw_add", post(homework::hw_add))
        .route("/api/hw_update", post(homework::hw_update))
        .route("/api/hw_delete", post(homework::hw_delete))
        .route("/api/upload", post(upload::upload))
        .route("/files/{stored_name}", get(files::serve_file))
        .route("/webhook/telegram", post(webhook::telegram_webhook))
        .route("/ping", get(ping))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// GET /ping: liveness probe for the external cron pinger.
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        status: "alive".to_string(),
        timestamp: clock::now_kyiv().to_rfc3339(),
    })
}

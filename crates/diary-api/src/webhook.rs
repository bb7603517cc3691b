use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde_json::Value;
use tracing::warn;

use diary_bot::update::Update;
use diary_types::api::ApiStatus;

use crate::state::AppState;

/// POST /webhook/telegram: one update per call. Processing failures
/// are logged and still answered with success so Telegram never
/// retry-storms; only a missing bot configuration is surfaced as 503.
pub async fn telegram_webhook(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<ApiStatus>) {
    let Some(bot) = &state.bot else {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(ApiStatus::error("no bot")));
    };

    match serde_json::from_value::<Update>(payload) {
        Ok(update) => {
            let id = update.update_id;
            if let Err(e) = bot.handle_update(update).await {
                warn!("Failed to process update {}: {}", id, e);
            }
        }
        Err(e) => warn!("Unparseable webhook payload: {}", e),
    }
    (StatusCode::OK, Json(ApiStatus::ok()))
}

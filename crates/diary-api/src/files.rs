use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use tracing::error;

use diary_storage::is_valid_stored_name;

use crate::error::ApiError;
use crate::state::AppState;

/// GET /files/{stored_name}: serve an uploaded file. The name must
/// match the generation pattern before any filesystem lookup happens:
/// 400 for foreign names, 404 for valid-but-absent tokens.
pub async fn serve_file(
    State(state): State<AppState>,
    Path(stored_name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !is_valid_stored_name(&stored_name) {
        return Err(ApiError::bad_request("Invalid file name"));
    }
    let path = state
        .store
        .resolve(&stored_name)
        .await
        .ok_or_else(|| ApiError::NotFound("File not found".to_string()))?;

    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        error!("Failed to read {}: {}", path.display(), e);
        ApiError::NotFound("File not found".to_string())
    })?;

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    Ok((
        [
            (header::CONTENT_TYPE, mime.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", stored_name),
            ),
        ],
        bytes,
    ))
}

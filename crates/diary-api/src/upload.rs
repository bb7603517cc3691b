use axum::Json;
use axum::extract::{Multipart, State};
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

use diary_types::api::{UploadResponse, UploadedFile};

use crate::error::ApiError;
use crate::state::AppState;

/// POST /api/upload: multipart upload. Fields are consumed chunk by
/// chunk so the cumulative cap can abort mid-transfer instead of after
/// buffering a whole file; the partially-written file is removed.
/// Zero-byte files are accepted, discarded, and not reported.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut uploaded = Vec::new();
    let mut total: u64 = 0;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::bad_request("Malformed multipart body"))?
    {
        let original = field.file_name().unwrap_or("file").to_string();
        let mime = field.content_type().map(str::to_string).unwrap_or_default();

        let stored_name = state.store.stored_name_for(&original);
        let path = state.store.path_for(&stored_name);
        let mut file = tokio::fs::File::create(&path).await.map_err(|e| {
            error!("Failed to create {}: {}", path.display(), e);
            ApiError::Internal
        })?;

        let mut size: u64 = 0;
        loop {
            let chunk = match field.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    drop(file);
                    state.store.delete_quiet(&stored_name).await;
                    error!("Upload stream error for {}: {}", original, e);
                    return Err(ApiError::bad_request("Upload interrupted"));
                }
            };

            total += chunk.len() as u64;
            if total > state.max_upload_bytes {
                drop(file);
                state.store.delete_quiet(&stored_name).await;
                return Err(ApiError::UploadTooLarge(state.max_upload_bytes / (1024 * 1024)));
            }

            size += chunk.len() as u64;
            file.write_all(&chunk).await.map_err(|e| {
                error!("Failed to write {}: {}", path.display(), e);
                ApiError::Internal
            })?;
        }
        file.flush().await.map_err(|_| ApiError::Internal)?;
        drop(file);

        if size == 0 {
            state.store.delete_quiet(&stored_name).await;
            continue;
        }

        info!("Stored upload {} as {} ({} bytes)", original, stored_name, size);
        uploaded.push(UploadedFile {
            name: original,
            url: format!("/files/{}", stored_name),
            stored_name,
            mime,
            size: size as i64,
        });
    }

    Ok(Json(UploadResponse { status: "ok".to_string(), files: uploaded }))
}

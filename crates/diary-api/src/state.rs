use std::sync::Arc;

use tracing::error;

use diary_bot::handlers::BotContext;
use diary_db::Database;
use diary_storage::FileStore;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    /// None when no database is configured; repository-backed
    /// endpoints then degrade to documented no-ops / empty results.
    pub db: Option<Arc<Database>>,
    pub store: Arc<FileStore>,
    /// None when no bot token is configured; the webhook answers 503.
    pub bot: Option<BotContext>,
    /// Cumulative byte cap across all files of one upload request.
    pub max_upload_bytes: u64,
}

impl AppStateInner {
    /// Runs a blocking repository call off the async runtime. The
    /// single place where join and DB errors become 500s.
    pub(crate) async fn with_db<T, F>(&self, f: F) -> Result<Option<T>, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    {
        let Some(db) = self.db.clone() else {
            return Ok(None);
        };
        let value = tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                ApiError::Internal
            })?
            .map_err(ApiError::from)?;
        Ok(Some(value))
    }
}

mod scheduler;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use diary_api::state::{AppState, AppStateInner};
use diary_bot::client::TelegramClient;
use diary_bot::handlers::BotContext;
use diary_db::Database;
use diary_storage::FileStore;

/// Route Telegram posts updates to; appended to WEBHOOK_URL.
const WEBHOOK_PATH: &str = "/webhook/telegram";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "diary_server=debug,diary_api=debug,diary_bot=info,tower_http=info".into()
            }),
        )
        .init();

    // Config
    let host = std::env::var("DIARY_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("DIARY_PORT")
        .unwrap_or_else(|_| "8000".into())
        .parse()?;
    let db_path: PathBuf = std::env::var("DIARY_DB_PATH")
        .unwrap_or_else(|_| "diary.db".into())
        .into();
    let upload_dir: PathBuf = std::env::var("DIARY_UPLOAD_DIR")
        .unwrap_or_else(|_| "uploads".into())
        .into();
    let max_upload_mb: u64 = std::env::var("DIARY_MAX_UPLOAD_MB")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(60);
    let api_url =
        std::env::var("TELEGRAM_API_URL").unwrap_or_else(|_| "https://api.telegram.org".into());
    let token = std::env::var("BOT_TOKEN").unwrap_or_default();
    let webhook_base = std::env::var("WEBHOOK_URL").unwrap_or_default();
    let webapp_url = std::env::var("DIARY_WEBAPP_URL").unwrap_or_default();
    let bot_link = std::env::var("DIARY_BOT_LINK").unwrap_or_else(|_| "https://t.me".into());

    // A broken database file must not take the web API down with it;
    // repository-backed endpoints degrade to empty results instead.
    let db = match Database::open(&db_path) {
        Ok(db) => Some(Arc::new(db)),
        Err(e) => {
            warn!("Running without a database ({}): {}", db_path.display(), e);
            None
        }
    };
    let store = Arc::new(FileStore::new(upload_dir).await?);

    let bot = if token.is_empty() {
        warn!("BOT_TOKEN is not set; Telegram features are disabled");
        None
    } else {
        let client = TelegramClient::new(&api_url, &token);
        if let Err(e) = client.set_my_commands().await {
            warn!("Failed to set bot commands: {}", e);
        }
        if webhook_base.is_empty() {
            warn!("WEBHOOK_URL is not set; incoming updates will not arrive");
        } else {
            let url = format!("{}{}", webhook_base.trim_end_matches('/'), WEBHOOK_PATH);
            match client.set_webhook(&url).await {
                Ok(()) => info!("Webhook registered at {}", url),
                Err(e) => warn!("Failed to register webhook: {}", e),
            }
        }
        Some(BotContext {
            client,
            db: db.clone(),
            webapp_url,
            bot_link,
        })
    };

    match &db {
        Some(db) => scheduler::spawn_jobs(
            db.clone(),
            store.clone(),
            bot.as_ref().map(|b| b.client.clone()),
        ),
        None => warn!("No database; reminder and cleanup jobs are disabled"),
    }

    let state: AppState = Arc::new(AppStateInner {
        db,
        store,
        bot,
        max_upload_bytes: max_upload_mb * 1024 * 1024,
    });

    let app = diary_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Diary server listening on {}", addr);
    info!("Upload cap: {} MB", max_upload_mb);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}

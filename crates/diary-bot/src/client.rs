use anyhow::Result;
use serde_json::{Value, json};
use tracing::debug;

/// Anything that can deliver a text message to a chat. The broadcast
/// dispatcher is generic over this so tests can inject failing fakes.
pub trait Sender {
    fn send_text(
        &self,
        chat_id: i64,
        text: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Thin Telegram Bot API client. Every method is one JSON POST; callers
/// decide which failures are fatal and which are quietly logged.
#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    base: String,
}

impl TelegramClient {
    pub fn new(api_url: &str, token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
        }
    }

    async fn call(&self, method: &str, payload: Value) -> Result<()> {
        self.http
            .post(format!("{}/{}", self.base, method))
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_markup: Option<Value>,
    ) -> Result<()> {
        let mut payload = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown",
        });
        if let Some(markup) = reply_markup {
            payload["reply_markup"] = markup;
        }
        self.call("sendMessage", payload).await
    }

    pub async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        reply_markup: Option<Value>,
    ) -> Result<()> {
        let mut payload = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
            "parse_mode": "Markdown",
        });
        if let Some(markup) = reply_markup {
            payload["reply_markup"] = markup;
        }
        self.call("editMessageText", payload).await
    }

    pub async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        let mut payload = json!({ "callback_query_id": callback_id });
        if let Some(text) = text {
            payload["text"] = json!(text);
        }
        self.call("answerCallbackQuery", payload).await
    }

    /// Deletes a message; when that fails (too old, wrong rights) falls
    /// back to clearing its inline keyboard so the chat stays usable.
    pub async fn delete_message_quiet(&self, chat_id: i64, message_id: i64) {
        let del = self
            .call(
                "deleteMessage",
                json!({ "chat_id": chat_id, "message_id": message_id }),
            )
            .await;
        if let Err(e) = del {
            debug!("deleteMessage failed for chat {}: {}", chat_id, e);
            let _ = self
                .call(
                    "editMessageReplyMarkup",
                    json!({ "chat_id": chat_id, "message_id": message_id }),
                )
                .await;
        }
    }

    pub async fn set_my_commands(&self) -> Result<()> {
        self.call(
            "setMyCommands",
            json!({
                "commands": [
                    { "command": "start", "description": "🚀 Запустити бота" },
                    { "command": "menu", "description": "📚 Головне меню" },
                    { "command": "schedule", "description": "📆 Розклад уроків" },
                ]
            }),
        )
        .await
    }

    pub async fn set_webhook(&self, url: &str) -> Result<()> {
        self.call(
            "setWebhook",
            json!({ "url": url, "drop_pending_updates": true }),
        )
        .await
    }

    pub async fn delete_webhook(&self) -> Result<()> {
        self.call("deleteWebhook", json!({})).await
    }
}

impl Sender for TelegramClient {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        self.send_message(chat_id, text, None).await
    }
}

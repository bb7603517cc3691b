//! Command and callback dispatch for the chat menu. Every failure here
//! is logged and swallowed by the webhook layer; the remote dispatcher
//! must always see success, or it retry-storms.

use std::sync::Arc;

use anyhow::Result;
use serde_json::{Value, json};
use tracing::warn;

use diary_db::Database;
use diary_types::models::{ChatMode, Subscriber};

use crate::DIV;
use crate::client::TelegramClient;
use crate::schedule::{DAYS_UA, render_day_bells, subjects_for};
use crate::update::{CallbackQuery, Message, Update};

pub struct BotContext {
    pub client: TelegramClient,
    pub db: Option<Arc<Database>>,
    /// Mini-app URL opened from private chats.
    pub webapp_url: String,
    /// Deep link to the bot's private chat, shown in groups where
    /// web-app buttons are not allowed.
    pub bot_link: String,
}

impl BotContext {
    pub async fn handle_update(&self, update: Update) -> Result<()> {
        if let Some(msg) = update.message {
            if let Some(text) = msg.text.clone() {
                return self.handle_command(&msg, text.trim()).await;
            }
            return Ok(());
        }
        if let Some(cb) = update.callback_query {
            return self.handle_callback(cb).await;
        }
        Ok(())
    }

    // -- Commands --

    async fn handle_command(&self, msg: &Message, text: &str) -> Result<()> {
        let command = text.split_whitespace().next().unwrap_or("");
        match command {
            "/start" => self.cmd_start(msg).await,
            "/menu" => self.cmd_menu(msg).await,
            "/schedule" => self.cmd_schedule(msg).await,
            _ => Ok(()),
        }
    }

    async fn cmd_start(&self, msg: &Message) -> Result<()> {
        let is_private = msg.chat.is_private();

        // First contact subscribes the chat; an existing subscription
        // is left untouched.
        if self.subscriber(msg.chat.id).await.is_none() {
            let username = msg.from.as_ref().map(|u| u.handle().to_string());
            self.save_subscriber(Subscriber {
                chat_id: msg.chat.id,
                username,
                mode: if is_private { ChatMode::Private } else { ChatMode::Group },
                title: msg.chat.title.clone(),
            })
            .await;
        }

        let greeting = if is_private {
            let name = msg.from.as_ref().map(|u| u.first_name.as_str()).unwrap_or("друже");
            format!(
                "👋 Вітаємо, *{}*!\n\n📚 *Щоденник Класу* — офіційний бот класу.\n{}\n\
                 Тут зберігається домашнє завдання,\nрозклад уроків і нагадування.\n\nОбери розділ:",
                name, DIV
            )
        } else {
            format!(
                "📚 *Щоденник Класу* підключено!\n{}\nНагадування надходитимуть щодня о *09:00*.",
                DIV
            )
        };

        self.client
            .send_message(msg.chat.id, &greeting, Some(self.kb_main(is_private)))
            .await?;

        // Command messages are noise in groups; in private chats the
        // start message stays.
        if !is_private {
            self.client.delete_message_quiet(msg.chat.id, msg.message_id).await;
        }
        Ok(())
    }

    async fn cmd_menu(&self, msg: &Message) -> Result<()> {
        self.client
            .send_message(msg.chat.id, &header_main(), Some(self.kb_main(msg.chat.is_private())))
            .await?;
        self.client.delete_message_quiet(msg.chat.id, msg.message_id).await;
        Ok(())
    }

    async fn cmd_schedule(&self, msg: &Message) -> Result<()> {
        self.client
            .send_message(msg.chat.id, &header_schedule(), Some(kb_schedule_days()))
            .await?;
        self.client.delete_message_quiet(msg.chat.id, msg.message_id).await;
        Ok(())
    }

    // -- Callbacks --

    async fn handle_callback(&self, cb: CallbackQuery) -> Result<()> {
        let Some(msg) = cb.message else {
            return self.client.answer_callback(&cb.id, None).await;
        };
        let chat_id = msg.chat.id;
        let message_id = msg.message_id;
        let data = cb.data.as_deref().unwrap_or("");

        match data {
            "go_main" => {
                self.client.answer_callback(&cb.id, None).await?;
                self.client
                    .edit_message(chat_id, message_id, &header_main(), Some(self.kb_main(msg.chat.is_private())))
                    .await
            }
            "close_menu" => {
                self.client.answer_callback(&cb.id, Some("Меню закрито ✖")).await?;
                self.client.delete_message_quiet(chat_id, message_id).await;
                Ok(())
            }
            "menu_schedule" => {
                self.client.answer_callback(&cb.id, None).await?;
                self.client
                    .edit_message(chat_id, message_id, &header_schedule(), Some(kb_schedule_days()))
                    .await
            }
            "menu_sub" => {
                self.client.answer_callback(&cb.id, None).await?;
                let sub = self.subscriber(chat_id).await;
                let status = match &sub {
                    Some(s) if s.mode == ChatMode::Group => "✅ *Активна* — в групу 👥",
                    Some(_) => "✅ *Активна* — приватно 👤",
                    None => "❌ *Не активна*",
                };
                let text = format!(
                    "🔔 *Підписка*\n{}\n\nСтатус: {}\n\nЩодня о *09:00* надходить список Д/З на поточний день.",
                    DIV, status
                );
                self.client
                    .edit_message(chat_id, message_id, &text, Some(kb_sub(sub.is_some())))
                    .await
            }
            "sub_private" => {
                if !msg.chat.is_private() {
                    return self
                        .client
                        .answer_callback(&cb.id, Some("⚠️ Тільки в приватному чаті!"))
                        .await;
                }
                self.client.answer_callback(&cb.id, None).await?;
                self.save_subscriber(Subscriber {
                    chat_id,
                    username: Some(cb.from.first_name.clone()),
                    mode: ChatMode::Private,
                    title: None,
                })
                .await;
                let text = format!(
                    "✅ *Підписку оформлено!*\n{}\n\n👤 Нагадування щодня о *09:00*.",
                    DIV
                );
                self.client
                    .edit_message(chat_id, message_id, &text, Some(kb_back_only()))
                    .await
            }
            "sub_group_info" => {
                self.client.answer_callback(&cb.id, None).await?;
                let text = format!(
                    "👥 *Підписка групи*\n{}\n\n1️⃣  Додай бота до групи\n2️⃣  Напиши в групі /start\n3️⃣  Готово\n\n💡 Група отримуватиме Д/З о *09:00*.",
                    DIV
                );
                self.client
                    .edit_message(chat_id, message_id, &text, Some(kb(vec![vec![btn_back("menu_sub", "◀️  Назад")]])))
                    .await
            }
            "sub_cancel" => {
                self.client.answer_callback(&cb.id, None).await?;
                self.drop_subscriber(chat_id).await;
                let text = format!(
                    "🚫 *Підписку скасовано*\n{}\n\nРанкові нагадування вимкнено.",
                    DIV
                );
                self.client
                    .edit_message(chat_id, message_id, &text, Some(kb_back_only()))
                    .await
            }
            "help" => {
                self.client.answer_callback(&cb.id, None).await?;
                self.client
                    .edit_message(chat_id, message_id, &help_text(), Some(kb_back_only()))
                    .await
            }
            other => {
                if let Some(day) = other.strip_prefix("sched_") {
                    self.client.answer_callback(&cb.id, None).await?;
                    return self.show_day(chat_id, message_id, day).await;
                }
                self.client.answer_callback(&cb.id, None).await
            }
        }
    }

    async fn show_day(&self, chat_id: i64, message_id: i64, day: &str) -> Result<()> {
        let idx = DAYS_UA.iter().position(|d| *d == day).unwrap_or(0);
        let text = format!("📆 *{}*\n{}\n\n{}", day, DIV, render_day_bells(idx));
        let markup = kb(vec![
            vec![btn_back("menu_schedule", "◀️  До розкладу")],
            vec![btn_back("go_main", "◀️  Назад")],
        ]);
        self.client.edit_message(chat_id, message_id, &text, Some(markup)).await
    }

    // -- Keyboards --

    fn kb_main(&self, is_private: bool) -> Value {
        let open_btn = if is_private {
            json!({ "text": "📱 Відкрити Щоденник", "web_app": { "url": self.webapp_url } })
        } else {
            json!({ "text": "🤖 Відкрити в боті", "url": self.bot_link })
        };
        kb(vec![
            vec![open_btn],
            vec![json!({ "text": "📆  Розклад", "callback_data": "menu_schedule" })],
            vec![json!({ "text": "🔔  Підписка", "callback_data": "menu_sub" })],
            vec![json!({ "text": "❓  Допомога", "callback_data": "help" })],
            vec![json!({ "text": "✖  Закрити меню", "callback_data": "close_menu" })],
        ])
    }

    // -- Subscriber repository access, offloaded off the event loop --

    async fn subscriber(&self, chat_id: i64) -> Option<Subscriber> {
        let db = self.db.clone()?;
        match tokio::task::spawn_blocking(move || db.get_subscriber(chat_id)).await {
            Ok(Ok(sub)) => sub,
            Ok(Err(e)) => {
                warn!("get_subscriber({}) failed: {}", chat_id, e);
                None
            }
            Err(e) => {
                warn!("spawn_blocking join error: {}", e);
                None
            }
        }
    }

    async fn save_subscriber(&self, sub: Subscriber) {
        let Some(db) = self.db.clone() else { return };
        let chat_id = sub.chat_id;
        match tokio::task::spawn_blocking(move || db.upsert_subscriber(&sub)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("upsert_subscriber({}) failed: {}", chat_id, e),
            Err(e) => warn!("spawn_blocking join error: {}", e),
        }
    }

    async fn drop_subscriber(&self, chat_id: i64) {
        let Some(db) = self.db.clone() else { return };
        match tokio::task::spawn_blocking(move || db.remove_subscriber(chat_id)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("remove_subscriber({}) failed: {}", chat_id, e),
            Err(e) => warn!("spawn_blocking join error: {}", e),
        }
    }
}

fn header_main() -> String {
    format!("📚 *Щоденник Класу*\n{}\nОбери розділ:", DIV)
}

fn header_schedule() -> String {
    format!("📆 *Розклад уроків*\n{}\nОбери день:", DIV)
}

fn help_text() -> String {
    format!(
        "❓ *Довідка*\n{div}\n\n\
         📱 *Щоденник* — відкриває міні-додаток, де зберігаються всі завдання.\n\n\
         📎 *Вкладення* — можна додати pdf/фото/відео до завдання.\n\n\
         📆 *Розклад* — уроки і час дзвінків по днях тижня.\n\
         🔔 *Підписка* — щоденне нагадування про Д/З о 09:00.\n\
         {div}\n\
         🤖 *Команди:*\n/menu — головне меню\n/schedule — розклад\n\n\
         🧹 Старі завдання автоматично видаляються.",
        div = DIV
    )
}

fn kb(rows: Vec<Vec<Value>>) -> Value {
    json!({ "inline_keyboard": rows })
}

fn btn_back(callback: &str, label: &str) -> Value {
    json!({ "text": label, "callback_data": callback })
}

fn kb_back_only() -> Value {
    kb(vec![vec![btn_back("go_main", "◀️  Назад")]])
}

fn kb_schedule_days() -> Value {
    let days: Vec<&str> = (0..5)
        .filter(|&d| !subjects_for(d).is_empty())
        .map(|d| DAYS_UA[d])
        .collect();
    let mut rows: Vec<Vec<Value>> = days
        .chunks(2)
        .map(|pair| {
            pair.iter()
                .map(|d| json!({ "text": d, "callback_data": format!("sched_{}", d) }))
                .collect()
        })
        .collect();
    rows.push(vec![btn_back("go_main", "◀️  Назад")]);
    kb(rows)
}

fn kb_sub(is_sub: bool) -> Value {
    let mut rows = vec![
        vec![json!({ "text": "👤  Приватно (цей чат)", "callback_data": "sub_private" })],
        vec![json!({ "text": "👥  В групу — інструкція", "callback_data": "sub_group_info" })],
    ];
    if is_sub {
        rows.push(vec![json!({ "text": "🚫  Скасувати підписку", "callback_data": "sub_cancel" })]);
    }
    rows.push(vec![btn_back("go_main", "◀️  Назад")]);
    kb(rows)
}

//! The slice of the Telegram update payload the bot actually reads.
//! Unknown fields are ignored by serde, so API additions don't break
//! webhook parsing.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: Option<String>,
}

impl Chat {
    pub fn is_private(&self) -> bool {
        self.kind == "private"
    }
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub username: Option<String>,
}

impl User {
    /// Username when set, display name otherwise.
    pub fn handle(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.first_name)
    }
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub data: Option<String>,
    pub message: Option<Message>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_command_update_with_extra_fields() {
        let raw = r#"{
            "update_id": 7,
            "message": {
                "message_id": 12,
                "date": 1741600000,
                "chat": {"id": -100123, "type": "supergroup", "title": "11-Б"},
                "from": {"id": 55, "is_bot": false, "first_name": "Олена", "username": "olena"},
                "text": "/start"
            }
        }"#;
        let update: Update = serde_json::from_str(raw).unwrap();
        let msg = update.message.unwrap();
        assert_eq!(msg.chat.id, -100123);
        assert!(!msg.chat.is_private());
        assert_eq!(msg.from.unwrap().handle(), "olena");
    }

    #[test]
    fn parses_a_callback_update() {
        let raw = r#"{
            "update_id": 8,
            "callback_query": {
                "id": "cb1",
                "from": {"id": 55, "first_name": "Олена"},
                "data": "sched_Середа",
                "message": {"message_id": 3, "chat": {"id": 55, "type": "private"}}
            }
        }"#;
        let update: Update = serde_json::from_str(raw).unwrap();
        let cb = update.callback_query.unwrap();
        assert_eq!(cb.data.as_deref(), Some("sched_Середа"));
        assert_eq!(cb.from.handle(), "Олена");
    }
}

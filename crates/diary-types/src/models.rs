use serde::{Deserialize, Serialize};

/// One homework record. Attachments are merged in at the repository
/// boundary so nothing downstream deals with raw rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: i64,
    pub subject: String,
    pub description: String,
    /// ISO-8601 `YYYY-MM-DD`. Zero-padded so lexical order is date order.
    pub due_date: String,
    pub author_id: Option<i64>,
    pub author_name: Option<String>,
    pub is_important: bool,
    pub attachments: Vec<Attachment>,
}

impl Assignment {
    /// Display name of the author, with the placeholder used everywhere
    /// an assignment was created without one.
    pub fn author_display(&self) -> &str {
        self.author_name.as_deref().unwrap_or("—")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: i64,
    pub hw_id: i64,
    pub original_name: String,
    /// The on-disk token name; the only valid key for file lookups.
    pub stored_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
}

/// Fields for a new assignment, before the database assigns an id.
#[derive(Debug, Clone)]
pub struct NewAssignment {
    pub subject: String,
    pub description: String,
    pub due_date: String,
    pub author_id: Option<i64>,
    pub author_name: Option<String>,
    pub is_important: bool,
}

/// A validated attachment link ready to be inserted for an assignment.
#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub original_name: String,
    pub stored_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    Private,
    Group,
}

impl ChatMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ChatMode::Private => "private",
            ChatMode::Group => "group",
        }
    }

    pub fn parse(s: &str) -> ChatMode {
        match s {
            "group" => ChatMode::Group,
            _ => ChatMode::Private,
        }
    }
}

/// A chat (private or group) that receives scheduled broadcasts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscriber {
    pub chat_id: i64,
    pub username: Option<String>,
    pub mode: ChatMode,
    /// Group display name; None for private chats.
    pub title: Option<String>,
}

use serde::{Deserialize, Serialize};

use crate::models::Assignment;

// -- Uniform CRUD envelope --

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiStatus {
    pub fn ok() -> Self {
        Self { status: "ok".into(), message: None }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { status: "error".into(), message: Some(message.into()) }
    }
}

// -- Homework views --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentView {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub mime: String,
    pub size: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskView {
    pub id: i64,
    pub subject: String,
    pub description: String,
    pub author: String,
    pub author_id: Option<i64>,
    pub date: String,
    pub is_important: bool,
    pub attachments: Vec<AttachmentView>,
}

impl From<Assignment> for TaskView {
    fn from(a: Assignment) -> Self {
        let author = a.author_display().to_string();
        TaskView {
            id: a.id,
            subject: a.subject,
            description: a.description,
            author,
            author_id: a.author_id,
            date: a.due_date,
            is_important: a.is_important,
            attachments: a
                .attachments
                .into_iter()
                .map(|att| AttachmentView {
                    id: att.id,
                    name: att.original_name,
                    url: format!("/files/{}", att.stored_name),
                    mime: att.mime_type,
                    size: att.size_bytes,
                })
                .collect(),
        }
    }
}

/// One day's slice of `GET /api/hw`.
#[derive(Debug, Serialize, Deserialize)]
pub struct DaySection {
    pub label: String,
    pub tasks: Vec<TaskView>,
}

// -- Homework requests --

/// Attachment reference as sent by the mini app. Everything is optional
/// on the wire; entries without a usable stored_name are dropped.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AttachmentInput {
    pub stored_name: Option<String>,
    pub name: Option<String>,
    pub mime: Option<String>,
    pub size: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AddHomeworkRequest {
    pub subject: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub author: Option<String>,
    pub author_id: Option<i64>,
    #[serde(default)]
    pub is_important: bool,
    #[serde(default)]
    pub attachments: Vec<AttachmentInput>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateHomeworkRequest {
    pub id: Option<i64>,
    pub subject: Option<String>,
    pub date: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub is_important: bool,
    /// None means "leave attachments alone"; Some(empty) means
    /// "remove them all". The distinction matters.
    pub attachments: Option<Vec<AttachmentInput>>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteHomeworkRequest {
    pub id: Option<i64>,
}

// -- Upload --

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadedFile {
    pub name: String,
    pub stored_name: String,
    pub url: String,
    pub mime: String,
    pub size: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub status: String,
    pub files: Vec<UploadedFile>,
}

// -- Liveness --

#[derive(Debug, Serialize, Deserialize)]
pub struct PingResponse {
    pub status: String,
    pub timestamp: String,
}

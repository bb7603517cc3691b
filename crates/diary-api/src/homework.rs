use std::collections::BTreeMap;

use axum::Json;
use axum::extract::State;
use chrono::{Days, NaiveDate};

use diary_storage::FileStore;
use diary_types::api::{
    AddHomeworkRequest, ApiStatus, AttachmentInput, DaySection, DeleteHomeworkRequest, TaskView,
    UpdateHomeworkRequest,
};
use diary_types::clock;
use diary_types::models::{NewAssignment, NewAttachment};

use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/hw: next three days of assignments, keyed by ISO date.
pub async fn get_hw(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<String, DaySection>>, ApiError> {
    let today = clock::today_kyiv();
    let days: Vec<(String, String)> = (0..3u64)
        .map(|i| {
            let d = today.checked_add_days(Days::new(i)).unwrap_or(today);
            let label = match i {
                0 => "Сьогодні".to_string(),
                1 => "Завтра".to_string(),
                _ => d.format("%d.%m").to_string(),
            };
            (clock::iso_date(d), label)
        })
        .collect();

    let dates: Vec<String> = days.iter().map(|(iso, _)| iso.clone()).collect();
    let fetched = state
        .with_db(move |db| {
            dates
                .iter()
                .map(|d| db.homework_for_date(d))
                .collect::<anyhow::Result<Vec<_>>>()
        })
        .await?
        .unwrap_or_else(|| vec![Vec::new(), Vec::new(), Vec::new()]);

    let mut out = BTreeMap::new();
    for ((iso, label), rows) in days.into_iter().zip(fetched) {
        out.insert(
            iso,
            DaySection {
                label,
                tasks: rows.into_iter().map(TaskView::from).collect(),
            },
        );
    }
    Ok(Json(out))
}

/// GET /api/hw_all: everything due today or later.
pub async fn get_hw_all(State(state): State<AppState>) -> Result<Json<Vec<TaskView>>, ApiError> {
    let today = clock::iso_date(clock::today_kyiv());
    let rows = state
        .with_db(move |db| db.homework_upcoming(&today))
        .await?
        .unwrap_or_default();
    Ok(Json(rows.into_iter().map(TaskView::from).collect()))
}

/// POST /api/hw_add: create an assignment. Attachment candidates that
/// fail the token check or have no backing file are silently dropped;
/// they never abort the create.
pub async fn hw_add(
    State(state): State<AppState>,
    Json(req): Json<AddHomeworkRequest>,
) -> Result<Json<ApiStatus>, ApiError> {
    let subject = required(req.subject, "subject")?;
    let description = required(req.description, "description")?;
    let due_date = required_date(req.date)?;

    let new = NewAssignment {
        subject,
        description,
        due_date,
        author_id: req.author_id,
        // No author supplied -> stored as NULL, displayed as the placeholder.
        author_name: req.author.filter(|a| !a.trim().is_empty()),
        is_important: req.is_important,
    };
    let attachments = validate_attachments(&state.store, &req.attachments).await;

    state
        .with_db(move |db| {
            let id = db.insert_homework(&new)?;
            for att in &attachments {
                db.insert_attachment(id, att)?;
            }
            Ok(())
        })
        .await?;
    Ok(Json(ApiStatus::ok()))
}

/// POST /api/hw_update: full replace of one assignment's scalar
/// fields; when `attachments` is present (even empty) the attachment
/// set is replaced wholesale, unlinking files that were dropped.
pub async fn hw_update(
    State(state): State<AppState>,
    Json(req): Json<UpdateHomeworkRequest>,
) -> Result<Json<ApiStatus>, ApiError> {
    let id = req.id.ok_or_else(|| ApiError::bad_request("No ID provided"))?;
    let subject = required(req.subject, "subject")?;
    let description = required(req.description, "description")?;
    let due_date = required_date(req.date)?;
    let is_important = req.is_important;

    let existing = state
        .with_db(move |db| {
            db.update_homework(id, &subject, &due_date, &description, is_important)?;
            db.attachment_names(id)
        })
        .await?
        .unwrap_or_default();

    if let Some(inputs) = req.attachments {
        let kept = validate_attachments(&state.store, &inputs).await;
        for name in &existing {
            if !kept.iter().any(|a| a.stored_name == *name) {
                state.store.delete_quiet(name).await;
            }
        }
        state
            .with_db(move |db| db.replace_attachments(id, &kept))
            .await?;
    }
    Ok(Json(ApiStatus::ok()))
}

/// POST /api/hw_delete: remove one assignment, its attachment rows
/// (cascade) and their backing files (best effort).
pub async fn hw_delete(
    State(state): State<AppState>,
    Json(req): Json<DeleteHomeworkRequest>,
) -> Result<Json<ApiStatus>, ApiError> {
    let id = req.id.ok_or_else(|| ApiError::bad_request("No ID provided"))?;

    let names = state
        .with_db(move |db| db.attachment_names(id))
        .await?
        .unwrap_or_default();
    for name in &names {
        state.store.delete_quiet(name).await;
    }
    state.with_db(move |db| db.delete_homework(id)).await?;
    Ok(Json(ApiStatus::ok()))
}

fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ApiError::bad_request(format!("Missing field: {}", field))),
    }
}

/// due_date must be zero-padded ISO, or lexical ordering breaks.
fn required_date(value: Option<String>) -> Result<String, ApiError> {
    let raw = required(value, "date")?;
    let parsed = NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_err(|_| ApiError::bad_request("Invalid date"))?;
    Ok(clock::iso_date(parsed))
}

/// Keeps only attachment candidates whose stored name passes the token
/// format check and is backed by a real file; the rest vanish quietly.
pub(crate) async fn validate_attachments(
    store: &FileStore,
    inputs: &[AttachmentInput],
) -> Vec<NewAttachment> {
    let mut out = Vec::new();
    for input in inputs {
        let Some(stored_name) = input.stored_name.as_deref() else {
            continue;
        };
        if !store.exists(stored_name).await {
            continue;
        }
        out.push(NewAttachment {
            original_name: input.name.clone().unwrap_or_else(|| "file".to_string()),
            stored_name: stored_name.to_string(),
            mime_type: input.mime.clone().unwrap_or_default(),
            size_bytes: input.size.unwrap_or(0),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn attachment_validation_drops_bad_candidates_silently() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("uploads")).await.unwrap();

        let good = store.stored_name_for("notes.pdf");
        tokio::fs::write(store.path_for(&good), b"x").await.unwrap();
        let missing = store.stored_name_for("gone.pdf");

        let inputs = vec![
            AttachmentInput {
                stored_name: Some(good.clone()),
                name: Some("notes.pdf".into()),
                mime: Some("application/pdf".into()),
                size: Some(1),
            },
            AttachmentInput { stored_name: Some(missing), name: None, mime: None, size: None },
            AttachmentInput { stored_name: Some("../../etc/passwd".into()), name: None, mime: None, size: None },
            AttachmentInput { stored_name: None, name: Some("orphan".into()), mime: None, size: None },
        ];

        let kept = validate_attachments(&store, &inputs).await;
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].stored_name, good);
    }

    #[test]
    fn dates_must_be_zero_padded_iso() {
        assert!(required_date(Some("2025-03-05".into())).is_ok());
        assert!(required_date(Some("05.03.2025".into())).is_err());
        assert!(required_date(Some("".into())).is_err());
        assert!(required_date(None).is_err());
    }
}

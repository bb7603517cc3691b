use std::collections::HashMap;

use anyhow::Result;
use rusqlite::Connection;

use crate::Database;
use diary_types::models::{
    Assignment, Attachment, ChatMode, NewAssignment, NewAttachment, Subscriber,
};

impl Database {
    // -- Homework --

    /// All assignments due exactly on `date`, important first, then
    /// subject alphabetically. Attachments are batch-fetched for the
    /// whole id set in one query and merged in memory.
    pub fn homework_for_date(&self, date: &str) -> Result<Vec<Assignment>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, subject, description, due_date, author_id, author_name, is_important
                 FROM homework
                 WHERE due_date = ?1
                 ORDER BY is_important DESC, subject",
            )?;
            let rows = stmt
                .query_map([date], map_assignment)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            merge_attachments(conn, rows)
        })
    }

    /// All assignments due on `from` or later, ordered by date, then
    /// importance, then subject. Same batch merge as above.
    pub fn homework_upcoming(&self, from: &str) -> Result<Vec<Assignment>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, subject, description, due_date, author_id, author_name, is_important
                 FROM homework
                 WHERE due_date >= ?1
                 ORDER BY due_date, is_important DESC, subject",
            )?;
            let rows = stmt
                .query_map([from], map_assignment)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            merge_attachments(conn, rows)
        })
    }

    pub fn insert_homework(&self, new: &NewAssignment) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO homework (subject, description, due_date, author_id, author_name, is_important)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    new.subject,
                    new.description,
                    new.due_date,
                    new.author_id,
                    new.author_name,
                    new.is_important as i64,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Links one attachment to an assignment. stored_name is UNIQUE at
    /// the relation level, so a duplicate link is ignored rather than
    /// failing the whole request.
    pub fn insert_attachment(&self, hw_id: i64, att: &NewAttachment) -> Result<()> {
        self.with_conn_mut(|conn| {
            insert_attachment_row(conn, hw_id, att)?;
            Ok(())
        })
    }

    pub fn update_homework(
        &self,
        id: i64,
        subject: &str,
        due_date: &str,
        description: &str,
        is_important: bool,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE homework
                 SET subject = ?1, due_date = ?2, description = ?3, is_important = ?4
                 WHERE id = ?5",
                rusqlite::params![subject, due_date, description, is_important as i64, id],
            )?;
            Ok(())
        })
    }

    /// Full replace of an assignment's attachment set, atomically:
    /// a crash can no longer leave the row stripped of attachments the
    /// client meant to keep. File unlinks are the caller's business.
    pub fn replace_attachments(&self, hw_id: i64, kept: &[NewAttachment]) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute("DELETE FROM attachments WHERE hw_id = ?1", [hw_id])?;
            for att in kept {
                insert_attachment_row(&tx, hw_id, att)?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    /// Stored names of every attachment owned by one assignment.
    pub fn attachment_names(&self, hw_id: i64) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT stored_name FROM attachments WHERE hw_id = ?1")?;
            let names = stmt
                .query_map([hw_id], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(names)
        })
    }

    /// Deletes the assignment row; attachment rows go with it (cascade).
    pub fn delete_homework(&self, id: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM homework WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    /// Stored names for every attachment whose assignment is due before
    /// `cutoff`, fetched before cleanup so the files can be unlinked
    /// instead of orphaned.
    pub fn expired_attachment_names(&self, cutoff: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT a.stored_name
                 FROM attachments a
                 JOIN homework h ON a.hw_id = h.id
                 WHERE h.due_date < ?1",
            )?;
            let names = stmt
                .query_map([cutoff], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(names)
        })
    }

    /// Deletes all assignments strictly older than `cutoff` and returns
    /// how many were removed.
    pub fn cleanup_expired(&self, cutoff: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let n = conn.execute("DELETE FROM homework WHERE due_date < ?1", [cutoff])?;
            Ok(n)
        })
    }

    // -- Subscribers --

    /// Insert-or-update in a single statement; no "record exists"
    /// exception flow.
    pub fn upsert_subscriber(&self, sub: &Subscriber) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO subscribers (chat_id, username, mode, title)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (chat_id)
                 DO UPDATE SET username = excluded.username,
                               mode = excluded.mode,
                               title = excluded.title",
                rusqlite::params![sub.chat_id, sub.username, sub.mode.as_str(), sub.title],
            )?;
            Ok(())
        })
    }

    pub fn get_subscriber(&self, chat_id: i64) -> Result<Option<Subscriber>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT chat_id, username, mode, title FROM subscribers WHERE chat_id = ?1",
                [chat_id],
                |row| {
                    Ok(Subscriber {
                        chat_id: row.get(0)?,
                        username: row.get(1)?,
                        mode: ChatMode::parse(&row.get::<_, String>(2)?),
                        title: row.get(3)?,
                    })
                },
            )
            .optional()
        })
    }

    pub fn remove_subscriber(&self, chat_id: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM subscribers WHERE chat_id = ?1", [chat_id])?;
            Ok(())
        })
    }

    /// Every chat that should receive a broadcast.
    pub fn subscriber_chat_ids(&self) -> Result<Vec<i64>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT chat_id FROM subscribers")?;
            let ids = stmt
                .query_map([], |row| row.get::<_, i64>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }
}

fn insert_attachment_row(conn: &Connection, hw_id: i64, att: &NewAttachment) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO attachments (hw_id, original_name, stored_name, mime_type, size_bytes)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            hw_id,
            att.original_name,
            att.stored_name,
            att.mime_type,
            att.size_bytes,
        ],
    )?;
    Ok(())
}

fn map_assignment(row: &rusqlite::Row<'_>) -> std::result::Result<Assignment, rusqlite::Error> {
    Ok(Assignment {
        id: row.get(0)?,
        subject: row.get(1)?,
        description: row.get(2)?,
        due_date: row.get(3)?,
        author_id: row.get(4)?,
        author_name: row.get(5)?,
        is_important: row.get::<_, i64>(6)? != 0,
        attachments: Vec::new(),
    })
}

/// Batch-fetch attachments for the given assignments in one `IN (...)`
/// query, then merge by hw_id. Avoids the N+1 pattern on list views.
fn merge_attachments(conn: &Connection, mut rows: Vec<Assignment>) -> Result<Vec<Assignment>> {
    if rows.is_empty() {
        return Ok(rows);
    }

    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "SELECT id, hw_id, original_name, stored_name, mime_type, size_bytes
         FROM attachments
         WHERE hw_id IN ({})
         ORDER BY id",
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::types::ToSql> =
        ids.iter().map(|id| id as &dyn rusqlite::types::ToSql).collect();

    let atts = stmt
        .query_map(params.as_slice(), |row| {
            Ok(Attachment {
                id: row.get(0)?,
                hw_id: row.get(1)?,
                original_name: row.get(2)?,
                stored_name: row.get(3)?,
                mime_type: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                size_bytes: row.get::<_, Option<i64>>(5)?.unwrap_or(0),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut by_hw: HashMap<i64, Vec<Attachment>> = HashMap::new();
    for att in atts {
        by_hw.entry(att.hw_id).or_default().push(att);
    }
    for row in &mut rows {
        if let Some(atts) = by_hw.remove(&row.id) {
            row.attachments = atts;
        }
    }
    Ok(rows)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

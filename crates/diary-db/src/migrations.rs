use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

/// Idempotent schema bootstrap. Runs on every startup, before any
/// repository method is reachable from the web or bot surface.
pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS homework (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            subject       TEXT NOT NULL,
            description   TEXT NOT NULL,
            due_date      TEXT NOT NULL,
            author_id     INTEGER,
            author_name   TEXT,
            created_at    TEXT NOT NULL DEFAULT (datetime('now')),
            is_important  INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_homework_due
            ON homework(due_date);

        CREATE TABLE IF NOT EXISTS subscribers (
            chat_id   INTEGER PRIMARY KEY,
            username  TEXT,
            mode      TEXT NOT NULL DEFAULT 'private',
            title     TEXT
        );

        CREATE TABLE IF NOT EXISTS attachments (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            hw_id          INTEGER NOT NULL REFERENCES homework(id) ON DELETE CASCADE,
            original_name  TEXT NOT NULL,
            stored_name    TEXT NOT NULL UNIQUE,
            mime_type      TEXT,
            size_bytes     INTEGER,
            created_at     TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_attachments_hw
            ON attachments(hw_id);
        ",
    )?;

    // Additive migration for databases created before the importance
    // flag existed. "duplicate column" means it's already there.
    match conn.execute(
        "ALTER TABLE homework ADD COLUMN is_important INTEGER NOT NULL DEFAULT 0",
        [],
    ) {
        Ok(_) => info!("Migration: added homework.is_important"),
        Err(e) if e.to_string().contains("duplicate column name") => {}
        Err(e) => return Err(e.into()),
    }

    info!("Database migrations complete");
    Ok(())
}

//! Background jobs on Kyiv wall time. Each loop sleeps until its next
//! trigger, re-derives "today", and runs once; job errors are logged
//! and never kill the loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, NaiveDate, TimeDelta};
use tracing::{info, warn};

use diary_bot::broadcast::broadcast;
use diary_bot::client::TelegramClient;
use diary_bot::jobs;
use diary_db::Database;
use diary_storage::FileStore;
use diary_types::clock;
use diary_types::models::Assignment;

/// Days a past-due assignment survives before the nightly cleanup.
const CLEANUP_GRACE_DAYS: u64 = 3;

#[derive(Clone, Copy)]
enum Digest {
    Morning,
    Evening,
    Sunday,
}

impl Digest {
    fn label(self) -> &'static str {
        match self {
            Digest::Morning => "morning",
            Digest::Evening => "evening",
            Digest::Sunday => "sunday",
        }
    }

    fn trigger(self) -> (u32, u32) {
        match self {
            Digest::Morning => (9, 15),
            Digest::Evening => (18, 0),
            Digest::Sunday => (18, 0),
        }
    }

    /// The due date the digest reports on: today for the morning one,
    /// tomorrow for both evening ones.
    fn query_date(self, today: NaiveDate) -> NaiveDate {
        match self {
            Digest::Morning => today,
            Digest::Evening | Digest::Sunday => {
                today.checked_add_days(Days::new(1)).unwrap_or(today)
            }
        }
    }

    fn render(self, today: NaiveDate, rows: &[Assignment]) -> Option<String> {
        match self {
            Digest::Morning => jobs::morning_digest(today, rows),
            Digest::Evening => jobs::evening_important(today, rows),
            Digest::Sunday => jobs::sunday_preview(today, rows),
        }
    }
}

/// Starts all job loops. Digests need a bot client; the cleanup runs
/// with or without one.
pub fn spawn_jobs(db: Arc<Database>, store: Arc<FileStore>, client: Option<TelegramClient>) {
    match client {
        Some(client) => {
            for digest in [Digest::Morning, Digest::Evening, Digest::Sunday] {
                tokio::spawn(run_digest(client.clone(), db.clone(), digest));
            }
        }
        None => warn!("No bot client; reminder digests are disabled"),
    }
    tokio::spawn(run_cleanup(db, store));
}

/// Sleeps until the next occurrence of `hour:minute` Kyiv time. Wall
/// time is re-read on every loop, so DST shifts are absorbed at the
/// following trigger.
async fn sleep_until(hour: u32, minute: u32) {
    let now = clock::now_kyiv().naive_local();
    let mut target = now
        .date()
        .and_hms_opt(hour, minute, 0)
        .unwrap_or(now);
    if target <= now {
        target += TimeDelta::days(1);
    }
    let wait = (target - now).to_std().unwrap_or(Duration::from_secs(60));
    tokio::time::sleep(wait).await;
}

async fn run_digest(client: TelegramClient, db: Arc<Database>, digest: Digest) {
    let (hour, minute) = digest.trigger();
    info!("Scheduled {} digest at {:02}:{:02} Kyiv time", digest.label(), hour, minute);
    loop {
        sleep_until(hour, minute).await;
        if let Err(e) = digest_once(&client, &db, digest).await {
            warn!("{} digest failed: {}", digest.label(), e);
        }
    }
}

async fn digest_once(
    client: &TelegramClient,
    db: &Arc<Database>,
    digest: Digest,
) -> anyhow::Result<()> {
    let today = clock::today_kyiv();
    let date = clock::iso_date(digest.query_date(today));

    let fetch_db = db.clone();
    let rows =
        tokio::task::spawn_blocking(move || fetch_db.homework_for_date(&date)).await??;

    let Some(text) = digest.render(today, &rows) else {
        return Ok(());
    };

    let subs_db = db.clone();
    let chat_ids = tokio::task::spawn_blocking(move || subs_db.subscriber_chat_ids()).await??;
    if chat_ids.is_empty() {
        return Ok(());
    }

    let report = broadcast(client, &chat_ids, &text).await;
    info!(
        "{} digest: {} sent, {} failed",
        digest.label(),
        report.sent,
        report.failed
    );
    Ok(())
}

/// Nightly at 00:05: unlink attachment files of long-overdue homework,
/// then drop the rows (attachment rows go with them via cascade).
async fn run_cleanup(db: Arc<Database>, store: Arc<FileStore>) {
    loop {
        sleep_until(0, 5).await;
        if let Err(e) = cleanup_once(&db, &store).await {
            warn!("Cleanup failed: {}", e);
        }
    }
}

async fn cleanup_once(db: &Arc<Database>, store: &Arc<FileStore>) -> anyhow::Result<()> {
    let cutoff = clock::cleanup_cutoff(clock::today_kyiv(), CLEANUP_GRACE_DAYS);

    let names_db = db.clone();
    let names_cutoff = cutoff.clone();
    let names = tokio::task::spawn_blocking(move || {
        names_db.expired_attachment_names(&names_cutoff)
    })
    .await??;
    for name in &names {
        store.delete_quiet(name).await;
    }

    let purge_db = db.clone();
    let removed =
        tokio::task::spawn_blocking(move || purge_db.cleanup_expired(&cutoff)).await??;
    if removed > 0 {
        info!("Cleanup: removed {} expired assignments ({} files)", removed, names.len());
    }
    Ok(())
}

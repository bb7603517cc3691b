//! Reminder digests as pure functions of (date, assignments): the
//! scheduler owns the clock, these own the decision and the text.
//! A `None` return means "send nothing".

use chrono::{Datelike, Days, NaiveDate};

use diary_types::models::Assignment;

use crate::DIV;
use crate::schedule::{DAYS_UA, render_day_bells, subject_icon};

fn weekday_index(d: NaiveDate) -> usize {
    d.weekday().num_days_from_monday() as usize
}

fn is_school_day(d: NaiveDate) -> bool {
    weekday_index(d) < 5
}

fn task_block(a: &Assignment, mark_important: bool) -> String {
    let imp = if mark_important && a.is_important { "🔴 " } else { "" };
    let clip = if a.attachments.is_empty() { "" } else { " 📎" };
    format!(
        "╭─ {}{} *{}*{}\n│  📋 {}\n╰─ 👤 {}\n\n",
        imp,
        subject_icon(&a.subject),
        a.subject,
        clip,
        a.description,
        a.author_display()
    )
}

/// Mon–Fri morning digest: today's bell schedule plus every assignment
/// due today. No-op on weekends.
pub fn morning_digest(today: NaiveDate, rows: &[Assignment]) -> Option<String> {
    if !is_school_day(today) {
        return None;
    }
    let day = weekday_index(today);

    let mut text = format!(
        "☀️ *Доброго ранку!*\n📅 *{}, {}*\n{}\n\n📆 *Розклад на сьогодні:*\n{}\n",
        DAYS_UA[day],
        today.format("%d.%m"),
        DIV,
        render_day_bells(day)
    );

    if rows.is_empty() {
        text.push_str("📭 Д/З на сьогодні немає 🎉\n");
    } else {
        text.push_str("📚 *Д/З на сьогодні:*\n");
        for a in rows {
            text.push_str(&task_block(a, true));
        }
    }
    Some(text)
}

/// Mon–Thu evening digest: tomorrow's *important* assignments only.
/// Silent when tomorrow is not a school day or nothing is important;
/// no "no important homework" noise.
pub fn evening_important(today: NaiveDate, tomorrow_rows: &[Assignment]) -> Option<String> {
    if !is_school_day(today) {
        return None;
    }
    let tomorrow = today.checked_add_days(Days::new(1))?;
    if !is_school_day(tomorrow) {
        return None;
    }

    let important: Vec<&Assignment> =
        tomorrow_rows.iter().filter(|a| a.is_important).collect();
    if important.is_empty() {
        return None;
    }

    let mut text = format!(
        "🔴 *Важливе Д/З на завтра — {}, {}*\n{}\n\n",
        DAYS_UA[weekday_index(tomorrow)],
        tomorrow.format("%d.%m"),
        DIV
    );
    for a in important {
        text.push_str(&task_block(a, false));
    }
    Some(text)
}

/// Sunday evening preview of Monday. Unlike the weekday evening digest
/// this always sends, an explicit "nothing due" message included.
pub fn sunday_preview(today: NaiveDate, monday_rows: &[Assignment]) -> Option<String> {
    if weekday_index(today) != 6 {
        return None;
    }
    let monday = today.checked_add_days(Days::new(1))?;

    let header = format!(
        "📋 *Д/З на завтра — {}, {}*\n{}\n\n",
        DAYS_UA[weekday_index(monday)],
        monday.format("%d.%m"),
        DIV
    );

    if monday_rows.is_empty() {
        return Some(format!(
            "{}📭 На понеділок Д/З немає 🎉\nГарного відпочинку!\n",
            header
        ));
    }

    let mut text = header;
    if monday_rows.iter().any(|a| a.is_important) {
        text.push_str("⚠️ *Є важливі завдання!*\n\n");
    }
    for a in monday_rows {
        text.push_str(&task_block(a, true));
    }
    Some(text)
}

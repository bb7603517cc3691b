//! The system's home timezone. All calendar decisions (due dates,
//! reminder triggers, the cleanup cutoff) are made in Kyiv wall time,
//! not UTC, so a fixed offset would drift across DST.

use chrono::{DateTime, Days, NaiveDate, Utc};
use chrono_tz::Europe::Kyiv;
use chrono_tz::Tz;

pub fn now_kyiv() -> DateTime<Tz> {
    Utc::now().with_timezone(&Kyiv)
}

pub fn today_kyiv() -> NaiveDate {
    now_kyiv().date_naive()
}

/// ISO `YYYY-MM-DD`, zero-padded. The only due_date format the store
/// accepts, because dates are ordered lexically.
pub fn iso_date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// Cutoff for the nightly cleanup: anything due before this is expired.
pub fn cleanup_cutoff(today: NaiveDate, grace_days: u64) -> String {
    iso_date(today.checked_sub_days(Days::new(grace_days)).unwrap_or(today))
}

//! Canonical day and week keys
//!
//! Every day-scoped structure (rate limit counters, leaderboard sets, the
//! daily best ledger) buckets on the same UTC `YYYY-MM-DD` key produced here.
//! Deriving the key anywhere else invites timezone skew between components.

use chrono::{Datelike, Duration, NaiveDate, Utc};

/// Today's bucket key, UTC calendar date as `YYYY-MM-DD`.
pub fn current_day() -> String {
    day_key(Utc::now().date_naive())
}

pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Monday of the ISO week containing `date` (or today), same format.
/// Only the league projection buckets by week.
pub fn week_start(date: Option<NaiveDate>) -> String {
    let d = date.unwrap_or_else(|| Utc::now().date_naive());
    let monday = d - Duration::days(d.weekday().num_days_from_monday() as i64);
    day_key(monday)
}

/// Time remaining until the next UTC midnight. Informational only.
pub fn time_until_reset() -> Duration {
    let now = Utc::now();
    let tomorrow = now
        .date_naive()
        .succ_opt()
        .expect("date overflow")
        .and_hms_opt(0, 0, 0)
        .expect("valid midnight")
        .and_utc();
    tomorrow - now
}

pub fn format_reset(remaining: Duration) -> String {
    let hours = remaining.num_hours();
    let minutes = remaining.num_minutes() % 60;
    format!("{hours}h {minutes}m")
}

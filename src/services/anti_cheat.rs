//! Attempt validation and advisory anomaly detection
//!
//! `validate` is the gate every submission passes through. All rules run and
//! every applicable flag is collected; a submission is accepted only when no
//! rejecting rule fired. False starts are legitimate submissions (zero score,
//! quota consumed) but are never persisted toward ranking.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::constants::{
    REACTION_MAX_MS, REACTION_MIN_MS, SUSPICIOUS_SPEED_MS, TIMESTAMP_SKEW_MS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Flag {
    InvalidRange,
    FalseStartMismatch,
    TimestampMismatch,
    SuspiciousSpeed,
}

#[derive(Debug, Clone)]
pub struct Validation {
    pub accepted: bool,
    /// Persist toward the daily-best ledger and leaderboard. Accepted false
    /// starts are recorded as attempts but never compete for rank.
    pub persist: bool,
    pub flags: Vec<Flag>,
}

pub fn validate(
    reaction_ms: i32,
    submitted_at: DateTime<Utc>,
    is_false_start: bool,
    now: DateTime<Utc>,
) -> Validation {
    let mut flags = Vec::new();
    let mut accepted = true;

    // Range applies to real reactions only; a false start carries the zero
    // sentinel and is checked by the consistency rule below.
    if !is_false_start && !(REACTION_MIN_MS..=REACTION_MAX_MS).contains(&reaction_ms) {
        flags.push(Flag::InvalidRange);
        accepted = false;
    }

    if is_false_start && reaction_ms != 0 {
        flags.push(Flag::FalseStartMismatch);
        accepted = false;
    }

    // Bounds replay and clock-skew abuse.
    let skew_ms = (now - submitted_at).num_milliseconds().abs();
    if skew_ms > TIMESTAMP_SKEW_MS {
        flags.push(Flag::TimestampMismatch);
        accepted = false;
    }

    // Sub-150ms is physiologically rare but not impossible. Monitoring
    // signal only, never a rejection.
    if !is_false_start && reaction_ms < SUSPICIOUS_SPEED_MS {
        flags.push(Flag::SuspiciousSpeed);
    }

    Validation {
        accepted,
        persist: accepted && !is_false_start,
        flags,
    }
}

/// Flags a user whose recent history is almost entirely sub-threshold while
/// the current attempt is too. Needs at least 3 attempts of history.
pub fn statistical_anomaly(recent_ms: &[i32], current_ms: i32) -> bool {
    if recent_ms.len() < 3 {
        return false;
    }

    let sub_threshold = recent_ms
        .iter()
        .filter(|&&ms| ms < SUSPICIOUS_SPEED_MS)
        .count();
    let percentage = sub_threshold as f64 / recent_ms.len() as f64 * 100.0;

    percentage > 95.0 && current_ms < SUSPICIOUS_SPEED_MS
}

/// Three or more consecutive identical reaction times. Human timing noise
/// makes exact repeats at millisecond resolution vanishingly unlikely.
pub fn repeated_values(attempts_ms: &[i32]) -> bool {
    if attempts_ms.len() < 3 {
        return false;
    }

    let mut run = 1;
    for pair in attempts_ms.windows(2) {
        if pair[0] == pair[1] {
            run += 1;
            if run >= 3 {
                return true;
            }
        } else {
            run = 1;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn check(reaction_ms: i32, false_start: bool) -> Validation {
        let now = Utc::now();
        validate(reaction_ms, now, false_start, now)
    }

    #[test]
    fn in_range_accepted() {
        let v = check(250, false);
        assert!(v.accepted);
        assert!(v.persist);
        assert!(v.flags.is_empty());
    }

    #[test]
    fn range_bounds_inclusive() {
        assert!(check(100, false).accepted);
        assert!(check(2000, false).accepted);
        assert!(check(99, false).flags.contains(&Flag::InvalidRange));
        assert!(check(2001, false).flags.contains(&Flag::InvalidRange));
        assert!(!check(99, false).accepted);
    }

    #[test]
    fn false_start_with_zero_is_accepted_but_not_persisted() {
        let v = check(0, true);
        assert!(v.accepted);
        assert!(!v.persist);
        assert!(v.flags.is_empty());
    }

    #[test]
    fn false_start_with_nonzero_rejected() {
        let v = check(250, true);
        assert!(!v.accepted);
        assert!(v.flags.contains(&Flag::FalseStartMismatch));
    }

    #[test]
    fn stale_timestamp_rejected() {
        let now = Utc::now();
        let v = validate(250, now - Duration::seconds(11), false, now);
        assert!(!v.accepted);
        assert_eq!(v.flags, vec![Flag::TimestampMismatch]);

        // Future-dated clients are just as suspect.
        let v = validate(250, now + Duration::seconds(11), false, now);
        assert!(!v.accepted);
    }

    #[test]
    fn slight_skew_tolerated() {
        let now = Utc::now();
        let v = validate(250, now - Duration::seconds(9), false, now);
        assert!(v.accepted);
    }

    #[test]
    fn suspicious_speed_flagged_not_rejected() {
        let v = check(120, false);
        assert!(v.accepted);
        assert!(v.persist);
        assert_eq!(v.flags, vec![Flag::SuspiciousSpeed]);
    }

    #[test]
    fn all_applicable_flags_collected() {
        let now = Utc::now();
        let v = validate(50, now - Duration::seconds(30), false, now);
        assert!(!v.accepted);
        assert!(v.flags.contains(&Flag::InvalidRange));
        assert!(v.flags.contains(&Flag::TimestampMismatch));
        assert!(v.flags.contains(&Flag::SuspiciousSpeed));
    }

    #[test]
    fn statistical_anomaly_needs_history() {
        assert!(!statistical_anomaly(&[120, 110], 120));
        assert!(statistical_anomaly(&[120, 110, 130, 125], 120));
        assert!(!statistical_anomaly(&[120, 110, 300, 125], 120));
        // Fast history but a normal current attempt is not flagged.
        assert!(!statistical_anomaly(&[120, 110, 130], 250));
    }

    #[test]
    fn repeated_values_detects_runs() {
        assert!(!repeated_values(&[200, 200]));
        assert!(repeated_values(&[200, 200, 200]));
        assert!(repeated_values(&[250, 180, 180, 180, 300]));
        assert!(!repeated_values(&[200, 210, 200, 210, 200]));
    }
}

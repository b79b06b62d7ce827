//! Consecutive-day play streak transitions

use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakUpdate {
    pub streak: i32,
    pub is_new_streak: bool,
}

/// Advance a user's streak for a play on `today`.
///
/// Same-day plays leave the streak untouched so multiple attempts within one
/// day never double-count. A one-day gap extends the streak, anything longer
/// (or no prior play, or an unparseable stored date) starts over at 1.
/// `longest_streak` is the caller's job.
pub fn advance(last_played_day: Option<&str>, current_streak: i32, today: &str) -> StreakUpdate {
    let Some(last) = last_played_day else {
        return StreakUpdate {
            streak: 1,
            is_new_streak: true,
        };
    };

    let parsed = (
        NaiveDate::parse_from_str(last, "%Y-%m-%d"),
        NaiveDate::parse_from_str(today, "%Y-%m-%d"),
    );
    let (Ok(last), Ok(today)) = parsed else {
        return StreakUpdate {
            streak: 1,
            is_new_streak: true,
        };
    };

    match (today - last).num_days() {
        0 => StreakUpdate {
            streak: current_streak,
            is_new_streak: false,
        },
        1 => StreakUpdate {
            streak: current_streak + 1,
            is_new_streak: false,
        },
        _ => StreakUpdate {
            streak: 1,
            is_new_streak: true,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TODAY: &str = "2026-08-07";

    #[test]
    fn first_play_starts_a_streak() {
        assert_eq!(
            advance(None, 0, TODAY),
            StreakUpdate {
                streak: 1,
                is_new_streak: true
            }
        );
    }

    #[test]
    fn same_day_is_unchanged() {
        assert_eq!(
            advance(Some(TODAY), 5, TODAY),
            StreakUpdate {
                streak: 5,
                is_new_streak: false
            }
        );
    }

    #[test]
    fn consecutive_day_extends() {
        assert_eq!(
            advance(Some("2026-08-06"), 5, TODAY),
            StreakUpdate {
                streak: 6,
                is_new_streak: false
            }
        );
    }

    #[test]
    fn gap_resets() {
        assert_eq!(
            advance(Some("2026-08-04"), 5, TODAY),
            StreakUpdate {
                streak: 1,
                is_new_streak: true
            }
        );
    }

    #[test]
    fn garbage_date_resets() {
        assert_eq!(
            advance(Some("not-a-date"), 5, TODAY),
            StreakUpdate {
                streak: 1,
                is_new_streak: true
            }
        );
    }
}

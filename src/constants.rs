//! Application constants

/// Fastest reaction time accepted as humanly plausible (ms)
pub const REACTION_MIN_MS: i32 = 100;

/// Slowest reaction time worth recording (ms)
pub const REACTION_MAX_MS: i32 = 2000;

/// Reactions below this are flagged for monitoring but not rejected (ms)
pub const SUSPICIOUS_SPEED_MS: i32 = 150;

/// Maximum allowed skew between client and server clocks (ms)
pub const TIMESTAMP_SKEW_MS: i64 = 10_000;

/// Attempts granted per day before streak bonuses
pub const BASE_DAILY_ATTEMPTS: i64 = 3;

/// Streak length that unlocks one bonus attempt
pub const STREAK_BONUS_AT: i32 = 3;

/// Streak length that unlocks two bonus attempts
pub const STREAK_BIG_BONUS_AT: i32 = 7;

/// TTL for the per-user daily attempt counter
pub const RATE_LIMIT_TTL_SECS: i64 = 24 * 60 * 60;

/// TTL for a day's leaderboard sorted set; long enough to survive day rollover
pub const LEADERBOARD_TTL_SECS: i64 = 48 * 60 * 60;

/// Default page size for leaderboard queries
pub const DEFAULT_LEADERBOARD_LIMIT: i64 = 100;

/// Maximum page size for leaderboard queries
pub const MAX_LEADERBOARD_LIMIT: i64 = 500;

/// How deep to scan when centering a leaderboard slice on one user
pub const CONTEXT_SCAN_LIMIT: i64 = 1000;

/// Neighbors shown above and below a user outside the top window
pub const CONTEXT_NEIGHBORS: usize = 5;

/// Recent attempts examined by the advisory anomaly detectors
pub const ANOMALY_WINDOW: i64 = 10;

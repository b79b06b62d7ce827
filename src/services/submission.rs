//! The submission transaction
//!
//! One strictly ordered pass per attempt: gate on quota, validate, consume a
//! slot, persist the attempt, update the user, then let the attempt compete
//! for rank if it is eligible. Once the attempt row is durably written the
//! submission has happened; later ranking steps may degrade but nothing is
//! rolled back, and the durable fallback recomputation can repair whatever a
//! partial failure left behind.

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::warn;

use super::anti_cheat::{self, Flag};
use super::{clock, streak};
use crate::AppState;
use crate::constants::ANOMALY_WINDOW;
use crate::services::error::AppError;
use crate::storage::{NewAttempt, Storage, User};

#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    pub user_id: String,
    pub reaction_ms: i32,
    pub is_false_start: bool,
    pub submitted_at: DateTime<Utc>,
    pub user_agent: String,
}

#[derive(Debug, Clone)]
pub struct Completed {
    /// Whether the attempt counted toward ranking (accepted, not a false
    /// start).
    pub attempt_saved: bool,
    pub is_daily_best: bool,
    pub percentile: f64,
    pub rank: i64,
    pub attempts_remaining: i64,
}

/// Terminal states of one submission. Rejections carry enough for the client
/// to distinguish "fix your input" from "come back tomorrow".
#[derive(Debug, Clone)]
pub enum SubmissionOutcome {
    Completed(Completed),
    RateLimited,
    Rejected { flags: Vec<Flag> },
}

pub async fn submit(
    state: &AppState,
    req: SubmissionRequest,
) -> Result<SubmissionOutcome, AppError> {
    let day = clock::current_day();
    let now = Utc::now();

    // First contact creates a guest; profile details can come later.
    let mut user = match state.docs.user(&req.user_id).await? {
        Some(user) => user,
        None => {
            let username = format!("Player{}", rand::rng().random_range(0..10_000));
            let user = User::new_guest(req.user_id.clone(), username, now);
            state.docs.create_user(&user).await?;
            user
        }
    };

    let remaining = state
        .rate_limiter
        .remaining(&req.user_id, &day, user.current_streak)
        .await?;
    if remaining <= 0 {
        return Ok(SubmissionOutcome::RateLimited);
    }

    // Rejected submissions stop here; they never consume a quota slot.
    let validation = anti_cheat::validate(req.reaction_ms, req.submitted_at, req.is_false_start, now);
    if !validation.accepted {
        return Ok(SubmissionOutcome::Rejected {
            flags: validation.flags,
        });
    }

    // The new counter value is this attempt's sequence number for the day.
    // From here on the slot is spent, false starts included.
    let attempt_number = state.rate_limiter.increment(&req.user_id, &day).await? as i32;

    let reaction_ms = if req.is_false_start { 0 } else { req.reaction_ms };
    state
        .docs
        .insert_attempt(&NewAttempt {
            user_id: req.user_id.clone(),
            day: day.clone(),
            attempt_number,
            reaction_ms,
            false_start: req.is_false_start,
            user_agent: req.user_agent.clone(),
            client_timestamp: req.submitted_at,
        })
        .await?;

    user.total_attempts += 1;
    user.last_active = now;
    let update = streak::advance(user.last_played_day.as_deref(), user.current_streak, &day);
    user.current_streak = update.streak;
    user.longest_streak = user.longest_streak.max(update.streak);
    user.last_played_day = Some(day.clone());
    if !req.is_false_start
        && user
            .all_time_best_ms
            .is_none_or(|best| req.reaction_ms < best)
    {
        user.all_time_best_ms = Some(req.reaction_ms);
    }
    state.docs.update_user(&user).await?;

    let mut is_daily_best = false;
    let mut rank = 0;
    let mut percentile = 0.0;

    if validation.persist {
        if let Some(best) = state
            .docs
            .record_best(&req.user_id, &day, req.reaction_ms, attempt_number)
            .await?
        {
            is_daily_best = true;
            state
                .leaderboard
                .upsert(&day, &req.user_id, best.best_ms)
                .await;
        }

        let info = state.leaderboard.rank(&day, &req.user_id).await?;
        if let Some(r) = info.rank {
            rank = r;
            percentile = info.percentile;
            // Denormalized convenience data; losing it costs nothing the
            // fallback recomputation cannot restore.
            if let Err(e) = state
                .docs
                .attach_rank_snapshot(&req.user_id, &day, r, info.percentile)
                .await
            {
                warn!(user = %req.user_id, %day, error = %e, "rank snapshot write failed");
            }
        }

        run_anomaly_hooks(state, &req.user_id, &day, req.reaction_ms).await;
    }

    let attempts_remaining = state
        .rate_limiter
        .remaining(&req.user_id, &day, user.current_streak)
        .await?;

    Ok(SubmissionOutcome::Completed(Completed {
        attempt_saved: validation.persist,
        is_daily_best,
        percentile,
        rank,
        attempts_remaining,
    }))
}

/// Advisory history-based detectors. They flag, they never block.
async fn run_anomaly_hooks(state: &AppState, user_id: &str, day: &str, reaction_ms: i32) {
    let recent = match state
        .docs
        .recent_reaction_times(user_id, day, ANOMALY_WINDOW)
        .await
    {
        Ok(recent) => recent,
        Err(e) => {
            warn!(user = %user_id, error = %e, "anomaly hooks skipped, history unavailable");
            return;
        }
    };

    // The just-persisted attempt is the tail of `recent`; the statistical
    // check wants prior history plus the current value.
    let history = &recent[..recent.len().saturating_sub(1)];
    if anti_cheat::statistical_anomaly(history, reaction_ms) {
        warn!(user = %user_id, %day, "statistical anomaly: sustained sub-threshold reactions");
    }
    if anti_cheat::repeated_values(&recent) {
        warn!(user = %user_id, %day, "repeated identical reaction times");
    }
}

//! End-to-end submission scenarios over the in-memory backends

use std::sync::Arc;

use chrono::Utc;

use speedleague::AppState;
use speedleague::config::Config;
use speedleague::services::anti_cheat::Flag;
use speedleague::services::clock;
use speedleague::services::submission::{self, Completed, SubmissionOutcome, SubmissionRequest};
use speedleague::services::verifier::IdentityVerifier;
use speedleague::storage::{MemoryStorage, Storage, User};
use speedleague::store::{FastPath, MemoryStore};

fn test_config() -> Config {
    Config {
        port: 0,
        database_url: String::new(),
        redis_url: None,
        verifier_url: "http://127.0.0.1:9/verify".to_string(),
        verifier_action: "test".to_string(),
    }
}

fn app_with(docs: Arc<MemoryStorage>, fast: FastPath) -> Arc<AppState> {
    AppState::new(
        docs,
        Arc::new(fast),
        IdentityVerifier::new("http://127.0.0.1:9/verify".into(), "test".into()),
        test_config(),
    )
}

fn app() -> (Arc<AppState>, Arc<MemoryStorage>) {
    let docs = Arc::new(MemoryStorage::default());
    let state = app_with(docs.clone(), FastPath::new(Arc::new(MemoryStore::default())));
    (state, docs)
}

fn request(user_id: &str, reaction_ms: i32, is_false_start: bool) -> SubmissionRequest {
    SubmissionRequest {
        user_id: user_id.to_string(),
        reaction_ms,
        is_false_start,
        submitted_at: Utc::now(),
        user_agent: "test-agent".to_string(),
    }
}

async fn submit_ok(state: &AppState, req: SubmissionRequest) -> Completed {
    match submission::submit(state, req).await.unwrap() {
        SubmissionOutcome::Completed(done) => done,
        other => panic!("expected completed submission, got {other:?}"),
    }
}

/// Seed a user who already played today with the given streak, so the quota
/// stays put across the scenario.
async fn seed_played_today(docs: &MemoryStorage, id: &str, streak: i32) {
    let mut user = User::new_guest(id.to_string(), format!("{id}-name"), Utc::now());
    user.current_streak = streak;
    user.longest_streak = streak;
    user.last_played_day = Some(clock::current_day());
    docs.create_user(&user).await.unwrap();
}

#[tokio::test]
async fn daily_best_sequence_then_rate_limited() {
    let (state, docs) = app();
    seed_played_today(&docs, "u1", 2).await;

    let first = submit_ok(&state, request("u1", 220, false)).await;
    assert!(first.attempt_saved);
    assert!(first.is_daily_best);
    assert_eq!(first.rank, 1);
    assert_eq!(first.attempts_remaining, 2);

    let second = submit_ok(&state, request("u1", 190, false)).await;
    assert!(second.is_daily_best);
    assert_eq!(second.attempts_remaining, 1);

    let third = submit_ok(&state, request("u1", 205, false)).await;
    assert!(third.attempt_saved);
    assert!(!third.is_daily_best);
    assert_eq!(third.attempts_remaining, 0);

    let row = docs
        .daily_best("u1", &clock::current_day())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.best_ms, 190);
    assert_eq!(row.attempts_used, 2);
    // The rank snapshot was attached along the way.
    assert_eq!(row.global_rank, Some(1));

    match submission::submit(&state, request("u1", 180, false)).await.unwrap() {
        SubmissionOutcome::RateLimited => {}
        other => panic!("expected rate limit, got {other:?}"),
    }
    // The would-be personal best never reached the ledger.
    let row = docs
        .daily_best("u1", &clock::current_day())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.best_ms, 190);
}

#[tokio::test]
async fn false_start_consumes_quota_but_never_ranks() {
    let (state, docs) = app();
    let day = clock::current_day();

    let done = submit_ok(&state, request("u1", 0, true)).await;
    assert!(!done.attempt_saved);
    assert!(!done.is_daily_best);
    assert_eq!(done.rank, 0);
    assert_eq!(done.percentile, 0.0);
    assert_eq!(done.attempts_remaining, 2);

    // Persisted as an attempt with the zero sentinel, absent from the ledger.
    assert_eq!(docs.count_attempts("u1", &day).await.unwrap(), 1);
    assert!(docs.daily_best("u1", &day).await.unwrap().is_none());
    assert_eq!(state.leaderboard.rank(&day, "u1").await.unwrap().rank, None);

    // The user record still advanced.
    let user = docs.user("u1").await.unwrap().unwrap();
    assert_eq!(user.total_attempts, 1);
    assert_eq!(user.current_streak, 1);
    assert_eq!(user.all_time_best_ms, None);
}

#[tokio::test]
async fn rejected_attempt_consumes_no_quota() {
    let (state, docs) = app();
    let day = clock::current_day();

    match submission::submit(&state, request("u1", 2500, false)).await.unwrap() {
        SubmissionOutcome::Rejected { flags } => {
            assert_eq!(flags, vec![Flag::InvalidRange]);
        }
        other => panic!("expected rejection, got {other:?}"),
    }

    assert_eq!(docs.count_attempts("u1", &day).await.unwrap(), 0);
    let done = submit_ok(&state, request("u1", 300, false)).await;
    // Full quota was still available after the rejection.
    assert_eq!(done.attempts_remaining, 2);
}

#[tokio::test]
async fn first_contact_creates_a_guest() {
    let (state, docs) = app();

    let done = submit_ok(&state, request("new-player", 250, false)).await;
    assert!(done.attempt_saved);

    let user = docs.user("new-player").await.unwrap().unwrap();
    assert!(user.username.starts_with("Player"));
    assert!(!user.verified);
    assert_eq!(user.current_streak, 1);
    assert_eq!(user.longest_streak, 1);
    assert_eq!(user.total_attempts, 1);
    assert_eq!(user.all_time_best_ms, Some(250));
    assert_eq!(user.last_played_day, Some(clock::current_day()));
}

#[tokio::test]
async fn personal_best_tracking_ignores_slower_runs() {
    let (state, docs) = app();
    seed_played_today(&docs, "u1", 7).await; // quota 5

    submit_ok(&state, request("u1", 300, false)).await;
    submit_ok(&state, request("u1", 210, false)).await;
    submit_ok(&state, request("u1", 260, false)).await;

    let user = docs.user("u1").await.unwrap().unwrap();
    assert_eq!(user.all_time_best_ms, Some(210));
    assert_eq!(user.total_attempts, 3);
}

#[tokio::test]
async fn streak_extends_and_raises_quota_next_day() {
    let (state, docs) = app();
    let yesterday = clock::day_key(Utc::now().date_naive() - chrono::Duration::days(1));

    let mut user = User::new_guest("u1".into(), "runner".into(), Utc::now());
    user.current_streak = 2;
    user.longest_streak = 4;
    user.last_played_day = Some(yesterday);
    docs.create_user(&user).await.unwrap();

    let done = submit_ok(&state, request("u1", 240, false)).await;

    let user = docs.user("u1").await.unwrap().unwrap();
    assert_eq!(user.current_streak, 3);
    assert_eq!(user.longest_streak, 4);
    // The three-day streak unlocks a fourth slot, reported post-increment.
    assert_eq!(done.attempts_remaining, 3);
}

#[tokio::test]
async fn ranks_multiple_users_with_percentiles() {
    let (state, _docs) = app();
    let field = [("a", 180), ("b", 220), ("c", 205), ("d", 260)];
    let mut last = Completed {
        attempt_saved: false,
        is_daily_best: false,
        percentile: 0.0,
        rank: 0,
        attempts_remaining: 0,
    };
    for (user, ms) in field {
        last = submit_ok(&state, request(user, ms, false)).await;
    }

    // Last submitter is the slowest of four.
    assert_eq!(last.rank, 4);
    assert_eq!(last.percentile, 0.0);

    let day = clock::current_day();
    let info = state.leaderboard.rank(&day, "a").await.unwrap();
    assert_eq!(info.rank, Some(1));
    assert_eq!(info.percentile, 75.0);
    assert_eq!(info.total, 4);

    let top = state.leaderboard.top(&day, 10).await.unwrap();
    let order: Vec<&str> = top.iter().map(|e| e.user_id.as_str()).collect();
    assert_eq!(order, vec!["a", "c", "b", "d"]);
}

#[tokio::test]
async fn degraded_fast_store_is_invisible_to_submitters() {
    let docs = Arc::new(MemoryStorage::default());
    let state = app_with(docs.clone(), FastPath::disabled());

    let first = submit_ok(&state, request("a", 200, false)).await;
    assert!(first.is_daily_best);
    assert_eq!(first.rank, 1);

    let second = submit_ok(&state, request("b", 180, false)).await;
    assert_eq!(second.rank, 1);
    assert_eq!(second.percentile, 50.0);

    let third = submit_ok(&state, request("a", 250, false)).await;
    assert!(!third.is_daily_best);
    assert_eq!(third.rank, 2);

    // Quota enforcement also survives on the durable path.
    submit_ok(&state, request("a", 230, false)).await;
    match submission::submit(&state, request("a", 190, false)).await.unwrap() {
        SubmissionOutcome::RateLimited => {}
        other => panic!("expected rate limit, got {other:?}"),
    }
}

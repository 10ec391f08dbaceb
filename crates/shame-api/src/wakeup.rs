//! Wake-up challenges, scoring and history.

use axum::{
    Extension, Json,
    extract::{Query, State},
};
use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use rusqlite::Connection;
use tracing::info;
use uuid::Uuid;

use shame_db::models::{ChallengeRow, ScoreRow, UserRow, WakeUpRow};
use shame_db::queries::{feed as feed_q, friends as friends_q, users, wakeups};
use shame_engine::{GameConfig, challenge, feed, schedule, scoring};
use shame_types::api::{
    ChallengeResponse, Claims, HistoryQuery, SubmitAnswerRequest, SubmitAnswerResponse,
    TodayResponse,
};
use shame_types::models::{DailyScore, FeedItemKind, WakeUpLog};

use crate::{AppState, AppStateInner, convert, error::ApiError, notifications, run_blocking};

const MAX_HISTORY_DAYS: u32 = 31;

/// A logged wake-up that friends should hear about.
pub(crate) struct WakeUpNotice {
    pub user_id: Uuid,
    pub display_name: String,
    pub time: String,
    pub feed_item_id: Uuid,
    pub friends: Vec<Uuid>,
}

pub(crate) struct AnswerOutcome {
    pub response: SubmitAnswerResponse,
    pub notice: Option<WakeUpNotice>,
}

fn load_user(conn: &Connection, user_id: &str) -> Result<UserRow, ApiError> {
    users::user_by_id(conn, user_id)?.ok_or_else(|| ApiError::not_found("user not found"))
}

/// The user's current local calendar day.
pub(crate) fn user_today(user: &UserRow, now: DateTime<Utc>) -> Result<NaiveDate, ApiError> {
    let offset = schedule::user_offset(user.utc_offset_minutes)?;
    Ok(schedule::local_date(now, offset))
}

/// `user` with `current_streak` as of `now`. The stored value only moves on
/// wake-up, so a streak whose last logged day is before yesterday reads as 0.
pub(crate) fn with_current_streak(
    conn: &Connection,
    mut user: UserRow,
    now: DateTime<Utc>,
) -> anyhow::Result<UserRow> {
    if user.current_streak == 0 {
        return Ok(user);
    }
    let today = schedule::local_date(now, schedule::user_offset(user.utc_offset_minutes)?);
    let logged_today = wakeups::wake_up_on(conn, &user.id, &convert::date_key(today))?.is_some();
    let logged_yesterday = match today.pred_opt() {
        Some(prev) => wakeups::wake_up_on(conn, &user.id, &convert::date_key(prev))?.is_some(),
        None => false,
    };
    user.current_streak = scoring::streak_as_of(user.current_streak, logged_today, logged_yesterday);
    Ok(user)
}

// -- Operations --

/// Stores a fresh challenge as the user's pending one, replacing any other.
pub(crate) fn create_challenge<R: Rng + ?Sized>(
    state: &AppStateInner,
    user_id: &str,
    rng: &mut R,
    now: DateTime<Utc>,
) -> Result<ChallengeResponse, ApiError> {
    state.db.transaction(|tx| {
        let user = load_user(tx, user_id)?;
        let today = convert::date_key(user_today(&user, now)?);
        if wakeups::wake_up_on(tx, user_id, &today)?.is_some() {
            return Err(ApiError::conflict("already woke up today"));
        }

        let problem = challenge::generate(rng, &state.config);
        wakeups::upsert_challenge(
            tx,
            &ChallengeRow {
                user_id: user_id.to_string(),
                operand1: problem.operand1,
                operand2: problem.operand2,
                operation: problem.operation.as_str().to_string(),
                correct_answer: problem.correct_answer,
                created_at: convert::timestamp(now),
            },
        )?;
        Ok(convert::challenge_response(&problem))
    })
}

/// Checks an answer against the pending challenge. A correct answer logs
/// the wake-up, scores the day and posts to the feed in one transaction.
pub(crate) fn answer_challenge(
    state: &AppStateInner,
    user_id: &str,
    answer: i64,
    now: DateTime<Utc>,
) -> Result<AnswerOutcome, ApiError> {
    let config = &state.config;
    state.db.transaction(|tx| {
        let pending = wakeups::pending_challenge(tx, user_id)?
            .ok_or_else(|| ApiError::not_found("no pending challenge"))?;
        let problem = convert::math_problem(&pending)?;
        if !challenge::is_correct(&problem, answer) {
            return Ok(AnswerOutcome {
                response: SubmitAnswerResponse {
                    correct: false,
                    wake_up: None,
                    score: None,
                },
                notice: None,
            });
        }

        let user = load_user(tx, user_id)?;
        let offset = schedule::user_offset(user.utc_offset_minutes)?;
        let local = schedule::local_time(now, offset);
        let date = local.date_naive();
        let date_key = convert::date_key(date);
        if wakeups::wake_up_on(tx, user_id, &date_key)?.is_some() {
            return Err(ApiError::conflict("already woke up today"));
        }

        let logged_previous_day = match date.pred_opt() {
            Some(prev) => wakeups::wake_up_on(tx, user_id, &convert::date_key(prev))?.is_some(),
            None => false,
        };
        let streak = scoring::next_streak(user.current_streak, logged_previous_day);
        let longest = user.longest_streak.max(streak);

        // Shames received before getting up still count against the day.
        let shames_so_far = friends_q::shames_on(tx, user_id, &date_key)?;
        let goal = schedule::parse_time_of_day(&user.sleep_goal)?;
        let minutes_late = schedule::minutes_late(goal, local.time());
        let breakdown = scoring::compute_daily_score(minutes_late, streak, shames_so_far, config);

        let created_at = convert::timestamp(now);
        let log = WakeUpRow {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            local_date: date_key.clone(),
            timestamp: created_at.clone(),
            goal_time: user.sleep_goal.clone(),
            actual_time: local.format("%H:%M").to_string(),
            math_problem_correct: true,
            shame_count: shames_so_far,
        };
        wakeups::insert_wake_up(tx, &log)?;
        users::update_streaks(tx, user_id, streak, longest)?;

        let score = convert::score_row(
            Uuid::new_v4().to_string(),
            user_id,
            &date_key,
            &breakdown,
            created_at.clone(),
        );
        wakeups::insert_score(tx, &score)?;
        users::add_to_total_score(tx, user_id, breakdown.score)?;
        wakeups::delete_challenge(tx, user_id)?;

        let feed_item_id = Uuid::new_v4();
        feed_q::insert_feed_item(
            tx,
            &feed_item_id.to_string(),
            user_id,
            FeedItemKind::WakeUp.as_str(),
            &feed::wake_up_message(&user.display_name, local.time()),
            None,
            &created_at,
        )?;
        if let Some(achievement) = feed::achievement_for_streak(streak) {
            feed_q::insert_feed_item(
                tx,
                &Uuid::new_v4().to_string(),
                user_id,
                FeedItemKind::Achievement.as_str(),
                &feed::achievement_message(&user.display_name, achievement),
                None,
                &created_at,
            )?;
        }

        let friends = friends_q::friend_ids(tx, user_id)?
            .iter()
            .map(|id| convert::parse_id(id))
            .collect::<anyhow::Result<Vec<_>>>()?;

        info!(
            "{} woke up at {} (streak {}, score {})",
            user.display_name, log.actual_time, streak, breakdown.score
        );

        Ok(AnswerOutcome {
            response: SubmitAnswerResponse {
                correct: true,
                wake_up: Some(convert::wake_up_log(&log)?),
                score: Some(convert::daily_score(&score)?),
            },
            notice: Some(WakeUpNotice {
                user_id: convert::parse_id(user_id)?,
                display_name: user.display_name,
                time: feed::display_time(local.time()),
                feed_item_id,
                friends,
            }),
        })
    })
}

/// Applies one shame deduction to the target's score for `local_date`, if
/// they already have one. Returns the updated score row.
pub(crate) fn apply_shame_to_day(
    conn: &Connection,
    target_id: &str,
    local_date: &str,
    config: &GameConfig,
) -> Result<Option<ScoreRow>, ApiError> {
    wakeups::increment_wake_up_shame(conn, target_id, local_date)?;

    let Some(mut row) = wakeups::score_on(conn, target_id, local_date)? else {
        return Ok(None);
    };
    let before = convert::breakdown(&row);
    let after = scoring::apply_shame(&before, config);
    row.shame_count = after.shame_count;
    row.shame_deductions = after.shame_deductions;
    row.score = after.score;
    wakeups::update_score_shame(conn, &row)?;

    // Only the points actually lost come off the lifetime total.
    users::add_to_total_score(conn, target_id, after.score - before.score)?;
    Ok(Some(row))
}

pub(crate) fn today_state(
    state: &AppStateInner,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<TodayResponse, ApiError> {
    state.db.with_conn(|conn| {
        let user = users::user_by_id(conn, user_id)?
            .ok_or_else(|| anyhow::anyhow!("user {user_id} vanished"))?;
        let offset = schedule::user_offset(user.utc_offset_minutes)?;
        let date = schedule::local_date(now, offset);
        let key = convert::date_key(date);

        let wake_up = wakeups::wake_up_on(conn, user_id, &key)?
            .as_ref()
            .map(convert::wake_up_log)
            .transpose()?;
        let score = wakeups::score_on(conn, user_id, &key)?
            .as_ref()
            .map(convert::daily_score)
            .transpose()?;
        let pending_challenge = match wakeups::pending_challenge(conn, user_id)? {
            Some(row) if wake_up.is_none() => {
                Some(convert::challenge_response(&convert::math_problem(&row)?))
            }
            _ => None,
        };

        Ok(TodayResponse {
            date,
            can_wake_up: wake_up.is_none(),
            wake_up,
            score,
            pending_challenge,
        })
    })
    .map_err(ApiError::from)
}

fn validate_days(days: u32) -> Result<u32, ApiError> {
    if !(1..=MAX_HISTORY_DAYS).contains(&days) {
        return Err(ApiError::validation(format!(
            "days must be between 1 and {MAX_HISTORY_DAYS}"
        )));
    }
    Ok(days)
}

/// Oldest local date covered by a `days`-long window ending today.
fn window_start(user: &UserRow, days: u32, now: DateTime<Utc>) -> Result<String, ApiError> {
    let today = user_today(user, now)?;
    let start = schedule::recent_dates(today, days)
        .last()
        .copied()
        .unwrap_or(today);
    Ok(convert::date_key(start))
}

pub(crate) fn wake_ups_for_days(
    state: &AppStateInner,
    user_id: &str,
    days: u32,
    now: DateTime<Utc>,
) -> Result<Vec<WakeUpLog>, ApiError> {
    let days = validate_days(days)?;
    state.db.transaction(|tx| {
        let user = load_user(tx, user_id)?;
        let from = window_start(&user, days, now)?;
        let rows = wakeups::wake_ups_since(tx, user_id, &from)?;
        Ok(rows
            .iter()
            .map(convert::wake_up_log)
            .collect::<anyhow::Result<Vec<_>>>()?)
    })
}

pub(crate) fn scores_for_days(
    state: &AppStateInner,
    user_id: &str,
    days: u32,
    now: DateTime<Utc>,
) -> Result<Vec<DailyScore>, ApiError> {
    let days = validate_days(days)?;
    state.db.transaction(|tx| {
        let user = load_user(tx, user_id)?;
        let from = window_start(&user, days, now)?;
        let rows = wakeups::scores_since(tx, user_id, &from)?;
        Ok(rows
            .iter()
            .map(convert::daily_score)
            .collect::<anyhow::Result<Vec<_>>>()?)
    })
}

// -- Handlers --

pub async fn issue_challenge(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ChallengeResponse>, ApiError> {
    let uid = claims.sub.to_string();
    let challenge = run_blocking(&state, move |s| {
        create_challenge(s, &uid, &mut rand::rng(), Utc::now())
    })
    .await?;
    Ok(Json(challenge))
}

pub async fn submit_answer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitAnswerRequest>,
) -> Result<Json<SubmitAnswerResponse>, ApiError> {
    let uid = claims.sub.to_string();
    let outcome = run_blocking(&state, move |s| {
        answer_challenge(s, &uid, req.answer, Utc::now())
    })
    .await?;

    if let Some(notice) = outcome.notice {
        notifications::notify_wake_up(&state.dispatcher, notice).await;
    }

    Ok(Json(outcome.response))
}

pub async fn today(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<TodayResponse>, ApiError> {
    let uid = claims.sub.to_string();
    let today = run_blocking(&state, move |s| today_state(s, &uid, Utc::now())).await?;
    Ok(Json(today))
}

pub async fn wake_up_history(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<WakeUpLog>>, ApiError> {
    let uid = claims.sub.to_string();
    let logs = run_blocking(&state, move |s| {
        wake_ups_for_days(s, &uid, query.days, Utc::now())
    })
    .await?;
    Ok(Json(logs))
}

pub async fn score_history(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<DailyScore>>, ApiError> {
    let uid = claims.sub.to_string();
    let scores = run_blocking(&state, move |s| {
        scores_for_days(s, &uid, query.days, Utc::now())
    })
    .await?;
    Ok(Json(scores))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{TestUser, state, ts};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn solve(state: &AppStateInner, user: &TestUser, now: DateTime<Utc>) -> AnswerOutcome {
        let mut rng = StdRng::seed_from_u64(7);
        create_challenge(state, &user.id, &mut rng, now).unwrap();
        let answer = state
            .db
            .with_conn(|c| wakeups::pending_challenge(c, &user.id))
            .unwrap()
            .unwrap()
            .correct_answer;
        answer_challenge(state, &user.id, answer, now).unwrap()
    }

    #[test]
    fn wrong_answer_keeps_challenge_pending() {
        let state = state();
        let alice = TestUser::new(&state, "Alice");
        let now = ts(2026, 3, 2, 7, 0);
        let challenge = create_challenge(&state, &alice.id, &mut StdRng::seed_from_u64(1), now).unwrap();
        assert!((25..=95).contains(&challenge.operand1));

        let outcome = answer_challenge(&state, &alice.id, -1, now).unwrap();
        assert!(!outcome.response.correct);
        assert!(outcome.notice.is_none());

        let today = today_state(&state, &alice.id, now).unwrap();
        assert!(today.can_wake_up);
        assert_eq!(today.pending_challenge.unwrap().question, challenge.question);
    }

    #[test]
    fn answer_without_challenge_is_not_found() {
        let state = state();
        let alice = TestUser::new(&state, "Alice");
        let result = answer_challenge(&state, &alice.id, 85, ts(2026, 3, 2, 7, 0));
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[test]
    fn correct_answer_logs_scores_and_posts() {
        let state = state();
        let alice = TestUser::new(&state, "Alice");
        let bob = TestUser::new(&state, "Bob");
        alice.befriend(&state, &bob);

        // Goal 7:00 AM, up at 7:10 -> 4 started 3-minute blocks late.
        let outcome = solve(&state, &alice, ts(2026, 3, 2, 7, 10));
        assert!(outcome.response.correct);
        let score = outcome.response.score.unwrap();
        assert_eq!(score.wake_up_points, 36);
        assert_eq!(score.consistency_points, 2);
        assert_eq!(score.sleep_duration_points, 10);
        assert_eq!(score.score, 48);

        let notice = outcome.notice.unwrap();
        assert_eq!(notice.friends, vec![bob.uuid()]);
        assert_eq!(notice.time, "7:10 AM");

        let user = state.db.get_user_by_id(&alice.id).unwrap().unwrap();
        assert_eq!(user.total_score, 48);
        assert_eq!(user.current_streak, 1);

        let feed = state.db.with_conn(|c| feed_q::feed_for_user(c, &bob.id, 50)).unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].message, "Alice woke up at 7:10 AM after solving MATH! 🌅");

        let today = today_state(&state, &alice.id, ts(2026, 3, 2, 8, 0)).unwrap();
        assert!(!today.can_wake_up);
        assert!(today.pending_challenge.is_none());
    }

    #[test]
    fn second_wake_up_same_day_is_rejected() {
        let state = state();
        let alice = TestUser::new(&state, "Alice");
        solve(&state, &alice, ts(2026, 3, 2, 6, 50));

        let again = create_challenge(
            &state,
            &alice.id,
            &mut StdRng::seed_from_u64(2),
            ts(2026, 3, 2, 9, 0),
        );
        assert!(matches!(again, Err(ApiError::Conflict(_))));
    }

    #[test]
    fn streak_grows_on_consecutive_days_and_resets_after_gap() {
        let state = state();
        let alice = TestUser::new(&state, "Alice");
        for day in 1..=3 {
            solve(&state, &alice, ts(2026, 3, day, 6, 0));
        }
        let user = state.db.get_user_by_id(&alice.id).unwrap().unwrap();
        assert_eq!((user.current_streak, user.longest_streak), (3, 3));

        solve(&state, &alice, ts(2026, 3, 5, 6, 0));
        let user = state.db.get_user_by_id(&alice.id).unwrap().unwrap();
        assert_eq!((user.current_streak, user.longest_streak), (1, 3));
    }

    #[test]
    fn reported_streak_lapses_after_missed_days() {
        let state = state();
        let alice = TestUser::new(&state, "Alice");
        let bob = TestUser::new(&state, "Bob");
        alice.befriend(&state, &bob);
        for day in 1..=5 {
            solve(&state, &alice, ts(2026, 3, day, 6, 0));
        }
        let streak_on = |now| {
            let user = state.db.get_user_by_id(&alice.id).unwrap().unwrap();
            state
                .db
                .with_conn(|c| with_current_streak(c, user, now))
                .unwrap()
                .current_streak
        };
        assert_eq!(streak_on(ts(2026, 3, 5, 9, 0)), 5);
        assert_eq!(streak_on(ts(2026, 3, 6, 9, 0)), 5);
        assert_eq!(streak_on(ts(2026, 3, 15, 9, 0)), 0);
        let friends = crate::friends::friends_of(&state, &bob.id, ts(2026, 3, 15, 9, 0)).unwrap();
        assert_eq!(friends[0].user.current_streak, 0);

        let user = state.db.get_user_by_id(&alice.id).unwrap().unwrap();
        assert_eq!(user.longest_streak, 5);
    }

    #[test]
    fn seventh_day_unlocks_achievement() {
        let state = state();
        let alice = TestUser::new(&state, "Alice");
        for day in 1..=7 {
            solve(&state, &alice, ts(2026, 3, day, 6, 0));
        }
        let feed = state.db.with_conn(|c| feed_q::feed_for_user(c, &alice.id, 50)).unwrap();
        let achievements: Vec<_> = feed.iter().filter(|f| f.kind == "achievement").collect();
        assert_eq!(achievements.len(), 1);
        assert!(achievements[0].message.contains("Early Bird"));
    }

    #[test]
    fn local_day_follows_user_offset() {
        let state = state();
        // UTC-5: 03:00 UTC on March 3rd is still March 2nd locally.
        let alice = TestUser::with_offset(&state, "Alice", -300);
        let outcome = solve(&state, &alice, ts(2026, 3, 3, 3, 0));
        let log = outcome.response.wake_up.unwrap();
        assert_eq!(log.date, NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
        assert_eq!(log.actual_time, "22:00");
    }

    #[test]
    fn shame_before_wake_up_is_counted_and_after_is_deducted() {
        let state = state();
        let alice = TestUser::new(&state, "Alice");
        let config = GameConfig::default();
        state
            .db
            .with_conn(|c| {
                friends_q::insert_shame_event(
                    c,
                    &shame_db::models::ShameEventRow {
                        id: Uuid::new_v4().to_string(),
                        target_user_id: alice.id.clone(),
                        shamer_user_id: alice.id.clone(),
                        local_date: "2026-03-02".into(),
                        points_deducted: 0,
                        created_at: convert::timestamp(ts(2026, 3, 2, 7, 40)),
                    },
                )
            })
            .unwrap();

        let outcome = solve(&state, &alice, ts(2026, 3, 2, 7, 0));
        let score = outcome.response.score.unwrap();
        assert_eq!(score.shame_count, 1);
        assert_eq!(score.score, 40 + 2 + 10 - 5);

        let updated = state
            .db
            .transaction(|tx| apply_shame_to_day(tx, &alice.id, "2026-03-02", &config))
            .unwrap()
            .unwrap();
        assert_eq!(updated.shame_count, 2);
        assert_eq!(updated.score, 42);
        let user = state.db.get_user_by_id(&alice.id).unwrap().unwrap();
        assert_eq!(user.total_score, 42);
        let log = state
            .db
            .with_conn(|c| wakeups::wake_up_on(c, &alice.id, "2026-03-02"))
            .unwrap()
            .unwrap();
        assert_eq!(log.shame_count, 2);
    }

    #[test]
    fn history_is_windowed_and_validated() {
        let state = state();
        let alice = TestUser::new(&state, "Alice");
        for day in [1, 5, 9] {
            solve(&state, &alice, ts(2026, 3, day, 6, 0));
        }
        let now = ts(2026, 3, 9, 12, 0);
        let week = scores_for_days(&state, &alice.id, 7, now).unwrap();
        let dates: Vec<_> = week.iter().map(|s| s.date.to_string()).collect();
        assert_eq!(dates, vec!["2026-03-09", "2026-03-05"]);
        assert_eq!(wake_ups_for_days(&state, &alice.id, 31, now).unwrap().len(), 3);
        assert!(matches!(
            scores_for_days(&state, &alice.id, 0, now),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            wake_ups_for_days(&state, &alice.id, 32, now),
            Err(ApiError::Validation(_))
        ));
    }
}

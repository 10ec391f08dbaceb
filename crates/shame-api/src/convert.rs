//! Row <-> API model conversions. Rows keep ids and timestamps as text;
//! a row that fails to parse is a storage bug and surfaces as an internal error.

use std::collections::HashMap;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use uuid::Uuid;

use shame_db::models::{
    ChallengeRow, CommentRow, FeedItemRow, FriendRequestRow, ReactionRow, ScoreRow, UserRow,
    WakeUpRow,
};
use shame_engine::challenge;
use shame_engine::scoring::ScoreBreakdown;
use shame_types::api::ChallengeResponse;
use shame_types::models::{
    DailyScore, FeedComment, FeedItem, FeedItemKind, FeedReaction, FriendRequest,
    FriendRequestStatus, MathOperation, MathProblem, Profile, PublicUser, ReactionType, WakeUpLog,
};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Fixed-width UTC timestamps sort lexically in chronological order.
pub fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("bad stored timestamp {s:?}"))?
        .with_timezone(&Utc))
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).with_context(|| format!("bad stored date {s:?}"))
}

pub fn parse_id(s: &str) -> Result<Uuid> {
    s.parse().with_context(|| format!("bad stored id {s:?}"))
}

pub fn public_user(row: &UserRow) -> Result<PublicUser> {
    Ok(PublicUser {
        id: parse_id(&row.id)?,
        display_name: row.display_name.clone(),
        sleep_goal: row.sleep_goal.clone(),
        bedtime_goal: row.bedtime_goal.clone(),
        total_score: row.total_score,
        current_streak: row.current_streak,
        longest_streak: row.longest_streak,
        created_at: parse_timestamp(&row.created_at)?,
    })
}

pub fn profile(row: &UserRow) -> Result<Profile> {
    Ok(Profile {
        id: parse_id(&row.id)?,
        email: row.email.clone(),
        display_name: row.display_name.clone(),
        sleep_goal: row.sleep_goal.clone(),
        bedtime_goal: row.bedtime_goal.clone(),
        utc_offset_minutes: row.utc_offset_minutes,
        push_enabled: row.push_token.is_some(),
        total_score: row.total_score,
        current_streak: row.current_streak,
        longest_streak: row.longest_streak,
        created_at: parse_timestamp(&row.created_at)?,
    })
}

pub fn math_problem(row: &ChallengeRow) -> Result<MathProblem> {
    let operation = MathOperation::parse(&row.operation)
        .ok_or_else(|| anyhow!("bad stored operation {:?}", row.operation))?;
    Ok(challenge::new_problem(row.operand1, row.operand2, operation))
}

/// What the client sees of a challenge. The answer never leaves the server.
pub fn challenge_response(problem: &MathProblem) -> ChallengeResponse {
    ChallengeResponse {
        operand1: problem.operand1,
        operand2: problem.operand2,
        operation: problem.operation,
        question: problem.question_text(),
    }
}

pub fn wake_up_log(row: &WakeUpRow) -> Result<WakeUpLog> {
    Ok(WakeUpLog {
        id: parse_id(&row.id)?,
        user_id: parse_id(&row.user_id)?,
        timestamp: parse_timestamp(&row.timestamp)?,
        date: parse_date(&row.local_date)?,
        goal_time: row.goal_time.clone(),
        actual_time: row.actual_time.clone(),
        math_problem_correct: row.math_problem_correct,
        shame_count: row.shame_count,
    })
}

pub fn daily_score(row: &ScoreRow) -> Result<DailyScore> {
    Ok(DailyScore {
        id: parse_id(&row.id)?,
        user_id: parse_id(&row.user_id)?,
        date: parse_date(&row.local_date)?,
        score: row.score,
        wake_up_points: row.wake_up_points,
        consistency_points: row.consistency_points,
        sleep_duration_points: row.sleep_duration_points,
        shame_deductions: row.shame_deductions,
        shame_count: row.shame_count,
    })
}

pub fn breakdown(row: &ScoreRow) -> ScoreBreakdown {
    ScoreBreakdown {
        wake_up_points: row.wake_up_points,
        consistency_points: row.consistency_points,
        sleep_duration_points: row.sleep_duration_points,
        shame_count: row.shame_count,
        shame_deductions: row.shame_deductions,
        score: row.score,
    }
}

pub fn score_row(
    id: String,
    user_id: &str,
    local_date: &str,
    breakdown: &ScoreBreakdown,
    created_at: String,
) -> ScoreRow {
    ScoreRow {
        id,
        user_id: user_id.to_string(),
        local_date: local_date.to_string(),
        wake_up_points: breakdown.wake_up_points,
        consistency_points: breakdown.consistency_points,
        sleep_duration_points: breakdown.sleep_duration_points,
        shame_count: breakdown.shame_count,
        shame_deductions: breakdown.shame_deductions,
        score: breakdown.score,
        created_at,
    }
}

pub fn friend_request(row: &FriendRequestRow) -> Result<FriendRequest> {
    Ok(FriendRequest {
        id: parse_id(&row.id)?,
        from_user_id: parse_id(&row.from_user_id)?,
        from_display_name: row.from_display_name.clone(),
        to_user_id: parse_id(&row.to_user_id)?,
        to_display_name: row.to_display_name.clone(),
        status: FriendRequestStatus::parse(&row.status)
            .ok_or_else(|| anyhow!("bad stored request status {:?}", row.status))?,
        created_at: parse_timestamp(&row.created_at)?,
    })
}

/// Assembles feed items with their reactions and comments, keeping the
/// order of `rows`.
pub fn feed_items(
    rows: Vec<FeedItemRow>,
    reactions: Vec<ReactionRow>,
    comments: Vec<CommentRow>,
) -> Result<Vec<FeedItem>> {
    let mut reaction_map: HashMap<String, Vec<FeedReaction>> = HashMap::new();
    for r in reactions {
        let reaction = FeedReaction {
            user_id: parse_id(&r.user_id)?,
            display_name: r.display_name,
            reaction: ReactionType::parse(&r.reaction)
                .ok_or_else(|| anyhow!("bad stored reaction {:?}", r.reaction))?,
            created_at: parse_timestamp(&r.created_at)?,
        };
        reaction_map.entry(r.feed_item_id).or_default().push(reaction);
    }

    let mut comment_map: HashMap<String, Vec<FeedComment>> = HashMap::new();
    for c in comments {
        let comment = FeedComment {
            id: parse_id(&c.id)?,
            user_id: parse_id(&c.user_id)?,
            display_name: c.display_name,
            text: c.text,
            created_at: parse_timestamp(&c.created_at)?,
        };
        comment_map.entry(c.feed_item_id).or_default().push(comment);
    }

    rows.into_iter()
        .map(|row| {
            Ok(FeedItem {
                id: parse_id(&row.id)?,
                author_id: parse_id(&row.author_id)?,
                author_display_name: row.author_display_name,
                kind: FeedItemKind::parse(&row.kind)
                    .ok_or_else(|| anyhow!("bad stored feed kind {:?}", row.kind))?,
                message: row.message,
                actor_id: row.actor_id.as_deref().map(parse_id).transpose()?,
                created_at: parse_timestamp(&row.created_at)?,
                reactions: reaction_map.remove(&row.id).unwrap_or_default(),
                comments: comment_map.remove(&row.id).unwrap_or_default(),
            })
        })
        .collect()
}

//! Database row types. Each maps directly to a SQLite row.
//! Ids and timestamps stay as text; `shame-api::convert` maps them to API models.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub sleep_goal: String,
    pub bedtime_goal: String,
    pub utc_offset_minutes: i32,
    pub push_token: Option<String>,
    pub total_score: i64,
    pub current_streak: i64,
    pub longest_streak: i64,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct ChallengeRow {
    pub user_id: String,
    pub operand1: i64,
    pub operand2: i64,
    pub operation: String,
    pub correct_answer: i64,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct WakeUpRow {
    pub id: String,
    pub user_id: String,
    pub local_date: String,
    pub timestamp: String,
    pub goal_time: String,
    pub actual_time: String,
    pub math_problem_correct: bool,
    pub shame_count: i64,
}

#[derive(Debug, Clone)]
pub struct ScoreRow {
    pub id: String,
    pub user_id: String,
    pub local_date: String,
    pub wake_up_points: i64,
    pub consistency_points: i64,
    pub sleep_duration_points: i64,
    pub shame_count: i64,
    pub shame_deductions: i64,
    pub score: i64,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct FriendRequestRow {
    pub id: String,
    pub from_user_id: String,
    pub from_display_name: String,
    pub to_user_id: String,
    pub to_display_name: String,
    pub status: String,
    pub created_at: String,
}

pub struct ShameEventRow {
    pub id: String,
    pub target_user_id: String,
    pub shamer_user_id: String,
    pub local_date: String,
    pub points_deducted: i64,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct FeedItemRow {
    pub id: String,
    pub author_id: String,
    pub author_display_name: String,
    pub kind: String,
    pub message: String,
    pub actor_id: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct ReactionRow {
    pub feed_item_id: String,
    pub user_id: String,
    pub display_name: String,
    pub reaction: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct CommentRow {
    pub id: String,
    pub feed_item_id: String,
    pub user_id: String,
    pub display_name: String,
    pub text: String,
    pub created_at: String,
}

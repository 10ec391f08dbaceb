use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    DailyScore, FeedItem, FriendRequest, FriendshipStatus, MathOperation, Profile, PublicUser,
    ReactionType, WakeUpLog,
};

// -- JWT Claims --

/// JWT claims shared by shame-api (REST middleware) and shame-gateway
/// (WebSocket Identify). `sid` points at a row in the sessions table so
/// tokens can be revoked on sign-out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub sid: Uuid,
    pub display_name: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub sleep_goal: Option<String>,
    pub bedtime_goal: Option<String>,
    pub utc_offset_minutes: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub token: String,
    pub profile: Profile,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub sleep_goal: Option<String>,
    pub bedtime_goal: Option<String>,
    pub utc_offset_minutes: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

// -- Wake-up --

/// A pending challenge as shown to the client. The answer stays server-side.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChallengeResponse {
    pub operand1: i64,
    pub operand2: i64,
    pub operation: MathOperation,
    pub question: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitAnswerRequest {
    pub answer: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitAnswerResponse {
    pub correct: bool,
    pub wake_up: Option<WakeUpLog>,
    pub score: Option<DailyScore>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TodayResponse {
    pub date: NaiveDate,
    pub can_wake_up: bool,
    pub wake_up: Option<WakeUpLog>,
    pub score: Option<DailyScore>,
    pub pending_challenge: Option<ChallengeResponse>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_days")]
    pub days: u32,
}

fn default_history_days() -> u32 {
    7
}

// -- Friends --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendFriendRequest {
    pub to_user_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FriendRequestsResponse {
    pub incoming: Vec<FriendRequest>,
    pub outgoing: Vec<FriendRequest>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FriendEntry {
    pub user: PublicUser,
    pub can_shame: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FriendshipStatusResponse {
    pub user_id: Uuid,
    pub status: FriendshipStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShameResponse {
    pub feed_item: FeedItem,
    /// The target's score after the deduction, if they had one today.
    pub target_score: Option<DailyScore>,
}

// -- Feed --

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReactRequest {
    pub reaction: ReactionType,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommentRequest {
    pub text: String,
}

// -- Notifications --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PushTokenRequest {
    pub token: Option<String>,
}

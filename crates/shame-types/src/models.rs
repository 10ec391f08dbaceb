use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Profile as other users see it. Never carries the email address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub display_name: String,
    pub sleep_goal: String,
    pub bedtime_goal: String,
    pub total_score: i64,
    pub current_streak: i64,
    pub longest_streak: i64,
    pub created_at: DateTime<Utc>,
}

/// The signed-in user's own profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub sleep_goal: String,
    pub bedtime_goal: String,
    pub utc_offset_minutes: i32,
    pub push_enabled: bool,
    pub total_score: i64,
    pub current_streak: i64,
    pub longest_streak: i64,
    pub created_at: DateTime<Utc>,
}

// -- Wake-up challenge --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MathOperation {
    Addition,
    Subtraction,
}

impl MathOperation {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Addition => "+",
            Self::Subtraction => "-",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Addition => "addition",
            Self::Subtraction => "subtraction",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "addition" => Some(Self::Addition),
            "subtraction" => Some(Self::Subtraction),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MathProblem {
    pub operand1: i64,
    pub operand2: i64,
    pub operation: MathOperation,
    pub correct_answer: i64,
}

impl MathProblem {
    pub fn question_text(&self) -> String {
        format!("{} {} {} = ?", self.operand1, self.operation.symbol(), self.operand2)
    }
}

// -- Wake-ups and scores --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WakeUpLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Calendar day in the user's own UTC offset.
    pub date: NaiveDate,
    pub goal_time: String,
    pub actual_time: String,
    pub math_problem_correct: bool,
    pub shame_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyScore {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub score: i64,
    pub wake_up_points: i64,
    pub consistency_points: i64,
    pub sleep_duration_points: i64,
    pub shame_deductions: i64,
    pub shame_count: i64,
}

// -- Friends --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FriendRequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl FriendRequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendRequest {
    pub id: Uuid,
    pub from_user_id: Uuid,
    pub from_display_name: String,
    pub to_user_id: Uuid,
    pub to_display_name: String,
    pub status: FriendRequestStatus,
    pub created_at: DateTime<Utc>,
}

/// Relationship between the caller and another user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FriendshipStatus {
    None,
    Friends,
    PendingIncoming,
    PendingOutgoing,
}

// -- Feed --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedItemKind {
    WakeUp,
    Shame,
    Achievement,
}

impl FeedItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WakeUp => "wake_up",
            Self::Shame => "shame",
            Self::Achievement => "achievement",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "wake_up" => Some(Self::WakeUp),
            "shame" => Some(Self::Shame),
            "achievement" => Some(Self::Achievement),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionType {
    Applause,
    Muscle,
    Fire,
}

impl ReactionType {
    pub fn emoji(self) -> &'static str {
        match self {
            Self::Applause => "👏",
            Self::Muscle => "💪",
            Self::Fire => "🔥",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Applause => "applause",
            Self::Muscle => "muscle",
            Self::Fire => "fire",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "applause" => Some(Self::Applause),
            "muscle" => Some(Self::Muscle),
            "fire" => Some(Self::Fire),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedReaction {
    pub user_id: Uuid,
    pub display_name: String,
    pub reaction: ReactionType,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedComment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub display_name: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_display_name: String,
    pub kind: FeedItemKind,
    pub message: String,
    /// Who caused the item when it differs from the author (the shamer).
    pub actor_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub reactions: Vec<FeedReaction>,
    pub comments: Vec<FeedComment>,
}

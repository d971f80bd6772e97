use std::fmt;

use chrono::{DateTime, Utc};
use derive_more::{Display, From, FromStr, Into};
use serde::{Deserialize, Serialize};

#[derive(
    Debug,
    Serialize,
    Deserialize,
    From,
    Into,
    FromStr,
    Display,
    Clone,
    Copy,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
)]
#[serde(transparent)]
#[display("{_0}")]
pub struct UserId(pub i64);

#[derive(
    Debug,
    Serialize,
    Deserialize,
    From,
    Into,
    FromStr,
    Display,
    Clone,
    Copy,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
)]
#[serde(transparent)]
#[display("{_0}")]
pub struct QuestId(pub i64);

pub const EMAIL_MAX_CHARS: usize = 30;
pub const PASSWORD_MIN_CHARS: usize = 6;
pub const PASSWORD_MAX_CHARS: usize = 20;
pub const USERNAME_MAX_CHARS: usize = 10;
pub const QUEST_TITLE_MAX_CHARS: usize = 100;
pub const QUEST_CATEGORY_MAX_CHARS: usize = 50;
pub const QUEST_URL_MAX_CHARS: usize = 2048;
pub const QUEST_MAX_PARTICIPANTS_LIMIT: i64 = 10_000;

#[derive(Clone, Serialize, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub username: String,
}

impl fmt::Debug for SignUpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignUpRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("username", &self.username)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignUpResponse {
    pub id: UserId,
    pub email: String,
    pub username: String,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LogInRequest {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LogInRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogInRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LogInResponse {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserInfo {
    pub email: String,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateUserNameRequest {
    pub username: String,
}

/// Fields a quest owner controls, used both for creation and for updates.
///
/// Everything is optional on the wire so that a missing field reaches
/// validation instead of failing request binding.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestFields {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub max_participants: i64,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub image: Option<Vec<u8>>,
    #[serde(default)]
    pub url: Option<String>,
}

/// GET /quests/{id}
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestInfo {
    pub id: QuestId,
    pub owner: UserId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub max_participants: u32,
    pub deadline: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub image: Option<Vec<u8>>,
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// live participation records at the time of the read
    pub participants: u32,
    pub remaining: u32,
}

/// Returned by join and cancel
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MembershipState {
    pub quest_id: QuestId,
    pub joined: bool,
    pub participants: u32,
    pub remaining: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    #[display("validation")]
    Validation,
    #[display("invalid_token")]
    InvalidToken,
    #[display("expired_token")]
    ExpiredToken,
    #[display("malformed_token")]
    MalformedToken,
    #[display("forbidden")]
    Forbidden,
    #[display("not_found")]
    NotFound,
    #[display("already_joined")]
    AlreadyJoined,
    #[display("capacity_exceeded")]
    CapacityExceeded,
    #[display("duplicate_email")]
    DuplicateEmail,
    #[display("credential_mismatch")]
    CredentialMismatch,
    #[display("timeout")]
    Timeout,
    #[display("storage")]
    Storage,
    #[display("internal")]
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

//! Persistence interface.
//!
//! Implementations own the hard guarantees: unique email, one membership per
//! (user, quest), membership count never above capacity and cascading
//! deletes. Services may check those conditions early for a nicer error, but
//! only the store's answer is authoritative.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::error::Entity;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{QuestId, UserId};
use thiserror::Error;

/// Storage-level constraints that can refuse a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    UserEmail,
    Membership,
    Capacity,
    FrozenCapacity,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("constraint violated: {0:?}")]
    Conflict(Constraint),
    #[error("referenced {0} does not exist")]
    MissingReference(Entity),
    #[error("storage timed out")]
    Timeout,
    #[error("{0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub username: &'a str,
    pub password_hash: &'a str,
}

/// Quest columns after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestData {
    pub title: String,
    pub description: String,
    pub category: String,
    pub max_participants: u32,
    pub deadline: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub image: Option<Vec<u8>>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestRecord {
    pub id: QuestId,
    pub owner: UserId,
    pub data: QuestData,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A quest together with its live participant count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestRow {
    pub quest: QuestRecord,
    pub participants: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticipationRecord {
    pub id: i64,
    pub user_id: UserId,
    pub quest_id: QuestId,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestFilter {
    All,
    OwnedBy(UserId),
    JoinedBy(UserId),
}

/// Every listing is ordered by creation time, newest first, ties broken by id (also descending).
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_user(&self, user: NewUser<'_>) -> StoreResult<UserRecord>;

    async fn user_by_id(&self, user_id: UserId) -> StoreResult<Option<UserRecord>>;

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>>;

    /// `false` when the user does not exist.
    async fn update_username(&self, user_id: UserId, username: &str) -> StoreResult<bool>;

    /// Removes the user with every quest they own and every membership that
    /// references them or their quests. `false` when the user does not exist.
    async fn delete_user(&self, user_id: UserId) -> StoreResult<bool>;

    async fn insert_quest(
        &self,
        owner: UserId,
        data: &QuestData,
        now: DateTime<Utc>,
    ) -> StoreResult<QuestRecord>;

    async fn quest_by_id(&self, quest_id: QuestId) -> StoreResult<Option<QuestRow>>;

    /// Applies only if `owner` still owns `quest_id`; `None` otherwise.
    async fn update_quest(
        &self,
        quest_id: QuestId,
        owner: UserId,
        data: &QuestData,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<QuestRecord>>;

    /// Deletes the quest and its memberships as one unit. `false` when no
    /// quest owned by `owner` matched.
    async fn delete_quest(&self, quest_id: QuestId, owner: UserId) -> StoreResult<bool>;

    async fn list_quests(&self, filter: QuestFilter) -> StoreResult<Vec<QuestRow>>;

    async fn participant_count(&self, quest_id: QuestId) -> StoreResult<u32>;

    async fn participation(
        &self,
        user_id: UserId,
        quest_id: QuestId,
    ) -> StoreResult<Option<ParticipationRecord>>;

    /// Atomically refuses duplicates ([`Constraint::Membership`]) and inserts
    /// that would exceed the quest's capacity ([`Constraint::Capacity`]).
    async fn insert_participation(
        &self,
        user_id: UserId,
        quest_id: QuestId,
        now: DateTime<Utc>,
    ) -> StoreResult<ParticipationRecord>;

    /// `false` when there was no such membership.
    async fn delete_participation(&self, user_id: UserId, quest_id: QuestId) -> StoreResult<bool>;
}

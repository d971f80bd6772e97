use super::membership;
use crate::error::{Entity, ServiceError};
use crate::store::{QuestFilter, Store};
use chrono::Utc;
use common::{MembershipState, QuestId, QuestInfo, UserId};
use std::sync::Arc;

/// Joins and cancellations.
///
/// The checks done here only pick the error a caller sees in the common case.
/// Whether a membership is actually written is decided by
/// [`Store::insert_participation`], which refuses duplicates and overflow
/// atomically, so concurrent joins can never oversubscribe a quest.
pub struct ParticipationEngine {
    store: Arc<dyn Store>,
}

impl ParticipationEngine {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn join(
        &self,
        user_id: UserId,
        quest_id: QuestId,
    ) -> Result<MembershipState, ServiceError> {
        let row = self
            .store
            .quest_by_id(quest_id)
            .await?
            .ok_or(ServiceError::NotFound(Entity::Quest))?;

        if self.store.participation(user_id, quest_id).await?.is_some() {
            return Err(ServiceError::AlreadyJoined);
        }
        let capacity = row.quest.data.max_participants;
        if row.participants >= capacity {
            tracing::debug!(quest = %quest_id, capacity, "quest is full");
            return Err(ServiceError::CapacityExceeded);
        }

        self.store
            .insert_participation(user_id, quest_id, Utc::now())
            .await
            .inspect_err(|error| {
                tracing::debug!(%error, quest = %quest_id, user = %user_id, "join refused by store");
            })?;

        let participants = self.store.participant_count(quest_id).await?;
        tracing::info!(quest = %quest_id, user = %user_id, participants, "joined quest");
        Ok(membership(&row.quest, true, participants))
    }

    /// Not idempotent: cancelling a membership that does not exist, including
    /// one already removed together with its quest, is `NotFound`.
    pub async fn cancel(
        &self,
        user_id: UserId,
        quest_id: QuestId,
    ) -> Result<MembershipState, ServiceError> {
        if !self.store.delete_participation(user_id, quest_id).await? {
            return Err(ServiceError::NotFound(Entity::Participation));
        }
        tracing::info!(quest = %quest_id, user = %user_id, "cancelled participation");

        Ok(match self.store.quest_by_id(quest_id).await? {
            Some(row) => membership(&row.quest, false, row.participants),
            // quest was deleted right after the cancel
            None => MembershipState {
                quest_id,
                joined: false,
                participants: 0,
                remaining: 0,
            },
        })
    }

    pub async fn list_created_by_user(&self, user_id: UserId) -> Result<Vec<QuestInfo>, ServiceError> {
        let rows = self.store.list_quests(QuestFilter::OwnedBy(user_id)).await?;
        Ok(rows.into_iter().map(QuestInfo::from).collect())
    }

    pub async fn list_joined_by_user(&self, user_id: UserId) -> Result<Vec<QuestInfo>, ServiceError> {
        let rows = self.store.list_quests(QuestFilter::JoinedBy(user_id)).await?;
        Ok(rows.into_iter().map(QuestInfo::from).collect())
    }
}

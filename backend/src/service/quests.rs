use super::quest_info;
use crate::auth::AuthorizationGate;
use crate::error::{Entity, ServiceError, ValidationError};
use crate::store::{QuestFilter, QuestRow, Store};
use crate::validation::validate_quest;
use chrono::Utc;
use common::{QuestFields, QuestId, QuestInfo, UserId};
use std::sync::Arc;

pub struct QuestRepository {
    store: Arc<dyn Store>,
}

impl QuestRepository {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn existing(&self, quest_id: QuestId) -> Result<QuestRow, ServiceError> {
        self.store
            .quest_by_id(quest_id)
            .await?
            .ok_or(ServiceError::NotFound(Entity::Quest))
    }

    pub async fn create(&self, owner: UserId, fields: QuestFields) -> Result<QuestInfo, ServiceError> {
        let data = validate_quest(fields)?;
        let quest = self.store.insert_quest(owner, &data, Utc::now()).await?;
        tracing::info!(quest = %quest.id, %owner, "quest created");
        Ok(quest_info(quest, 0))
    }

    /// Existence and ownership are checked before the fields are looked at.
    pub async fn update(
        &self,
        requester: UserId,
        quest_id: QuestId,
        fields: QuestFields,
    ) -> Result<QuestInfo, ServiceError> {
        let current = self.existing(quest_id).await?;
        AuthorizationGate::authorize_owner(requester, current.quest.owner)?;

        let data = validate_quest(fields)?;
        if data.max_participants != current.quest.data.max_participants {
            return Err(ValidationError::new(
                "max_participants",
                "capacity cannot change after creation",
            )
            .into());
        }

        let quest = self
            .store
            .update_quest(quest_id, requester, &data, Utc::now())
            .await?
            .ok_or(ServiceError::NotFound(Entity::Quest))?;
        let participants = self.store.participant_count(quest_id).await?;
        tracing::info!(quest = %quest_id, "quest updated");
        Ok(quest_info(quest, participants))
    }

    /// Memberships of the quest go with it.
    pub async fn delete(&self, requester: UserId, quest_id: QuestId) -> Result<(), ServiceError> {
        let current = self.existing(quest_id).await?;
        AuthorizationGate::authorize_owner(requester, current.quest.owner)?;

        if !self.store.delete_quest(quest_id, requester).await? {
            return Err(ServiceError::NotFound(Entity::Quest));
        }
        tracing::info!(quest = %quest_id, "quest deleted");
        Ok(())
    }

    pub async fn get_by_id(&self, quest_id: QuestId) -> Result<QuestInfo, ServiceError> {
        Ok(self.existing(quest_id).await?.into())
    }

    pub async fn list_all(&self) -> Result<Vec<QuestInfo>, ServiceError> {
        let rows = self.store.list_quests(QuestFilter::All).await?;
        Ok(rows.into_iter().map(QuestInfo::from).collect())
    }
}

use super::{
    Constraint, NewUser, ParticipationRecord, QuestData, QuestFilter, QuestRecord, QuestRow, Store,
    StoreError, StoreResult, UserRecord,
};
use crate::error::Entity;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{QuestId, UserId};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Tables {
    last_user_id: i64,
    last_quest_id: i64,
    last_participation_id: i64,
    users: BTreeMap<UserId, UserRecord>,
    emails: HashMap<String, UserId>,
    quests: BTreeMap<QuestId, QuestRecord>,
    /// keyed quest-first so one quest's members form a contiguous range
    participants: BTreeMap<(QuestId, UserId), ParticipationRecord>,
}

impl Tables {
    fn count(&self, quest_id: QuestId) -> u32 {
        let members = self
            .participants
            .range((quest_id, UserId(i64::MIN))..=(quest_id, UserId(i64::MAX)))
            .count();
        u32::try_from(members).unwrap_or(u32::MAX)
    }

    fn row(&self, quest: &QuestRecord) -> QuestRow {
        QuestRow {
            quest: quest.clone(),
            participants: self.count(quest.id),
        }
    }

    fn drop_quest(&mut self, quest_id: QuestId) {
        self.quests.remove(&quest_id);
        self.participants.retain(|(quest, _), _| *quest != quest_id);
    }
}

/// Process-local store. Every operation holds one lock for its whole
/// duration, which makes check-and-write sequences atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend(String::from("memory store lock poisoned")))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: NewUser<'_>) -> StoreResult<UserRecord> {
        let mut tables = self.lock()?;
        if tables.emails.contains_key(user.email) {
            return Err(StoreError::Conflict(Constraint::UserEmail));
        }
        tables.last_user_id += 1;
        let now = Utc::now();
        let record = UserRecord {
            id: UserId(tables.last_user_id),
            email: user.email.to_owned(),
            username: user.username.to_owned(),
            password_hash: user.password_hash.to_owned(),
            created_at: now,
            updated_at: now,
        };
        tables.emails.insert(record.email.clone(), record.id);
        tables.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn user_by_id(&self, user_id: UserId) -> StoreResult<Option<UserRecord>> {
        Ok(self.lock()?.users.get(&user_id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let tables = self.lock()?;
        Ok(tables
            .emails
            .get(email)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn update_username(&self, user_id: UserId, username: &str) -> StoreResult<bool> {
        let mut tables = self.lock()?;
        match tables.users.get_mut(&user_id) {
            Some(user) => {
                user.username = username.to_owned();
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_user(&self, user_id: UserId) -> StoreResult<bool> {
        let mut tables = self.lock()?;
        let Some(user) = tables.users.remove(&user_id) else {
            return Ok(false);
        };
        tables.emails.remove(&user.email);
        let owned: Vec<QuestId> = tables
            .quests
            .values()
            .filter(|quest| quest.owner == user_id)
            .map(|quest| quest.id)
            .collect();
        for quest_id in owned {
            tables.drop_quest(quest_id);
        }
        tables.participants.retain(|(_, user), _| *user != user_id);
        Ok(true)
    }

    async fn insert_quest(
        &self,
        owner: UserId,
        data: &QuestData,
        now: DateTime<Utc>,
    ) -> StoreResult<QuestRecord> {
        let mut tables = self.lock()?;
        if !tables.users.contains_key(&owner) {
            return Err(StoreError::MissingReference(Entity::User));
        }
        tables.last_quest_id += 1;
        let record = QuestRecord {
            id: QuestId(tables.last_quest_id),
            owner,
            data: data.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.quests.insert(record.id, record.clone());
        Ok(record)
    }

    async fn quest_by_id(&self, quest_id: QuestId) -> StoreResult<Option<QuestRow>> {
        let tables = self.lock()?;
        Ok(tables.quests.get(&quest_id).map(|quest| tables.row(quest)))
    }

    async fn update_quest(
        &self,
        quest_id: QuestId,
        owner: UserId,
        data: &QuestData,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<QuestRecord>> {
        let mut tables = self.lock()?;
        let Some(quest) = tables
            .quests
            .get_mut(&quest_id)
            .filter(|quest| quest.owner == owner)
        else {
            return Ok(None);
        };
        if quest.data.max_participants != data.max_participants {
            return Err(StoreError::Conflict(Constraint::FrozenCapacity));
        }
        quest.data = data.clone();
        quest.updated_at = now;
        Ok(Some(quest.clone()))
    }

    async fn delete_quest(&self, quest_id: QuestId, owner: UserId) -> StoreResult<bool> {
        let mut tables = self.lock()?;
        match tables.quests.get(&quest_id) {
            Some(quest) if quest.owner == owner => {
                tables.drop_quest(quest_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_quests(&self, filter: QuestFilter) -> StoreResult<Vec<QuestRow>> {
        let tables = self.lock()?;
        let mut rows: Vec<QuestRow> = tables
            .quests
            .values()
            .filter(|quest| match filter {
                QuestFilter::All => true,
                QuestFilter::OwnedBy(owner) => quest.owner == owner,
                QuestFilter::JoinedBy(user) => tables.participants.contains_key(&(quest.id, user)),
            })
            .map(|quest| tables.row(quest))
            .collect();
        rows.sort_by_key(|row| Reverse((row.quest.created_at, row.quest.id)));
        Ok(rows)
    }

    async fn participant_count(&self, quest_id: QuestId) -> StoreResult<u32> {
        Ok(self.lock()?.count(quest_id))
    }

    async fn participation(
        &self,
        user_id: UserId,
        quest_id: QuestId,
    ) -> StoreResult<Option<ParticipationRecord>> {
        Ok(self
            .lock()?
            .participants
            .get(&(quest_id, user_id))
            .copied())
    }

    async fn insert_participation(
        &self,
        user_id: UserId,
        quest_id: QuestId,
        now: DateTime<Utc>,
    ) -> StoreResult<ParticipationRecord> {
        let mut tables = self.lock()?;
        let capacity = tables
            .quests
            .get(&quest_id)
            .map(|quest| quest.data.max_participants)
            .ok_or(StoreError::MissingReference(Entity::Quest))?;
        if !tables.users.contains_key(&user_id) {
            return Err(StoreError::MissingReference(Entity::User));
        }
        if tables.participants.contains_key(&(quest_id, user_id)) {
            return Err(StoreError::Conflict(Constraint::Membership));
        }
        if tables.count(quest_id) >= capacity {
            return Err(StoreError::Conflict(Constraint::Capacity));
        }
        tables.last_participation_id += 1;
        let record = ParticipationRecord {
            id: tables.last_participation_id,
            user_id,
            quest_id,
            joined_at: now,
        };
        tables.participants.insert((quest_id, user_id), record);
        Ok(record)
    }

    async fn delete_participation(&self, user_id: UserId, quest_id: QuestId) -> StoreResult<bool> {
        Ok(self
            .lock()?
            .participants
            .remove(&(quest_id, user_id))
            .is_some())
    }
}

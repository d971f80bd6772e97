mod participation;
mod quests;
mod users;

pub use participation::ParticipationEngine;
pub use quests::QuestRepository;
pub use users::UserDirectory;

use crate::store::{QuestRecord, QuestRow};
use common::{MembershipState, QuestInfo};

fn quest_info(quest: QuestRecord, participants: u32) -> QuestInfo {
    let capacity = quest.data.max_participants;
    QuestInfo {
        id: quest.id,
        owner: quest.owner,
        title: quest.data.title,
        description: quest.data.description,
        category: quest.data.category,
        max_participants: capacity,
        deadline: quest.data.deadline,
        start_time: quest.data.start_time,
        end_time: quest.data.end_time,
        image: quest.data.image,
        url: quest.data.url,
        created_at: quest.created_at,
        updated_at: quest.updated_at,
        participants,
        remaining: capacity.saturating_sub(participants),
    }
}

impl From<QuestRow> for QuestInfo {
    fn from(row: QuestRow) -> Self {
        quest_info(row.quest, row.participants)
    }
}

fn membership(quest: &QuestRecord, joined: bool, participants: u32) -> MembershipState {
    MembershipState {
        quest_id: quest.id,
        joined,
        participants,
        remaining: quest.data.max_participants.saturating_sub(participants),
    }
}

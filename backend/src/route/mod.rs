pub mod create_quest;
pub mod delete_account;
pub mod delete_quest;
pub mod get_created_quests;
pub mod get_joined_quests;
pub mod get_quest_info;
pub mod get_quests;
pub mod get_user_info;
pub mod get_user_name;
pub mod login;
pub mod logout;
pub mod quests_cancel;
pub mod quests_join;
pub mod signup;
pub mod update_quest;
pub mod update_user_name;

use crate::error::{ServiceError, ValidationError};
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::Path;
use common::QuestId;
use std::str::FromStr;

pub async fn health() -> &'static str {
    "ok"
}

fn parse_quest_id(id: Result<Path<String>, PathRejection>) -> Result<QuestId, ServiceError> {
    let bad_id = || ServiceError::from(ValidationError::new("id", "bad quest id"));
    let Path(id) = id.map_err(|_| bad_id())?;
    QuestId::from_str(&id).map_err(|_| bad_id())
}

fn bad_body(rejection: JsonRejection) -> ServiceError {
    ValidationError::new("body", rejection.body_text()).into()
}

use super::{bad_body, parse_quest_id};
use crate::auth::Authenticated;
use crate::error::ServiceError;
use crate::{ApiResponse, AppState};
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::{http::StatusCode, Json};
use common::{QuestFields, QuestInfo};
use std::sync::Arc;

pub async fn update_quest(
    state: State<Arc<AppState>>,
    Authenticated(user_id): Authenticated,
    id: Result<Path<String>, PathRejection>,
    payload: Result<Json<QuestFields>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<QuestInfo>>), ServiceError> {
    let quest_id = parse_quest_id(id)?;
    let Json(fields) = payload.map_err(bad_body)?;
    let quest = state.quests.update(user_id, quest_id, fields).await?;
    Ok((StatusCode::OK, Json(ApiResponse::Response(quest))))
}

use super::parse_quest_id;
use crate::auth::Authenticated;
use crate::error::ServiceError;
use crate::{ApiResponse, AppState};
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::{http::StatusCode, Json};
use common::QuestInfo;
use std::sync::Arc;

pub async fn get_quest_info(
    state: State<Arc<AppState>>,
    _: Authenticated,
    id: Result<Path<String>, PathRejection>,
) -> Result<(StatusCode, Json<ApiResponse<QuestInfo>>), ServiceError> {
    let quest_id = parse_quest_id(id)?;
    let quest = state.quests.get_by_id(quest_id).await?;
    Ok((StatusCode::OK, Json(ApiResponse::Response(quest))))
}

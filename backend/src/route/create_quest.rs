use super::bad_body;
use crate::auth::Authenticated;
use crate::error::ServiceError;
use crate::{ApiResponse, AppState};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{http::StatusCode, Json};
use common::{QuestFields, QuestInfo};
use std::sync::Arc;

pub async fn create_quest(
    state: State<Arc<AppState>>,
    Authenticated(user_id): Authenticated,
    payload: Result<Json<QuestFields>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<QuestInfo>>), ServiceError> {
    let Json(fields) = payload.map_err(bad_body)?;
    let quest = state.quests.create(user_id, fields).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::Response(quest))))
}

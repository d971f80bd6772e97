use crate::auth::Authenticated;
use crate::error::ServiceError;
use crate::{ApiResponse, AppState};
use axum::extract::State;
use axum::{http::StatusCode, Json};
use common::QuestInfo;
use std::sync::Arc;

pub async fn get_created_quests(
    state: State<Arc<AppState>>,
    Authenticated(user_id): Authenticated,
) -> Result<(StatusCode, Json<ApiResponse<Vec<QuestInfo>>>), ServiceError> {
    let quests = state.participation.list_created_by_user(user_id).await?;
    Ok((StatusCode::OK, Json(ApiResponse::Response(quests))))
}

use crate::auth::Authenticated;
use crate::error::ServiceError;
use crate::{ApiResponse, AppState};
use axum::extract::State;
use axum::{http::StatusCode, Json};
use common::QuestInfo;
use std::sync::Arc;

pub async fn get_all_quests(
    state: State<Arc<AppState>>,
    _: Authenticated,
) -> Result<(StatusCode, Json<ApiResponse<Vec<QuestInfo>>>), ServiceError> {
    let quests = state.quests.list_all().await?;
    Ok((StatusCode::OK, Json(ApiResponse::Response(quests))))
}

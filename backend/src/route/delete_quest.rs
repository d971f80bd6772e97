use super::parse_quest_id;
use crate::auth::Authenticated;
use crate::error::ServiceError;
use crate::{ApiResponse, AppState};
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::{http::StatusCode, Json};
use std::sync::Arc;

pub async fn delete_quest(
    state: State<Arc<AppState>>,
    Authenticated(user_id): Authenticated,
    id: Result<Path<String>, PathRejection>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), ServiceError> {
    let quest_id = parse_quest_id(id)?;
    state.quests.delete(user_id, quest_id).await?;
    Ok((StatusCode::OK, Json(ApiResponse::Response(()))))
}

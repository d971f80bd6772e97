use super::bad_body;
use crate::auth::Authenticated;
use crate::error::ServiceError;
use crate::{ApiResponse, AppState};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{http::StatusCode, Json};
use common::UpdateUserNameRequest;
use std::sync::Arc;

pub async fn update_user_name(
    state: State<Arc<AppState>>,
    Authenticated(user_id): Authenticated,
    payload: Result<Json<UpdateUserNameRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), ServiceError> {
    let Json(payload) = payload.map_err(bad_body)?;
    state
        .users
        .update_user_name(user_id, &payload.username)
        .await?;
    Ok((StatusCode::OK, Json(ApiResponse::Response(()))))
}

use super::bad_body;
use crate::error::ServiceError;
use crate::{ApiResponse, AppState};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{http::StatusCode, Json};
use common::{SignUpRequest, SignUpResponse};
use std::sync::Arc;

pub async fn sign_up(
    state: State<Arc<AppState>>,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<SignUpResponse>>), ServiceError> {
    let Json(payload) = payload.map_err(bad_body)?;
    let created = state.users.sign_up(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::Response(created))))
}

use super::bad_body;
use crate::error::ServiceError;
use crate::{ApiResponse, AppState};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{http::StatusCode, Json};
use common::{LogInRequest, LogInResponse};
use std::sync::Arc;

pub async fn log_in(
    state: State<Arc<AppState>>,
    payload: Result<Json<LogInRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<LogInResponse>>), ServiceError> {
    let Json(payload) = payload.map_err(bad_body)?;
    let token = state.users.log_in(payload).await?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::Response(LogInResponse { token })),
    ))
}

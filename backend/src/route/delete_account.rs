use crate::auth::Authenticated;
use crate::error::ServiceError;
use crate::{ApiResponse, AppState};
use axum::extract::State;
use axum::{http::StatusCode, Json};
use std::sync::Arc;

/// Also removes every quest the caller owns and every membership.
pub async fn delete_account(
    state: State<Arc<AppState>>,
    Authenticated(user_id): Authenticated,
) -> Result<(StatusCode, Json<ApiResponse<()>>), ServiceError> {
    state.users.delete_account(user_id).await?;
    Ok((StatusCode::OK, Json(ApiResponse::Response(()))))
}

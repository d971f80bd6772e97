use crate::auth::Authenticated;
use crate::error::ServiceError;
use crate::{ApiResponse, AppState};
use axum::extract::State;
use axum::{http::StatusCode, Json};
use std::sync::Arc;

pub async fn get_user_name(
    state: State<Arc<AppState>>,
    Authenticated(user_id): Authenticated,
) -> Result<(StatusCode, Json<ApiResponse<String>>), ServiceError> {
    let username = state.users.get_user_name(user_id).await?;
    Ok((StatusCode::OK, Json(ApiResponse::Response(username))))
}

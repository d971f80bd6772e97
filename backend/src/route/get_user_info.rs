use crate::auth::Authenticated;
use crate::error::ServiceError;
use crate::{ApiResponse, AppState};
use axum::extract::State;
use axum::{http::StatusCode, Json};
use common::UserInfo;
use std::sync::Arc;

pub async fn get_user_info(
    state: State<Arc<AppState>>,
    Authenticated(user_id): Authenticated,
) -> Result<(StatusCode, Json<ApiResponse<UserInfo>>), ServiceError> {
    let info = state.users.get_user_info(user_id).await?;
    Ok((StatusCode::OK, Json(ApiResponse::Response(info))))
}

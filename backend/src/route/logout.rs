use crate::auth::Authenticated;
use crate::{ApiResponse, AppState};
use axum::extract::State;
use axum::{http::StatusCode, Json};
use std::sync::Arc;

pub async fn log_out(
    state: State<Arc<AppState>>,
    Authenticated(user_id): Authenticated,
) -> (StatusCode, Json<ApiResponse<()>>) {
    state.users.log_out(user_id);
    (StatusCode::OK, Json(ApiResponse::Response(())))
}

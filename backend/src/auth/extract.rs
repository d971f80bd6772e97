use crate::error::{AuthError, ServiceError};
use crate::AppState;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use common::UserId;
use std::sync::Arc;

/// Identity of the caller, taken from `Authorization: Bearer <token>`.
///
/// Handlers that take this extractor never run for unauthenticated requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Authenticated(pub UserId);

impl FromRequestParts<Arc<AppState>> for Authenticated {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ServiceError::Auth(AuthError::InvalidToken))?;

        let user_id = state.gate.authenticate(bearer.token())?;
        Ok(Authenticated(user_id))
    }
}

use crate::auth::CryptoFailure;
use crate::store::{Constraint, StoreError};
use crate::ApiResponse;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::{ApiError, ErrorKind};
use std::fmt;
use thiserror::Error;

/// Why a session token was refused. All variants mean "log in again".
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("token is not a valid signed token")]
    InvalidToken,
    #[error("token has expired")]
    ExpiredToken,
    #[error("token claims are malformed")]
    MalformedToken,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    User,
    Quest,
    Participation,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Entity::User => "user",
            Entity::Quest => "quest",
            Entity::Participation => "participation",
        })
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("only the owner may change this quest")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(Entity),
    #[error("already joined this quest")]
    AlreadyJoined,
    #[error("quest has no free slots left")]
    CapacityExceeded,
    #[error("email is already registered")]
    DuplicateEmail,
    #[error("email and password do not match")]
    CredentialMismatch,
    #[error(transparent)]
    Crypto(#[from] CryptoFailure),
    #[error("storage did not answer in time")]
    Timeout,
    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<StoreError> for ServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Conflict(Constraint::UserEmail) => ServiceError::DuplicateEmail,
            StoreError::Conflict(Constraint::Membership) => ServiceError::AlreadyJoined,
            StoreError::Conflict(Constraint::Capacity) => ServiceError::CapacityExceeded,
            StoreError::Conflict(Constraint::FrozenCapacity) => ServiceError::Validation(
                ValidationError::new("max_participants", "capacity cannot change after creation"),
            ),
            StoreError::MissingReference(entity) => ServiceError::NotFound(entity),
            StoreError::Timeout => ServiceError::Timeout,
            StoreError::Backend(message) => ServiceError::Storage(message),
        }
    }
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Validation(_) => ErrorKind::Validation,
            ServiceError::Auth(AuthError::InvalidToken) => ErrorKind::InvalidToken,
            ServiceError::Auth(AuthError::ExpiredToken) => ErrorKind::ExpiredToken,
            ServiceError::Auth(AuthError::MalformedToken) => ErrorKind::MalformedToken,
            ServiceError::Forbidden => ErrorKind::Forbidden,
            ServiceError::NotFound(_) => ErrorKind::NotFound,
            ServiceError::AlreadyJoined => ErrorKind::AlreadyJoined,
            ServiceError::CapacityExceeded => ErrorKind::CapacityExceeded,
            ServiceError::DuplicateEmail => ErrorKind::DuplicateEmail,
            ServiceError::CredentialMismatch => ErrorKind::CredentialMismatch,
            ServiceError::Crypto(_) => ErrorKind::Internal,
            ServiceError::Timeout => ErrorKind::Timeout,
            ServiceError::Storage(_) => ErrorKind::Storage,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::InvalidToken
            | ErrorKind::ExpiredToken
            | ErrorKind::MalformedToken
            | ErrorKind::CredentialMismatch => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::AlreadyJoined | ErrorKind::CapacityExceeded | ErrorKind::DuplicateEmail => {
                StatusCode::CONFLICT
            }
            ErrorKind::Timeout => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Storage | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();
        // infra details stay in the log
        let message = match kind {
            ErrorKind::Storage | ErrorKind::Internal => {
                tracing::error!(error = %self, "request failed");
                String::from(
                    "internal server error, contact administrator with description of this situation",
                )
            }
            _ => self.to_string(),
        };
        (
            status,
            Json(ApiResponse::<()>::Error(ApiError::new(kind, message))),
        )
            .into_response()
    }
}

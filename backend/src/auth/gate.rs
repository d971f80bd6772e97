use super::TokenService;
use crate::error::{AuthError, ServiceError};
use common::UserId;
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("requester does not own the resource")]
pub struct Forbidden;

impl From<Forbidden> for ServiceError {
    fn from(_: Forbidden) -> Self {
        ServiceError::Forbidden
    }
}

/// The one place a raw token becomes an identity.
#[derive(Debug)]
pub struct AuthorizationGate {
    tokens: TokenService,
}

impl AuthorizationGate {
    pub fn new(tokens: TokenService) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn authenticate(&self, raw_token: &str) -> Result<UserId, AuthError> {
        self.tokens.verify(raw_token.trim()).inspect_err(|error| {
            tracing::warn!(%error, "rejected session token");
        })
    }

    pub fn authorize_owner(identity: UserId, owner: UserId) -> Result<(), Forbidden> {
        if identity == owner {
            Ok(())
        } else {
            tracing::warn!(%identity, %owner, "ownership check failed");
            Err(Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::DEFAULT_TOKEN_TTL_DAYS;
    use chrono::TimeDelta;

    fn gate() -> AuthorizationGate {
        AuthorizationGate::new(TokenService::new(
            b"gate-secret",
            TimeDelta::days(i64::from(DEFAULT_TOKEN_TTL_DAYS)),
        ))
    }

    #[test]
    fn authenticate_yields_the_token_identity() {
        let gate = gate();
        let token = gate.tokens().issue(UserId(9)).unwrap();
        assert_eq!(gate.authenticate(&token), Ok(UserId(9)));
        assert_eq!(gate.authenticate(&format!(" {token} ")), Ok(UserId(9)));
    }

    #[test]
    fn authenticate_passes_token_failures_through() {
        assert_eq!(gate().authenticate("bogus"), Err(AuthError::InvalidToken));
    }

    #[test]
    fn only_the_owner_is_authorized() {
        assert_eq!(
            AuthorizationGate::authorize_owner(UserId(1), UserId(1)),
            Ok(())
        );
        assert_eq!(
            AuthorizationGate::authorize_owner(UserId(2), UserId(1)),
            Err(Forbidden)
        );
    }
}

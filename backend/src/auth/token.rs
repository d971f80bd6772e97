use super::CryptoFailure;
use crate::error::AuthError;
use chrono::{DateTime, TimeDelta, Utc};
use common::UserId;
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

pub const DEFAULT_TOKEN_TTL_DAYS: u32 = 7;

#[derive(Serialize)]
struct Claims {
    user_id: i64,
    exp: i64,
}

/// Claims as they arrive; the shape is checked by hand so a wrong shape maps to
/// [`AuthError::MalformedToken`] rather than a decoding error.
#[derive(Deserialize)]
struct RawClaims {
    #[serde(default)]
    user_id: Option<serde_json::Value>,
    #[serde(default)]
    exp: Option<serde_json::Value>,
}

/// Issues and verifies HS256 session tokens.
///
/// Tokens are not stored anywhere: there is no way to revoke one before it expires,
/// and changing the secret invalidates every outstanding token.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: TimeDelta,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &[u8], ttl: TimeDelta) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // expiry is checked against the caller's clock in `verify_at`
        validation.validate_exp = false;
        validation.required_spec_claims = HashSet::new();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn issue(&self, user_id: UserId) -> Result<String, CryptoFailure> {
        self.issue_at(user_id, Utc::now())
    }

    /// A signing failure is a server fault, never a token problem.
    pub fn issue_at(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<String, CryptoFailure> {
        let claims = Claims {
            user_id: user_id.0,
            exp: (now + self.ttl).timestamp(),
        };
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding,
        )?)
    }

    pub fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<UserId, AuthError> {
        let data = jsonwebtoken::decode::<RawClaims>(token, &self.decoding, &self.validation)
            .map_err(|error| match error.kind() {
                JwtErrorKind::Json(_) | JwtErrorKind::MissingRequiredClaim(_) => {
                    AuthError::MalformedToken
                }
                _ => AuthError::InvalidToken,
            })?;

        let exp = data
            .claims
            .exp
            .as_ref()
            .and_then(whole_number)
            .ok_or(AuthError::MalformedToken)?;
        let user_id = data
            .claims
            .user_id
            .as_ref()
            .and_then(whole_number)
            .filter(|id| *id > 0)
            .ok_or(AuthError::MalformedToken)?;

        if now.timestamp() >= exp {
            return Err(AuthError::ExpiredToken);
        }

        Ok(UserId(user_id))
    }
}

/// Accepts `5` and `5.0` (issuers that only have floats), rejects everything else.
fn whole_number(value: &serde_json::Value) -> Option<i64> {
    if let Some(number) = value.as_i64() {
        return Some(number);
    }
    let float = value.as_f64()?;
    (float.fract() == 0.0 && float.abs() < i64::MAX as f64).then_some(float as i64)
}

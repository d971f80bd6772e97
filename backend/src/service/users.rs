use crate::auth::{AuthorizationGate, CredentialStore};
use crate::error::{Entity, ServiceError};
use crate::store::{NewUser, Store};
use crate::validation::{validate_email, validate_password, validate_username};
use common::{LogInRequest, SignUpRequest, SignUpResponse, UserId, UserInfo};
use std::sync::Arc;

pub struct UserDirectory {
    store: Arc<dyn Store>,
    credentials: CredentialStore,
    gate: Arc<AuthorizationGate>,
}

impl UserDirectory {
    pub fn new(
        store: Arc<dyn Store>,
        credentials: CredentialStore,
        gate: Arc<AuthorizationGate>,
    ) -> Self {
        Self {
            store,
            credentials,
            gate,
        }
    }

    pub async fn sign_up(&self, request: SignUpRequest) -> Result<SignUpResponse, ServiceError> {
        let email = request.email.trim();
        let username = request.username.trim();
        validate_email(email)?;
        validate_password(&request.password)?;
        validate_username(username)?;

        let password_hash = self.credentials.hash_blocking(request.password).await?;
        let user = self
            .store
            .insert_user(NewUser {
                email,
                username,
                password_hash: &password_hash,
            })
            .await?;

        tracing::info!(user = %user.id, "user signed up");
        Ok(SignUpResponse {
            id: user.id,
            email: user.email,
            username: user.username,
        })
    }

    /// Returns a fresh session token.
    ///
    /// Only the email format is validated: a wrong password of any shape is
    /// reported as [`ServiceError::CredentialMismatch`].
    pub async fn log_in(&self, request: LogInRequest) -> Result<String, ServiceError> {
        let email = request.email.trim();
        validate_email(email)?;

        let user = self
            .store
            .user_by_email(email)
            .await?
            .ok_or(ServiceError::NotFound(Entity::User))?;

        if !self
            .credentials
            .verify_blocking(request.password, user.password_hash)
            .await
        {
            tracing::warn!(user = %user.id, "log in with wrong password");
            return Err(ServiceError::CredentialMismatch);
        }

        let token = self.gate.tokens().issue(user.id)?;
        tracing::info!(user = %user.id, "user logged in");
        Ok(token)
    }

    /// Tokens are stateless, the client just forgets its token.
    pub fn log_out(&self, user_id: UserId) {
        tracing::debug!(user = %user_id, "user logged out");
    }

    pub async fn get_user_name(&self, user_id: UserId) -> Result<String, ServiceError> {
        Ok(self.get_user_info(user_id).await?.username)
    }

    pub async fn get_user_info(&self, user_id: UserId) -> Result<UserInfo, ServiceError> {
        let user = self
            .store
            .user_by_id(user_id)
            .await?
            .ok_or(ServiceError::NotFound(Entity::User))?;
        Ok(UserInfo {
            email: user.email,
            username: user.username,
        })
    }

    pub async fn update_user_name(
        &self,
        user_id: UserId,
        username: &str,
    ) -> Result<(), ServiceError> {
        let username = username.trim();
        validate_username(username)?;
        if !self.store.update_username(user_id, username).await? {
            return Err(ServiceError::NotFound(Entity::User));
        }
        tracing::info!(user = %user_id, "username updated");
        Ok(())
    }

    /// Removes the account together with its quests and memberships.
    pub async fn delete_account(&self, user_id: UserId) -> Result<(), ServiceError> {
        if !self.store.delete_user(user_id).await? {
            return Err(ServiceError::NotFound(Entity::User));
        }
        tracing::info!(user = %user_id, "account deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenService;
    use crate::store::MemoryStore;
    use chrono::TimeDelta;

    fn directory() -> UserDirectory {
        let gate = AuthorizationGate::new(TokenService::new(b"users-secret", TimeDelta::days(7)));
        UserDirectory::new(
            Arc::new(MemoryStore::new()),
            CredentialStore::new(4),
            Arc::new(gate),
        )
    }

    fn alice() -> SignUpRequest {
        SignUpRequest {
            email: String::from("a@x.com"),
            password: String::from("secret1"),
            username: String::from("alice"),
        }
    }

    fn log_in(password: &str) -> LogInRequest {
        LogInRequest {
            email: String::from("a@x.com"),
            password: password.to_owned(),
        }
    }

    #[tokio::test]
    async fn sign_up_then_log_in() {
        let users = directory();
        let created = users.sign_up(alice()).await.unwrap();
        assert_eq!(
            created,
            SignUpResponse {
                id: UserId(1),
                email: String::from("a@x.com"),
                username: String::from("alice"),
            }
        );

        let token = users.log_in(log_in("secret1")).await.unwrap();
        assert_eq!(users.gate.authenticate(&token), Ok(UserId(1)));
    }

    #[tokio::test]
    async fn wrong_password_is_always_a_mismatch() {
        let users = directory();
        users.sign_up(alice()).await.unwrap();
        for wrong in ["secret2", "x", "", "a-much-longer-password-than-allowed"] {
            assert!(
                matches!(
                    users.log_in(log_in(wrong)).await,
                    Err(ServiceError::CredentialMismatch)
                ),
                "{wrong}"
            );
        }
    }

    #[tokio::test]
    async fn unknown_email_is_not_found() {
        let users = directory();
        assert!(matches!(
            users.log_in(log_in("secret1")).await,
            Err(ServiceError::NotFound(Entity::User))
        ));
    }

    #[tokio::test]
    async fn duplicate_email_is_refused() {
        let users = directory();
        users.sign_up(alice()).await.unwrap();
        let again = users
            .sign_up(SignUpRequest {
                username: String::from("alice2"),
                ..alice()
            })
            .await;
        assert!(matches!(again, Err(ServiceError::DuplicateEmail)));
    }

    #[tokio::test]
    async fn sign_up_validates_every_field() {
        let users = directory();
        let field = |result: Result<SignUpResponse, ServiceError>| match result {
            Err(ServiceError::Validation(error)) => error.field,
            other => panic!("expected validation error, got {other:?}"),
        };
        assert_eq!(
            field(users.sign_up(SignUpRequest { email: String::from("nope"), ..alice() }).await),
            "email"
        );
        assert_eq!(
            field(users.sign_up(SignUpRequest { password: String::from("123"), ..alice() }).await),
            "password"
        );
        assert_eq!(
            field(users.sign_up(SignUpRequest { username: String::new(), ..alice() }).await),
            "username"
        );
    }

    #[tokio::test]
    async fn profile_reads_and_updates() {
        let users = directory();
        let id = users.sign_up(alice()).await.unwrap().id;

        assert_eq!(users.get_user_name(id).await.unwrap(), "alice");
        users.update_user_name(id, " bob ").await.unwrap();
        assert_eq!(
            users.get_user_info(id).await.unwrap(),
            UserInfo {
                email: String::from("a@x.com"),
                username: String::from("bob"),
            }
        );
        assert!(matches!(
            users.update_user_name(id, "elevenchars").await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn deleted_account_is_gone() {
        let users = directory();
        let id = users.sign_up(alice()).await.unwrap().id;
        users.delete_account(id).await.unwrap();
        assert!(matches!(
            users.get_user_info(id).await,
            Err(ServiceError::NotFound(Entity::User))
        ));
        assert!(matches!(
            users.delete_account(id).await,
            Err(ServiceError::NotFound(Entity::User))
        ));
        // the email is free again
        assert!(users.sign_up(alice()).await.is_ok());
    }
}

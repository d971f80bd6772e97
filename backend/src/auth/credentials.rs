use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoFailure {
    #[error("password hashing failed: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
    #[error("password hashing task did not finish")]
    Interrupted,
    #[error("token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// bcrypt hashing with the cost fixed at startup.
#[derive(Debug, Clone, Copy)]
pub struct CredentialStore {
    cost: u32,
}

impl CredentialStore {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Salts and hashes a clear-text password. The salt is random and stored inside the hash.
    pub fn hash(&self, password: &str) -> Result<String, CryptoFailure> {
        Ok(bcrypt::hash(password, self.cost)?)
    }

    /// A hash that cannot be parsed counts as a mismatch.
    pub fn verify(&self, candidate: &str, stored_hash: &str) -> bool {
        bcrypt::verify(candidate, stored_hash).unwrap_or(false)
    }

    /// [`Self::hash`] on the blocking pool; bcrypt is deliberately slow.
    pub async fn hash_blocking(&self, password: String) -> Result<String, CryptoFailure> {
        let store = *self;
        tokio::task::spawn_blocking(move || store.hash(&password))
            .await
            .map_err(|_| CryptoFailure::Interrupted)?
    }

    pub async fn verify_blocking(&self, candidate: String, stored_hash: String) -> bool {
        let store = *self;
        tokio::task::spawn_blocking(move || store.verify(&candidate, &stored_hash))
            .await
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CredentialStore {
        CredentialStore::new(4)
    }

    #[test]
    fn hash_never_contains_the_password() {
        let hash = store().hash("secret1").unwrap();
        assert!(!hash.contains("secret1"));
        assert!(hash.starts_with("$2"));
    }

    #[test]
    fn verify_matches_only_the_original() {
        let store = store();
        let hash = store.hash("secret1").unwrap();
        assert!(store.verify("secret1", &hash));
        assert!(!store.verify("secret2", &hash));
        assert!(!store.verify("", &hash));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let store = store();
        let first = store.hash("secret1").unwrap();
        let second = store.hash("secret1").unwrap();
        assert_ne!(first, second);
        assert!(store.verify("secret1", &first));
        assert!(store.verify("secret1", &second));
    }

    #[test]
    fn garbage_hash_is_a_mismatch() {
        assert!(!store().verify("secret1", "not a bcrypt hash"));
    }

    #[tokio::test]
    async fn blocking_variants_agree() {
        let store = store();
        let hash = store.hash_blocking(String::from("secret1")).await.unwrap();
        assert!(store.verify_blocking(String::from("secret1"), hash.clone()).await);
        assert!(!store.verify_blocking(String::from("secret9"), hash).await);
    }

    #[test]
    fn invalid_cost_is_a_crypto_failure() {
        assert!(CredentialStore::new(1).hash("secret1").is_err());
    }
}

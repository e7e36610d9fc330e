use std::sync::Arc;

use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::auth::{
    password::{hash_password, verify_password},
    repo::{StoreError, UserStore},
    repo_types::{ExternalUser, LocalUser, NewExternalUser, NewLocalUser, User},
};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Email already registered")]
    DuplicateEmail,
    #[error("User not found")]
    UserNotFound,
    #[error("Invalid password")]
    InvalidCredentials,
    #[error("Invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[source] StoreError),
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateEmail => AuthError::DuplicateEmail,
            other => AuthError::StorageUnavailable(other),
        }
    }
}

/// Signup and login over a [`UserStore`].
#[derive(Clone)]
pub struct CredentialService {
    store: Arc<dyn UserStore>,
}

impl CredentialService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Creates a local user. No session is issued; the caller logs in
    /// separately.
    #[instrument(skip(self, name, password))]
    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<LocalUser, AuthError> {
        if email.trim().is_empty() {
            return Err(AuthError::InvalidInput("email is required"));
        }
        if password.is_empty() {
            return Err(AuthError::InvalidInput("password is required"));
        }

        // Skips the hashing cost for the common duplicate case; insert_local
        // is still the authority.
        if self.store.find_by_email(email).await?.is_some() {
            warn!("email already registered");
            return Err(AuthError::DuplicateEmail);
        }

        let password_hash = hash_password(password).map_err(|e| {
            error!(error = %e, "hash_password failed");
            AuthError::Hashing(e.to_string())
        })?;

        let user = self
            .store
            .insert_local(NewLocalUser {
                name: name.to_string(),
                email: email.to_string(),
                password_hash,
            })
            .await
            .map_err(|e| {
                match &e {
                    StoreError::DuplicateEmail => warn!("email registered concurrently"),
                    other => error!(error = %other, "insert user failed"),
                }
                AuthError::from(e)
            })?;

        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Verifies a password login. The returned record's `name` is the
    /// display name.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<LocalUser, AuthError> {
        let user = match self.store.find_by_email(email).await {
            Ok(Some(u)) => u,
            Ok(None) => {
                warn!("login unknown email");
                return Err(AuthError::UserNotFound);
            }
            Err(e) => {
                error!(error = %e, "find_by_email failed");
                return Err(e.into());
            }
        };

        let ok = verify_password(password, &user.password_hash).map_err(|e| {
            error!(error = %e, user_id = %user.id, "verify_password failed");
            AuthError::Hashing(e.to_string())
        })?;

        if !ok {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AuthError::InvalidCredentials);
        }

        info!(user_id = %user.id, "user logged in");
        Ok(user)
    }

    /// Records an identity already authenticated by `provider`.
    #[instrument(skip(self, name))]
    pub async fn register_external(
        &self,
        provider: &str,
        external_id: &str,
        name: &str,
    ) -> Result<ExternalUser, AuthError> {
        if provider.trim().is_empty() {
            return Err(AuthError::InvalidInput("provider is required"));
        }
        if external_id.trim().is_empty() {
            return Err(AuthError::InvalidInput("external id is required"));
        }

        let user = self
            .store
            .upsert_external(NewExternalUser {
                provider: provider.to_string(),
                external_id: external_id.to_string(),
                name: name.to_string(),
            })
            .await
            .map_err(|e| {
                error!(error = %e, "upsert external user failed");
                AuthError::from(e)
            })?;

        info!(user_id = %user.id, provider, "external identity linked");
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn user(&self, id: Uuid) -> Result<User, AuthError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::MemoryUserStore;
    use async_trait::async_trait;

    fn service() -> CredentialService {
        CredentialService::new(Arc::new(MemoryUserStore::new()))
    }

    struct DownStore;

    #[async_trait]
    impl UserStore for DownStore {
        async fn find_by_email(&self, _: &str) -> Result<Option<LocalUser>, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }
        async fn find_by_id(&self, _: Uuid) -> Result<Option<User>, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }
        async fn insert_local(&self, _: NewLocalUser) -> Result<LocalUser, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }
        async fn upsert_external(&self, _: NewExternalUser) -> Result<ExternalUser, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }
    }

    #[tokio::test]
    async fn signup_twice_with_same_email_is_duplicate() {
        let svc = service();
        svc.signup("Ada", "ada@example.com", "pw-one").await.unwrap();
        let err = svc
            .signup("Someone Else", "ada@example.com", "pw-two")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateEmail));
    }

    #[tokio::test]
    async fn signup_stores_hash_not_plaintext() {
        let svc = service();
        let user = svc.signup("Ada", "ada@example.com", "s3cret").await.unwrap();
        assert_ne!(user.password_hash, "s3cret");
        assert!(user.password_hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn signup_requires_email_and_password() {
        let svc = service();
        assert!(matches!(
            svc.signup("Ada", "", "pw").await,
            Err(AuthError::InvalidInput(_))
        ));
        assert!(matches!(
            svc.signup("Ada", "   ", "pw").await,
            Err(AuthError::InvalidInput(_))
        ));
        assert!(matches!(
            svc.signup("Ada", "ada@example.com", "").await,
            Err(AuthError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn login_returns_display_name() {
        let svc = service();
        svc.signup("Ada Lovelace", "ada@example.com", "engine").await.unwrap();
        let user = svc.login("ada@example.com", "engine").await.unwrap();
        assert_eq!(user.name, "Ada Lovelace");
    }

    #[tokio::test]
    async fn login_unknown_email_is_user_not_found() {
        let svc = service();
        let err = svc.login("nobody@example.com", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::UserNotFound));
    }

    #[tokio::test]
    async fn login_wrong_password_is_invalid_credentials() {
        let svc = service();
        let user = svc.signup("Ada", "ada@example.com", "engine").await.unwrap();
        for attempt in ["", "Engine", "engine ", "enginf", user.password_hash.as_str()] {
            let err = svc.login("ada@example.com", attempt).await.unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredentials), "attempt {attempt:?}");
        }
    }

    #[tokio::test]
    async fn login_does_not_fold_email_case() {
        let svc = service();
        svc.signup("Ada", "Ada@Example.com", "engine").await.unwrap();
        let err = svc.login("ada@example.com", "engine").await.unwrap_err();
        assert!(matches!(err, AuthError::UserNotFound));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_signups_with_same_email_create_one_user() {
        let svc = service();
        let mut handles = Vec::new();
        for i in 0..8 {
            let svc = svc.clone();
            handles.push(tokio::spawn(async move {
                svc.signup(&format!("racer {i}"), "race@example.com", "pw").await
            }));
        }

        let mut ok = 0;
        let mut dup = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => ok += 1,
                Err(AuthError::DuplicateEmail) => dup += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(dup, 7);
    }

    #[tokio::test]
    async fn storage_failure_is_storage_unavailable() {
        let svc = CredentialService::new(Arc::new(DownStore));
        assert!(matches!(
            svc.signup("Ada", "ada@example.com", "pw").await,
            Err(AuthError::StorageUnavailable(_))
        ));
        assert!(matches!(
            svc.login("ada@example.com", "pw").await,
            Err(AuthError::StorageUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn register_external_and_load_by_id() {
        let svc = service();
        let ext = svc.register_external("github", "1234", "octocat").await.unwrap();
        let loaded = svc.user(ext.id).await.unwrap();
        assert!(matches!(loaded, User::External(ref u) if u.provider == "github"));
        assert_eq!(loaded.name(), "octocat");

        assert!(matches!(
            svc.register_external("", "1234", "x").await,
            Err(AuthError::InvalidInput(_))
        ));
        assert!(matches!(
            svc.user(Uuid::new_v4()).await,
            Err(AuthError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn external_identity_cannot_password_login() {
        let svc = service();
        svc.register_external("google", "ada@example.com", "Ada").await.unwrap();
        let err = svc.login("ada@example.com", "anything").await.unwrap_err();
        assert!(matches!(err, AuthError::UserNotFound));
    }
}

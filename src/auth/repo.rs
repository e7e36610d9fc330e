use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::auth::repo_types::{
    ExternalUser, LocalUser, NewExternalUser, NewLocalUser, User, UserRow,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("malformed user record {0}")]
    Malformed(Uuid),
}

/// Persistence for user records.
///
/// `insert_local` must perform the uniqueness check and the insert as one
/// atomic step: two concurrent inserts with the same email yield exactly one
/// record and one `StoreError::DuplicateEmail`.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<LocalUser>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn insert_local(&self, new: NewLocalUser) -> Result<LocalUser, StoreError>;
    async fn upsert_external(&self, new: NewExternalUser) -> Result<ExternalUser, StoreError>;
}

const USER_COLUMNS: &str =
    "id, kind, name, email, password_hash, provider, external_id, created_at";

fn into_local(row: UserRow) -> Result<LocalUser, StoreError> {
    let id = row.id;
    match User::try_from(row).map_err(StoreError::Malformed)? {
        User::Local(u) => Ok(u),
        User::External(_) => Err(StoreError::Malformed(id)),
    }
}

fn into_external(row: UserRow) -> Result<ExternalUser, StoreError> {
    let id = row.id;
    match User::try_from(row).map_err(StoreError::Malformed)? {
        User::External(u) => Ok(u),
        User::Local(_) => Err(StoreError::Malformed(id)),
    }
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<LocalUser>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE kind = 'local' AND email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        row.map(into_local).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        row.map(|r| User::try_from(r).map_err(StoreError::Malformed))
            .transpose()
    }

    async fn insert_local(&self, new: NewLocalUser) -> Result<LocalUser, StoreError> {
        // ON CONFLICT makes check-and-insert a single statement against the
        // unique constraint; a lost race returns no row.
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (kind, name, email, password_hash)
            VALUES ('local', $1, $2, $3)
            ON CONFLICT (email) DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .fetch_optional(&self.db)
        .await?;
        match row {
            Some(row) => into_local(row),
            None => Err(StoreError::DuplicateEmail),
        }
    }

    async fn upsert_external(&self, new: NewExternalUser) -> Result<ExternalUser, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (kind, name, provider, external_id)
            VALUES ('external', $1, $2, $3)
            ON CONFLICT (provider, external_id) DO UPDATE SET name = EXCLUDED.name
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new.name)
        .bind(&new.provider)
        .bind(&new.external_id)
        .fetch_one(&self.db)
        .await?;
        into_external(row)
    }
}

#[derive(Default)]
struct MemoryInner {
    users: HashMap<Uuid, User>,
    by_email: HashMap<String, Uuid>,
    by_identity: HashMap<(String, String), Uuid>,
}

/// In-process store. One lock covers lookup and insert.
#[derive(Default)]
pub struct MemoryUserStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<LocalUser>, StoreError> {
        let inner = self.inner.lock().await;
        let user = inner
            .by_email
            .get(email)
            .and_then(|id| inner.users.get(id))
            .and_then(|u| match u {
                User::Local(local) => Some(local.clone()),
                User::External(_) => None,
            });
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.inner.lock().await.users.get(&id).cloned())
    }

    async fn insert_local(&self, new: NewLocalUser) -> Result<LocalUser, StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.by_email.contains_key(&new.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let user = LocalUser {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.by_email.insert(user.email.clone(), user.id);
        inner.users.insert(user.id, User::Local(user.clone()));
        Ok(user)
    }

    async fn upsert_external(&self, new: NewExternalUser) -> Result<ExternalUser, StoreError> {
        let mut inner = self.inner.lock().await;
        let key = (new.provider.clone(), new.external_id.clone());
        if let Some(id) = inner.by_identity.get(&key).copied() {
            if let Some(User::External(existing)) = inner.users.get_mut(&id) {
                existing.name = new.name;
                return Ok(existing.clone());
            }
            return Err(StoreError::Malformed(id));
        }
        let user = ExternalUser {
            id: Uuid::new_v4(),
            provider: new.provider,
            external_id: new.external_id,
            name: new.name,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.by_identity.insert(key, user.id);
        inner.users.insert(user.id, User::External(user.clone()));
        Ok(user)
    }
}

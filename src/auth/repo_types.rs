use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// A stored identity. Credentialed users and externally-authenticated
/// identities live in the same table but never share a shape.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum User {
    Local(LocalUser),
    External(ExternalUser),
}

impl User {
    pub fn id(&self) -> Uuid {
        match self {
            User::Local(u) => u.id,
            User::External(u) => u.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            User::Local(u) => &u.name,
            User::External(u) => &u.name,
        }
    }
}

/// User who signed up with email and password.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LocalUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string, not exposed in JSON
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Identity vouched for by an external provider (google, github, ...).
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExternalUser {
    pub id: Uuid,
    pub provider: String,
    pub external_id: String,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewLocalUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewExternalUser {
    pub provider: String,
    pub external_id: String,
    pub name: String,
}

/// Row in the `users` table.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub kind: String,
    pub name: String,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub provider: Option<String>,
    pub external_id: Option<String>,
    pub created_at: OffsetDateTime,
}

impl TryFrom<UserRow> for User {
    type Error = Uuid;

    /// Fails with the row id when the columns don't match the declared kind.
    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        match (row.kind.as_str(), row.email, row.password_hash, row.provider, row.external_id) {
            ("local", Some(email), Some(password_hash), _, _) => Ok(User::Local(LocalUser {
                id: row.id,
                name: row.name,
                email,
                password_hash,
                created_at: row.created_at,
            })),
            ("external", _, _, Some(provider), Some(external_id)) => {
                Ok(User::External(ExternalUser {
                    id: row.id,
                    provider,
                    external_id,
                    name: row.name,
                    created_at: row.created_at,
                }))
            }
            _ => Err(row.id),
        }
    }
}

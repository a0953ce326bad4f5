//! Principal records and the store seam used by the auth gate.
//!
//! A [`Principal`] is the authenticated user context: the stored record
//! with the credential column stripped, alive for one request only.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::Row;
use uuid::Uuid;

use crate::db::{ConnectionError, Database};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Alumni,
    Moderator,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alumni => "alumni",
            Self::Moderator => "moderator",
            Self::Admin => "admin",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "alumni" => Ok(Self::Alumni),
            "moderator" => Ok(Self::Moderator),
            "admin" => Ok(Self::Admin),
            other => Err(UnknownRole(other.to_owned())),
        }
    }
}

/// Authenticated user context, attached to a request by the auth gate
/// and discarded with it. Never carries the credential field.
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub active: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("principal query failed: {0}")]
    Query(#[source] sqlx::Error),

    #[error("corrupt principal record: {0}")]
    Corrupt(#[from] UnknownRole),
}

/// Lookup seam between the auth gate and whatever holds user records.
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Principal>, StoreError>;
}

/// Postgres-backed store. Acquires its handle through the connection
/// manager on every lookup, so a recovered connection is picked up
/// without any coordination here.
pub struct PgPrincipalStore {
    db: Arc<Database>,
}

impl PgPrincipalStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PrincipalStore for PgPrincipalStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Principal>, StoreError> {
        let pool = self.db.ensure_connection().await?;

        // password_hash is never part of the projection.
        let row = sqlx::query("SELECT id, name, email, role, is_active FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&pool)
            .await
            .map_err(StoreError::Query)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let role: String = row.get("role");
        Ok(Some(Principal {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            role: role.parse()?,
            active: row.get("is_active"),
        }))
    }
}

/// In-memory store for tests and local experiments.
#[derive(Default)]
pub struct MemoryPrincipalStore {
    records: RwLock<HashMap<Uuid, Principal>>,
}

impl MemoryPrincipalStore {
    pub fn insert(&self, principal: Principal) {
        self.records
            .write()
            .expect("principal map poisoned")
            .insert(principal.id, principal);
    }
}

#[async_trait]
impl PrincipalStore for MemoryPrincipalStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Principal>, StoreError> {
        Ok(self
            .records
            .read()
            .expect("principal map poisoned")
            .get(&id)
            .cloned())
    }
}

//! Storage collaborators.
//!
//! Handlers never talk to the database directly: every lookup goes through one
//! of the traits below, injected as `Arc<dyn …>` inside [`Stores`]. The
//! Postgres implementation backs the running service; the in-memory one backs
//! router tests and the seed tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::credential::CredentialEntry;

pub mod memory;
pub mod postgres;
mod token;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("login name already exists")]
    Conflict,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Clone, Debug)]
pub struct Account {
    pub id: Uuid,
    pub login_name: String,
    pub first_name: String,
    pub last_name: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub occupation: Option<String>,
    pub credential: CredentialEntry,
}

impl Account {
    /// Minimal identity bound to a session after login.
    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity {
            account_id: self.id,
            first_name: self.first_name.clone(),
        }
    }

    #[must_use]
    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            id: self.id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct NewAccount {
    pub login_name: String,
    pub first_name: String,
    pub last_name: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub occupation: Option<String>,
    pub credential: CredentialEntry,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub account_id: Uuid,
    pub first_name: String,
}

/// An established session as returned by [`SessionStore::lookup`].
#[derive(Clone, Debug)]
pub struct Session {
    pub identity: Identity,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct Comment {
    pub id: Uuid,
    pub comment: String,
    pub date_time: DateTime<Utc>,
    pub user_id: Uuid,
}

#[derive(Clone, Debug)]
pub struct NewComment {
    pub comment: String,
    pub date_time: DateTime<Utc>,
    pub user_id: Uuid,
}

#[derive(Clone, Debug)]
pub struct Photo {
    pub id: Uuid,
    pub user_id: Uuid,
    pub file_name: String,
    pub date_time: DateTime<Utc>,
    pub comments: Vec<Comment>,
}

#[derive(Clone, Debug)]
pub struct NewPhoto {
    pub user_id: Uuid,
    pub file_name: String,
    pub date_time: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct SchemaInfo {
    pub id: Uuid,
    pub version: String,
    pub load_date_time: DateTime<Utc>,
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_login_name(&self, login_name: &str) -> StoreResult<Option<Account>>;
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Account>>;
    /// Fails with [`StoreError::Conflict`] when the login name is taken.
    async fn create(&self, account: NewAccount) -> StoreResult<Account>;
    async fn list_summaries(&self) -> StoreResult<Vec<AccountSummary>>;
    async fn summaries_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<AccountSummary>>;
    async fn count(&self) -> StoreResult<i64>;
    async fn clear(&self) -> StoreResult<()>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a session for `identity` and return the raw token for the client.
    async fn establish(&self, identity: &Identity, ttl_seconds: i64) -> StoreResult<String>;
    /// Resolve a client token; expired or destroyed sessions resolve to `None`.
    async fn lookup(&self, token: &str) -> StoreResult<Option<Session>>;
    /// Returns `false` when no session existed for the token.
    async fn destroy(&self, token: &str) -> StoreResult<bool>;
}

#[async_trait]
pub trait PhotoStore: Send + Sync {
    async fn create(&self, photo: NewPhoto) -> StoreResult<Photo>;
    /// Photos owned by `user_id` in upload order, comments included.
    async fn find_by_owner(&self, user_id: Uuid) -> StoreResult<Vec<Photo>>;
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Photo>>;
    /// Returns `None` when the photo does not exist.
    async fn add_comment(&self, photo_id: Uuid, comment: NewComment)
    -> StoreResult<Option<Comment>>;
    async fn count(&self) -> StoreResult<i64>;
    async fn clear(&self) -> StoreResult<()>;
}

#[async_trait]
pub trait SchemaStore: Send + Sync {
    async fn info(&self) -> StoreResult<Option<SchemaInfo>>;
    async fn create(&self, version: &str) -> StoreResult<SchemaInfo>;
    async fn count(&self) -> StoreResult<i64>;
    async fn clear(&self) -> StoreResult<()>;
    /// Connectivity check used by `/health`.
    async fn ping(&self) -> StoreResult<()>;
}

/// Bundle of store handles shared by handlers through an `Extension`.
#[derive(Clone)]
pub struct Stores {
    pub accounts: Arc<dyn AccountStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub photos: Arc<dyn PhotoStore>,
    pub schema: Arc<dyn SchemaStore>,
}

impl Stores {
    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        let store = Arc::new(PgStore::new(pool));
        Self {
            accounts: store.clone(),
            sessions: store.clone(),
            photos: store.clone(),
            schema: store,
        }
    }

    #[must_use]
    pub fn memory() -> Self {
        let store = Arc::new(MemoryStore::default());
        Self {
            accounts: store.clone(),
            sessions: store.clone(),
            photos: store.clone(),
            schema: store,
        }
    }
}

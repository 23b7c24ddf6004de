//! In-process store used by tests and local tooling.
//!
//! All collections live behind one `RwLock`, so a `destroy` is visible to every
//! later `lookup` of the same token.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    Account, AccountStore, AccountSummary, Comment, Identity, NewAccount, NewComment, NewPhoto,
    Photo, PhotoStore, SchemaInfo, SchemaStore, Session, SessionStore, StoreError, StoreResult,
    token::{generate_session_token, hash_session_token},
};

#[derive(Default)]
struct State {
    accounts: Vec<Account>,
    photos: Vec<Photo>,
    schema: Vec<SchemaInfo>,
    sessions: HashMap<Vec<u8>, Session>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

fn count_of(len: usize) -> i64 {
    i64::try_from(len).unwrap_or(i64::MAX)
}

fn expiry_after(ttl_seconds: i64) -> DateTime<Utc> {
    TimeDelta::try_seconds(ttl_seconds)
        .and_then(|delta| Utc::now().checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find_by_login_name(&self, login_name: &str) -> StoreResult<Option<Account>> {
        let state = self.state.read().await;
        Ok(state
            .accounts
            .iter()
            .find(|account| account.login_name == login_name)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Account>> {
        let state = self.state.read().await;
        Ok(state.accounts.iter().find(|account| account.id == id).cloned())
    }

    async fn create(&self, account: NewAccount) -> StoreResult<Account> {
        let mut state = self.state.write().await;
        if state
            .accounts
            .iter()
            .any(|existing| existing.login_name == account.login_name)
        {
            return Err(StoreError::Conflict);
        }
        let created = Account {
            id: Uuid::new_v4(),
            login_name: account.login_name,
            first_name: account.first_name,
            last_name: account.last_name,
            location: account.location,
            description: account.description,
            occupation: account.occupation,
            credential: account.credential,
        };
        state.accounts.push(created.clone());
        Ok(created)
    }

    async fn list_summaries(&self) -> StoreResult<Vec<AccountSummary>> {
        let state = self.state.read().await;
        Ok(state.accounts.iter().map(Account::summary).collect())
    }

    async fn summaries_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<AccountSummary>> {
        let state = self.state.read().await;
        Ok(state
            .accounts
            .iter()
            .filter(|account| ids.contains(&account.id))
            .map(Account::summary)
            .collect())
    }

    async fn count(&self) -> StoreResult<i64> {
        Ok(count_of(self.state.read().await.accounts.len()))
    }

    async fn clear(&self) -> StoreResult<()> {
        let mut state = self.state.write().await;
        // Owned rows go with their accounts, as the Postgres cascade does.
        state.accounts.clear();
        state.photos.clear();
        state.sessions.clear();
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn establish(&self, identity: &Identity, ttl_seconds: i64) -> StoreResult<String> {
        let mut state = self.state.write().await;
        let token = generate_session_token()?;
        state.sessions.insert(
            hash_session_token(&token),
            Session {
                identity: identity.clone(),
                expires_at: expiry_after(ttl_seconds),
            },
        );
        Ok(token)
    }

    async fn lookup(&self, token: &str) -> StoreResult<Option<Session>> {
        let state = self.state.read().await;
        Ok(state
            .sessions
            .get(&hash_session_token(token))
            .filter(|session| session.expires_at > Utc::now())
            .cloned())
    }

    async fn destroy(&self, token: &str) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        Ok(state.sessions.remove(&hash_session_token(token)).is_some())
    }
}

#[async_trait]
impl PhotoStore for MemoryStore {
    async fn create(&self, photo: NewPhoto) -> StoreResult<Photo> {
        let mut state = self.state.write().await;
        let created = Photo {
            id: Uuid::new_v4(),
            user_id: photo.user_id,
            file_name: photo.file_name,
            date_time: photo.date_time,
            comments: Vec::new(),
        };
        state.photos.push(created.clone());
        Ok(created)
    }

    async fn find_by_owner(&self, user_id: Uuid) -> StoreResult<Vec<Photo>> {
        let state = self.state.read().await;
        Ok(state
            .photos
            .iter()
            .filter(|photo| photo.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Photo>> {
        let state = self.state.read().await;
        Ok(state.photos.iter().find(|photo| photo.id == id).cloned())
    }

    async fn add_comment(
        &self,
        photo_id: Uuid,
        comment: NewComment,
    ) -> StoreResult<Option<Comment>> {
        let mut state = self.state.write().await;
        let Some(photo) = state.photos.iter_mut().find(|photo| photo.id == photo_id) else {
            return Ok(None);
        };
        let created = Comment {
            id: Uuid::new_v4(),
            comment: comment.comment,
            date_time: comment.date_time,
            user_id: comment.user_id,
        };
        photo.comments.push(created.clone());
        Ok(Some(created))
    }

    async fn count(&self) -> StoreResult<i64> {
        Ok(count_of(self.state.read().await.photos.len()))
    }

    async fn clear(&self) -> StoreResult<()> {
        self.state.write().await.photos.clear();
        Ok(())
    }
}

#[async_trait]
impl SchemaStore for MemoryStore {
    async fn info(&self) -> StoreResult<Option<SchemaInfo>> {
        Ok(self.state.read().await.schema.first().cloned())
    }

    async fn create(&self, version: &str) -> StoreResult<SchemaInfo> {
        let info = SchemaInfo {
            id: Uuid::new_v4(),
            version: version.to_string(),
            load_date_time: Utc::now(),
        };
        self.state.write().await.schema.push(info.clone());
        Ok(info)
    }

    async fn count(&self) -> StoreResult<i64> {
        Ok(count_of(self.state.read().await.schema.len()))
    }

    async fn clear(&self) -> StoreResult<()> {
        self.state.write().await.schema.clear();
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

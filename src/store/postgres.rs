//! Postgres-backed stores (see `sql/schema.sql`).

use async_trait::async_trait;
use sqlx::{Connection, PgPool, Row, postgres::PgRow};
use std::collections::HashMap;
use tracing::{Instrument, Span, info_span};
use uuid::Uuid;

use super::{
    Account, AccountStore, AccountSummary, Comment, Identity, NewAccount, NewComment, NewPhoto,
    Photo, PhotoStore, SchemaInfo, SchemaStore, Session, SessionStore, StoreError, StoreResult,
    token::{generate_session_token, hash_session_token},
};
use crate::credential::CredentialEntry;

const SESSION_INSERT_ATTEMPTS: usize = 3;
const SCHEMA: &str = include_str!("../../sql/schema.sql");

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply `sql/schema.sql`; every statement is idempotent.
    ///
    /// # Errors
    /// Returns an error if any statement fails.
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .instrument(db_span("DDL", "sql/schema.sql"))
            .await?;
        Ok(())
    }
}

fn db_span(operation: &'static str, statement: &'static str) -> Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn account_from_row(row: &PgRow) -> Account {
    Account {
        id: row.get("id"),
        login_name: row.get("login_name"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        location: row.get("location"),
        description: row.get("description"),
        occupation: row.get("occupation"),
        credential: CredentialEntry {
            salt: row.get("salt"),
            hash: row.get("password_digest"),
        },
    }
}

fn summary_from_row(row: &PgRow) -> AccountSummary {
    AccountSummary {
        id: row.get("id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
    }
}

async fn count_rows(pool: &PgPool, query: &'static str) -> StoreResult<i64> {
    let row = sqlx::query(query)
        .fetch_one(pool)
        .instrument(db_span("SELECT", query))
        .await?;
    Ok(row.get("count"))
}

#[async_trait]
impl AccountStore for PgStore {
    async fn find_by_login_name(&self, login_name: &str) -> StoreResult<Option<Account>> {
        let query = r"
            SELECT id, login_name, password_digest, salt, first_name, last_name,
                   location, description, occupation
            FROM users
            WHERE login_name = $1
        ";
        let row = sqlx::query(query)
            .bind(login_name)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;
        Ok(row.as_ref().map(account_from_row))
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Account>> {
        let query = r"
            SELECT id, login_name, password_digest, salt, first_name, last_name,
                   location, description, occupation
            FROM users
            WHERE id = $1
        ";
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;
        Ok(row.as_ref().map(account_from_row))
    }

    async fn create(&self, account: NewAccount) -> StoreResult<Account> {
        let query = r"
            INSERT INTO users
                (login_name, password_digest, salt, first_name, last_name,
                 location, description, occupation)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
        ";
        let result = sqlx::query(query)
            .bind(&account.login_name)
            .bind(&account.credential.hash)
            .bind(&account.credential.salt)
            .bind(&account.first_name)
            .bind(&account.last_name)
            .bind(&account.location)
            .bind(&account.description)
            .bind(&account.occupation)
            .fetch_one(&self.pool)
            .instrument(db_span("INSERT", query))
            .await;

        let id: Uuid = match result {
            Ok(row) => row.get("id"),
            Err(err) if is_unique_violation(&err) => return Err(StoreError::Conflict),
            Err(err) => return Err(err.into()),
        };

        Ok(Account {
            id,
            login_name: account.login_name,
            first_name: account.first_name,
            last_name: account.last_name,
            location: account.location,
            description: account.description,
            occupation: account.occupation,
            credential: account.credential,
        })
    }

    async fn list_summaries(&self) -> StoreResult<Vec<AccountSummary>> {
        let query = "SELECT id, first_name, last_name FROM users ORDER BY created_at, id";
        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;
        Ok(rows.iter().map(summary_from_row).collect())
    }

    async fn summaries_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<AccountSummary>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = "SELECT id, first_name, last_name FROM users WHERE id = ANY($1)";
        let rows = sqlx::query(query)
            .bind(ids)
            .fetch_all(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;
        Ok(rows.iter().map(summary_from_row).collect())
    }

    async fn count(&self) -> StoreResult<i64> {
        count_rows(&self.pool, "SELECT COUNT(*) AS count FROM users").await
    }

    async fn clear(&self) -> StoreResult<()> {
        // Photos, comments and sessions cascade.
        let query = "DELETE FROM users";
        sqlx::query(query)
            .execute(&self.pool)
            .instrument(db_span("DELETE", query))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn establish(&self, identity: &Identity, ttl_seconds: i64) -> StoreResult<String> {
        let query = r"
            INSERT INTO user_sessions (session_hash, user_id, first_name, expires_at)
            VALUES ($1, $2, $3, NOW() + ($4 * INTERVAL '1 second'))
        ";
        let span = db_span("INSERT", query);

        for _ in 0..SESSION_INSERT_ATTEMPTS {
            let token = generate_session_token()?;
            let result = sqlx::query(query)
                .bind(hash_session_token(&token))
                .bind(identity.account_id)
                .bind(&identity.first_name)
                .bind(ttl_seconds)
                .execute(&self.pool)
                .instrument(span.clone())
                .await;

            match result {
                Ok(_) => return Ok(token),
                Err(err) if is_unique_violation(&err) => {}
                Err(err) => return Err(err.into()),
            }
        }

        Err(anyhow::anyhow!("failed to generate unique session token").into())
    }

    async fn lookup(&self, token: &str) -> StoreResult<Option<Session>> {
        let query = r"
            SELECT user_id, first_name, expires_at
            FROM user_sessions
            WHERE session_hash = $1
              AND expires_at > NOW()
            LIMIT 1
        ";
        let row = sqlx::query(query)
            .bind(hash_session_token(token))
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;

        Ok(row.map(|row| Session {
            identity: Identity {
                account_id: row.get("user_id"),
                first_name: row.get("first_name"),
            },
            expires_at: row.get("expires_at"),
        }))
    }

    async fn destroy(&self, token: &str) -> StoreResult<bool> {
        let query = "DELETE FROM user_sessions WHERE session_hash = $1";
        let result = sqlx::query(query)
            .bind(hash_session_token(token))
            .execute(&self.pool)
            .instrument(db_span("DELETE", query))
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

impl PgStore {
    /// Load comments for `photos` and attach them in insertion order.
    async fn attach_comments(&self, photos: &mut [Photo]) -> StoreResult<()> {
        if photos.is_empty() {
            return Ok(());
        }
        let ids: Vec<Uuid> = photos.iter().map(|photo| photo.id).collect();
        let query = r"
            SELECT id, photo_id, user_id, comment, date_time
            FROM comments
            WHERE photo_id = ANY($1)
            ORDER BY seq
        ";
        let rows = sqlx::query(query)
            .bind(&ids)
            .fetch_all(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;

        let mut by_photo: HashMap<Uuid, Vec<Comment>> = HashMap::new();
        for row in rows {
            by_photo
                .entry(row.get("photo_id"))
                .or_default()
                .push(Comment {
                    id: row.get("id"),
                    comment: row.get("comment"),
                    date_time: row.get("date_time"),
                    user_id: row.get("user_id"),
                });
        }
        for photo in photos.iter_mut() {
            photo.comments = by_photo.remove(&photo.id).unwrap_or_default();
        }
        Ok(())
    }
}

fn photo_from_row(row: &PgRow) -> Photo {
    Photo {
        id: row.get("id"),
        user_id: row.get("user_id"),
        file_name: row.get("file_name"),
        date_time: row.get("date_time"),
        comments: Vec::new(),
    }
}

#[async_trait]
impl PhotoStore for PgStore {
    async fn create(&self, photo: NewPhoto) -> StoreResult<Photo> {
        let query = r"
            INSERT INTO photos (user_id, file_name, date_time)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, file_name, date_time
        ";
        let row = sqlx::query(query)
            .bind(photo.user_id)
            .bind(&photo.file_name)
            .bind(photo.date_time)
            .fetch_one(&self.pool)
            .instrument(db_span("INSERT", query))
            .await?;
        Ok(photo_from_row(&row))
    }

    async fn find_by_owner(&self, user_id: Uuid) -> StoreResult<Vec<Photo>> {
        let query = r"
            SELECT id, user_id, file_name, date_time
            FROM photos
            WHERE user_id = $1
            ORDER BY seq
        ";
        let rows = sqlx::query(query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;
        let mut photos: Vec<Photo> = rows.iter().map(photo_from_row).collect();
        self.attach_comments(&mut photos).await?;
        Ok(photos)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Photo>> {
        let query = "SELECT id, user_id, file_name, date_time FROM photos WHERE id = $1";
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let mut photos = [photo_from_row(&row)];
        self.attach_comments(&mut photos).await?;
        let [photo] = photos;
        Ok(Some(photo))
    }

    async fn add_comment(
        &self,
        photo_id: Uuid,
        comment: NewComment,
    ) -> StoreResult<Option<Comment>> {
        // Insert only when the photo exists, in a single statement.
        let query = r"
            INSERT INTO comments (photo_id, user_id, comment, date_time)
            SELECT id, $2, $3, $4 FROM photos WHERE id = $1
            RETURNING id
        ";
        let row = sqlx::query(query)
            .bind(photo_id)
            .bind(comment.user_id)
            .bind(&comment.comment)
            .bind(comment.date_time)
            .fetch_optional(&self.pool)
            .instrument(db_span("INSERT", query))
            .await?;

        Ok(row.map(|row| Comment {
            id: row.get("id"),
            comment: comment.comment,
            date_time: comment.date_time,
            user_id: comment.user_id,
        }))
    }

    async fn count(&self) -> StoreResult<i64> {
        count_rows(&self.pool, "SELECT COUNT(*) AS count FROM photos").await
    }

    async fn clear(&self) -> StoreResult<()> {
        let query = "DELETE FROM photos";
        sqlx::query(query)
            .execute(&self.pool)
            .instrument(db_span("DELETE", query))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SchemaStore for PgStore {
    async fn info(&self) -> StoreResult<Option<SchemaInfo>> {
        let query = r"
            SELECT id, version, load_date_time
            FROM schema_info
            ORDER BY load_date_time
            LIMIT 1
        ";
        let row = sqlx::query(query)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;
        Ok(row.map(|row| SchemaInfo {
            id: row.get("id"),
            version: row.get("version"),
            load_date_time: row.get("load_date_time"),
        }))
    }

    async fn create(&self, version: &str) -> StoreResult<SchemaInfo> {
        let query = r"
            INSERT INTO schema_info (version)
            VALUES ($1)
            RETURNING id, version, load_date_time
        ";
        let row = sqlx::query(query)
            .bind(version)
            .fetch_one(&self.pool)
            .instrument(db_span("INSERT", query))
            .await?;
        Ok(SchemaInfo {
            id: row.get("id"),
            version: row.get("version"),
            load_date_time: row.get("load_date_time"),
        })
    }

    async fn count(&self) -> StoreResult<i64> {
        count_rows(&self.pool, "SELECT COUNT(*) AS count FROM schema_info").await
    }

    async fn clear(&self) -> StoreResult<()> {
        let query = "DELETE FROM schema_info";
        sqlx::query(query)
            .execute(&self.pool)
            .instrument(db_span("DELETE", query))
            .await?;
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self.pool.acquire().instrument(acquire_span).await?;
        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping().instrument(ping_span).await?;
        Ok(())
    }
}

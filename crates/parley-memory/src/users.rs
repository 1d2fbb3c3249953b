use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use parley_core::{normalize_username, ValidationError};
use parley_schema::User;
use rusqlite::{params, Connection, Row};
use tokio::task;
use uuid::Uuid;

/// Accounts and their login sessions. Passwords arrive here already hashed;
/// session tokens arrive as SHA-256 digests, never in the clear.
#[derive(Clone)]
pub struct UserStore {
    db: Arc<Mutex<Connection>>,
}

impl UserStore {
    pub(crate) fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    /// Create an account. The duplicate check and the insert run under the
    /// same lock, so two concurrent registrations of one username cannot
    /// both succeed.
    pub async fn create(&self, username: &str, password_hash: &str) -> Result<User> {
        let username = normalize_username(username)?;
        let password_hash = password_hash.to_owned();
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| anyhow!("failed to lock sqlite connection"))?;
            let taken: bool = conn
                .query_row(
                    "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
                    params![username],
                    |row| row.get(0),
                )?;
            if taken {
                return Err(ValidationError::UsernameTaken.into());
            }

            let user = User {
                id: Uuid::new_v4(),
                username,
                display_name: None,
                email: None,
                password_hash,
                created_at: Utc::now(),
            };
            conn.execute(
                r#"
                INSERT INTO users (id, username, display_name, email, password_hash, created_at)
                VALUES (?1, ?2, NULL, NULL, ?3, ?4)
                "#,
                params![
                    user.id.to_string(),
                    user.username,
                    user.password_hash,
                    user.created_at.to_rfc3339(),
                ],
            )?;
            Ok::<User, anyhow::Error>(user)
        })
        .await?
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let username = username.trim().to_lowercase();
        self.select_user("username = ?1", username).await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        self.select_user("id = ?1", id.to_string()).await
    }

    /// Update profile fields; `None` leaves a field untouched. Returns the
    /// updated user, or `None` when the id is unknown.
    pub async fn update_profile(
        &self,
        id: Uuid,
        display_name: Option<String>,
        email: Option<String>,
    ) -> Result<Option<User>> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| anyhow!("failed to lock sqlite connection"))?;
            conn.execute(
                r#"
                UPDATE users SET
                    display_name = COALESCE(?2, display_name),
                    email = COALESCE(?3, email)
                WHERE id = ?1
                "#,
                params![id.to_string(), display_name, email],
            )?;

            let mut stmt = conn.prepare(
                "SELECT id, username, display_name, email, password_hash, created_at
                 FROM users WHERE id = ?1 LIMIT 1",
            )?;
            let mut rows = stmt.query(params![id.to_string()])?;
            if let Some(row) = rows.next()? {
                return Ok::<Option<User>, anyhow::Error>(Some(row_to_user(row)?));
            }
            Ok::<Option<User>, anyhow::Error>(None)
        })
        .await?
    }

    pub async fn create_session(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let token_hash = token_hash.to_owned();
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| anyhow!("failed to lock sqlite connection"))?;
            conn.execute(
                r#"
                INSERT INTO sessions (token_hash, user_id, created_at, expires_at)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                params![
                    token_hash,
                    user_id.to_string(),
                    Utc::now().to_rfc3339(),
                    expires_at.to_rfc3339(),
                ],
            )?;
            Ok::<(), anyhow::Error>(())
        })
        .await??;

        Ok(())
    }

    /// Resolve a session token digest to its user, ignoring expired rows.
    pub async fn session_user(&self, token_hash: &str) -> Result<Option<User>> {
        let token_hash = token_hash.to_owned();
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| anyhow!("failed to lock sqlite connection"))?;
            let mut stmt = conn.prepare(
                r#"
                SELECT u.id, u.username, u.display_name, u.email, u.password_hash, u.created_at
                FROM sessions s
                JOIN users u ON u.id = s.user_id
                WHERE s.token_hash = ?1 AND s.expires_at > ?2
                LIMIT 1
                "#,
            )?;
            let mut rows = stmt.query(params![token_hash, Utc::now().to_rfc3339()])?;
            if let Some(row) = rows.next()? {
                return Ok::<Option<User>, anyhow::Error>(Some(row_to_user(row)?));
            }
            Ok::<Option<User>, anyhow::Error>(None)
        })
        .await?
    }

    pub async fn delete_session(&self, token_hash: &str) -> Result<bool> {
        let token_hash = token_hash.to_owned();
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| anyhow!("failed to lock sqlite connection"))?;
            let deleted = conn.execute(
                "DELETE FROM sessions WHERE token_hash = ?1",
                params![token_hash],
            )?;
            Ok::<bool, anyhow::Error>(deleted > 0)
        })
        .await?
    }

    pub async fn purge_expired_sessions(&self) -> Result<usize> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| anyhow!("failed to lock sqlite connection"))?;
            let purged = conn.execute(
                "DELETE FROM sessions WHERE expires_at <= ?1",
                params![Utc::now().to_rfc3339()],
            )?;
            Ok::<usize, anyhow::Error>(purged)
        })
        .await?
    }

    async fn select_user(&self, where_clause: &'static str, value: String) -> Result<Option<User>> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| anyhow!("failed to lock sqlite connection"))?;
            let sql = format!(
                "SELECT id, username, display_name, email, password_hash, created_at
                 FROM users WHERE {where_clause} LIMIT 1"
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params![value])?;
            if let Some(row) = rows.next()? {
                return Ok::<Option<User>, anyhow::Error>(Some(row_to_user(row)?));
            }
            Ok::<Option<User>, anyhow::Error>(None)
        })
        .await?
    }
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    let id_raw: String = row.get(0)?;
    let created_at_raw: String = row.get(5)?;
    Ok(User {
        id: crate::db::parse_uuid_sql(&id_raw)?,
        username: row.get(1)?,
        display_name: row.get(2)?,
        email: row.get(3)?,
        password_hash: row.get(4)?,
        created_at: crate::db::parse_datetime_sql(&created_at_raw)?,
    })
}

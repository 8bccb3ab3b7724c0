//! SQLite persistence: pool setup, schema migration, and the user store.
//!
//! The task store lives in [`crate::tasks::store`] and shares this pool.

use anyhow::{Context as _, Result};
use chrono::Utc;
use serde::Serialize;
use sqlx::{sqlite::SqliteConnectOptions, SqlitePool};
use std::{path::Path, str::FromStr};
use uuid::Uuid;

/// Default timeout for individual SQLite queries.
/// Prevents hung queries from blocking the service indefinitely.
pub const QUERY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Execute a future with the standard query timeout.
/// Returns an error if the operation takes longer than [`QUERY_TIMEOUT`].
pub async fn with_timeout<T>(fut: impl std::future::Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(QUERY_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!(
            "store timed out after {}s",
            QUERY_TIMEOUT.as_secs()
        )),
    }
}

/// An identity record. The credential hash and salt are opaque to every
/// module except [`crate::auth::credentials`] and are never serialized
/// outward — use [`PublicUser`] for all response bodies.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    /// Stored lowercase-normalized.
    pub email: String,
    pub password_hash: String,
    pub password_salt: String,
    pub created_at: String,
}

/// Public view of a user — safe to send to any caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: String,
}

impl From<UserRow> for PublicUser {
    fn from(u: UserRow) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            created_at: u.created_at,
        }
    }
}

#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    pub async fn new(data_dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir).await?;
        let db_path = data_dir.join("taskd.db");
        let opts =
            SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", db_path.display()))?
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .create_if_missing(true);

        let pool = SqlitePool::connect_with(opts).await?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    /// Return a clone of the connection pool (cheap — Arc-backed).
    /// Used to create the TaskStore sharing the same SQLite connection.
    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    /// Idempotent schema creation.
    async fn migrate(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id             TEXT PRIMARY KEY,
                username       TEXT NOT NULL UNIQUE,
                email          TEXT NOT NULL UNIQUE,
                password_hash  TEXT NOT NULL,
                password_salt  TEXT NOT NULL,
                created_at     TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await
        .context("creating users table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id                     TEXT PRIMARY KEY,
                user_id                TEXT NOT NULL,
                title                  TEXT NOT NULL,
                description            TEXT,
                category               TEXT NOT NULL DEFAULT 'personal',
                priority               TEXT NOT NULL DEFAULT 'medium',
                status                 TEXT NOT NULL DEFAULT 'todo',
                completed              INTEGER NOT NULL DEFAULT 0,
                completion_date        TEXT,
                completion_percentage  INTEGER NOT NULL DEFAULT 0,
                due_date               TEXT NOT NULL,
                start_date             TEXT,
                estimated_hours        REAL NOT NULL DEFAULT 1,
                actual_hours           REAL NOT NULL DEFAULT 0,
                reminder               TEXT,
                is_recurring           INTEGER NOT NULL DEFAULT 0,
                recurrence_pattern     TEXT NOT NULL DEFAULT 'none',
                tags                   TEXT NOT NULL DEFAULT '[]',
                project                TEXT,
                dependencies           TEXT NOT NULL DEFAULT '[]',
                difficulty             TEXT NOT NULL DEFAULT 'medium',
                energy_level           TEXT NOT NULL DEFAULT 'medium',
                focus_required         TEXT NOT NULL DEFAULT 'medium',
                ai_priority_score      INTEGER NOT NULL DEFAULT 50,
                attachments            TEXT NOT NULL DEFAULT '[]',
                notes                  TEXT NOT NULL DEFAULT '[]',
                time_slots             TEXT NOT NULL DEFAULT '[]',
                created_at             TEXT NOT NULL,
                updated_at             TEXT NOT NULL,
                last_viewed            TEXT NOT NULL,
                is_deleted             INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_tasks_user ON tasks(user_id);
            CREATE INDEX IF NOT EXISTS idx_tasks_user_due ON tasks(user_id, due_date);
            CREATE INDEX IF NOT EXISTS idx_tasks_user_status ON tasks(user_id, status);
            "#,
        )
        .execute(pool)
        .await
        .context("creating tasks table")?;

        Ok(())
    }

    // ─── Users ──────────────────────────────────────────────────────────────

    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        password_salt: &str,
    ) -> Result<UserRow> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, password_salt, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(password_salt)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        self.get_user(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("user not found after insert"))
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<UserRow>> {
        with_timeout(async {
            Ok(sqlx::query_as("SELECT * FROM users WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?)
        })
        .await
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        with_timeout(async {
            Ok(sqlx::query_as("SELECT * FROM users WHERE username = ?")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?)
        })
        .await
    }

    /// Lookup by lowercase-normalized email.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        with_timeout(async {
            Ok(sqlx::query_as("SELECT * FROM users WHERE email = ?")
                .bind(email.to_lowercase())
                .fetch_optional(&self.pool)
                .await?)
        })
        .await
    }
}

//! PostgreSQL credential store
//!
//! Every mutation is a single `UPDATE ... RETURNING *` statement, so row-level
//! locking gives per-account atomicity without any in-process lock.

use super::{AccountRecord, CredentialStore};
use crate::error::AccountError;
use crate::models::{Account, AccountChanges, Identifier};

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    db: PgPool,
}

impl PgCredentialStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Get reference to the database pool
    pub fn db(&self) -> &PgPool {
        &self.db
    }

    /// Create the accounts table and indexes if missing
    pub async fn migrate(&self) -> Result<(), AccountError> {
        tracing::info!("Running account database migrations");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                username VARCHAR(100) NOT NULL UNIQUE,
                email VARCHAR(255) NOT NULL UNIQUE,
                full_name VARCHAR(255) NOT NULL,
                avatar VARCHAR(500) NOT NULL,
                cover_image VARCHAR(500) NOT NULL DEFAULT '',
                password_hash VARCHAR(255) NOT NULL,
                refresh_token TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_accounts_full_name ON accounts(full_name);")
            .execute(&self.db)
            .await?;

        tracing::info!("Account migrations completed successfully");
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_identifier(
        &self,
        identifier: &Identifier,
    ) -> Result<Option<Account>, AccountError> {
        if identifier.is_empty() {
            return Ok(None);
        }

        let account = sqlx::query_as::<_, Account>(
            "SELECT * FROM accounts WHERE username = $1 OR email = $2 LIMIT 1",
        )
        .bind(&identifier.username)
        .bind(&identifier.email)
        .fetch_optional(&self.db)
        .await?;

        Ok(account)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AccountError> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(account)
    }

    async fn insert(&self, record: AccountRecord) -> Result<Account, AccountError> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (username, email, full_name, avatar, cover_image, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&record.username)
        .bind(&record.email)
        .bind(&record.full_name)
        .bind(&record.avatar)
        .bind(&record.cover_image)
        .bind(&record.password_hash)
        .fetch_one(&self.db)
        .await?;

        Ok(account)
    }

    async fn apply_changes(
        &self,
        id: Uuid,
        changes: AccountChanges,
    ) -> Result<Option<Account>, AccountError> {
        let (set_refresh, refresh_token) = match changes.refresh_token {
            Some(value) => (true, value),
            None => (false, None),
        };

        let account = sqlx::query_as::<_, Account>(
            r#"
            UPDATE accounts SET
                full_name = COALESCE($2, full_name),
                avatar = COALESCE($3, avatar),
                cover_image = COALESCE($4, cover_image),
                password_hash = COALESCE($5, password_hash),
                refresh_token = CASE WHEN $6 THEN $7 ELSE refresh_token END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.full_name)
        .bind(&changes.avatar)
        .bind(&changes.cover_image)
        .bind(&changes.password_hash)
        .bind(set_refresh)
        .bind(&refresh_token)
        .fetch_optional(&self.db)
        .await?;

        Ok(account)
    }

    async fn replace_refresh_token(
        &self,
        id: Uuid,
        expected: &str,
        replacement: &str,
    ) -> Result<Option<Account>, AccountError> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            UPDATE accounts SET
                refresh_token = $3,
                updated_at = NOW()
            WHERE id = $1 AND refresh_token = $2 AND refresh_token <> ''
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(expected)
        .bind(replacement)
        .fetch_optional(&self.db)
        .await?;

        Ok(account)
    }
}

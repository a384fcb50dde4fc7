//! In-process credential store
//!
//! Every operation holds the map lock for its whole read-modify-write, which
//! gives the same per-record atomicity the Postgres backend gets from
//! single-statement updates.

use super::{AccountRecord, CredentialStore};
use crate::error::AccountError;
use crate::models::{Account, AccountChanges, Identifier};

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    accounts: RwLock<HashMap<Uuid, Account>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts
    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_identifier(
        &self,
        identifier: &Identifier,
    ) -> Result<Option<Account>, AccountError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.values().find(|a| identifier.matches(a)).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AccountError> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn insert(&self, record: AccountRecord) -> Result<Account, AccountError> {
        let mut accounts = self.accounts.write().await;

        let taken = accounts
            .values()
            .any(|a| a.username == record.username || a.email == record.email);
        if taken {
            return Err(AccountError::Conflict);
        }

        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            username: record.username,
            email: record.email,
            full_name: record.full_name,
            avatar: record.avatar,
            cover_image: record.cover_image,
            password_hash: record.password_hash,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        accounts.insert(account.id, account.clone());

        Ok(account)
    }

    async fn apply_changes(
        &self,
        id: Uuid,
        changes: AccountChanges,
    ) -> Result<Option<Account>, AccountError> {
        let mut accounts = self.accounts.write().await;
        let Some(account) = accounts.get_mut(&id) else {
            return Ok(None);
        };

        changes.apply(account);
        Ok(Some(account.clone()))
    }

    async fn replace_refresh_token(
        &self,
        id: Uuid,
        expected: &str,
        replacement: &str,
    ) -> Result<Option<Account>, AccountError> {
        let mut accounts = self.accounts.write().await;
        let Some(account) = accounts.get_mut(&id) else {
            return Ok(None);
        };

        if !account.holds_refresh_token(expected) {
            return Ok(None);
        }

        account.refresh_token = Some(replacement.to_string());
        account.updated_at = Utc::now();
        Ok(Some(account.clone()))
    }
}

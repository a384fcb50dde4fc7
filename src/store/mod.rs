//! Credential Store
//!
//! Persists one record per account. Backends only implement single-record
//! atomic primitives; hashing of new or changed passwords happens here, in
//! the shared create/update path, so no backend ever sees a plaintext.

mod memory;
mod postgres;

pub use memory::MemoryCredentialStore;
pub use postgres::PgCredentialStore;

use crate::error::AccountError;
use crate::models::{normalize, Account, AccountChanges, AccountPatch, Identifier, NewAccount};
use crate::password::PasswordHasher;

use async_trait::async_trait;
use uuid::Uuid;

/// A new account with its password already hashed
#[derive(Debug, Clone)]
pub struct AccountRecord {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: String,
    pub password_hash: String,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Find the account whose username or email matches
    async fn find_by_identifier(
        &self,
        identifier: &Identifier,
    ) -> Result<Option<Account>, AccountError>;

    /// Find an account by id
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AccountError>;

    /// Insert a record; fails `Conflict` if username or email is taken
    async fn insert(&self, record: AccountRecord) -> Result<Account, AccountError>;

    /// Apply already-hashed changes to one record
    async fn apply_changes(
        &self,
        id: Uuid,
        changes: AccountChanges,
    ) -> Result<Option<Account>, AccountError>;

    /// Swap the stored refresh token only if it still equals `expected`
    ///
    /// Returns `None` when the account is missing or holds another value.
    async fn replace_refresh_token(
        &self,
        id: Uuid,
        expected: &str,
        replacement: &str,
    ) -> Result<Option<Account>, AccountError>;

    /// Create an account, hashing its password
    async fn create(&self, account: NewAccount) -> Result<Account, AccountError> {
        let password_hash = PasswordHasher::new().hash(&account.password).await?;

        self.insert(AccountRecord {
            username: normalize(&account.username),
            email: normalize(&account.email),
            full_name: account.full_name.trim().to_string(),
            avatar: account.avatar,
            cover_image: account.cover_image,
            password_hash,
        })
        .await
    }

    /// Update an account, rehashing only when the patch carries a new password
    async fn update_by_id(
        &self,
        id: Uuid,
        patch: AccountPatch,
    ) -> Result<Option<Account>, AccountError> {
        let password_hash = match patch.password.as_deref() {
            Some(password) => Some(PasswordHasher::new().hash(password).await?),
            None => None,
        };

        let changes = AccountChanges {
            full_name: patch.full_name,
            avatar: patch.avatar,
            cover_image: patch.cover_image,
            password_hash,
            refresh_token: patch.refresh_token,
        };

        self.apply_changes(id, changes).await
    }
}

//! Session Manager
//!
//! Login, logout, refresh-token rotation and password changes. The stored
//! refresh token is the single source of truth for whether an account has a
//! session: only the exact stored value can be exchanged, and every exchange
//! replaces it.

use crate::error::AccountError;
use crate::models::*;
use crate::password::PasswordHasher;
use crate::store::CredentialStore;
use crate::tokens::TokenIssuer;

use std::sync::Arc;
use uuid::Uuid;

pub struct SessionManager {
    store: Arc<dyn CredentialStore>,
    tokens: Arc<TokenIssuer>,
    hasher: PasswordHasher,
}

impl SessionManager {
    pub fn new(store: Arc<dyn CredentialStore>, tokens: Arc<TokenIssuer>) -> Self {
        Self {
            store,
            tokens,
            hasher: PasswordHasher::new(),
        }
    }

    /// Authenticate by username or email and start a new session
    ///
    /// Any previous refresh token for the account stops working.
    pub async fn login(
        &self,
        identifier: &Identifier,
        password: &str,
    ) -> Result<LoginResponse, AccountError> {
        if identifier.is_empty() {
            return Err(AccountError::validation(
                "Username or email is required",
                vec!["username".to_string(), "email".to_string()],
            ));
        }

        let account = self
            .store
            .find_by_identifier(identifier)
            .await?
            .ok_or(AccountError::NotFound)?;

        if !self.hasher.verify(password, &account.password_hash).await {
            tracing::info!(account_id = %account.id, "Login rejected: wrong password");
            return Err(AccountError::InvalidCredentials);
        }

        let access_token = self.tokens.issue_access(&account)?;
        let refresh_token = self.tokens.issue_refresh(account.id)?;

        let account = self
            .store
            .update_by_id(account.id, AccountPatch::refresh_token(refresh_token.clone()))
            .await?
            .ok_or(AccountError::NotFound)?;

        tracing::info!(account_id = %account.id, "User logged in");

        Ok(LoginResponse {
            user: AccountProjection::from(account),
            access_token,
            refresh_token,
        })
    }

    /// Exchange the current refresh token for a new access/refresh pair
    pub async fn refresh(&self, presented: Option<&str>) -> Result<TokenPair, AccountError> {
        let presented = presented
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AccountError::Unauthorized)?;

        let claims = self
            .tokens
            .verify_refresh(presented)
            .map_err(|_| AccountError::InvalidToken)?;

        let account = self
            .store
            .find_by_id(claims.sub)
            .await?
            .ok_or(AccountError::InvalidToken)?;

        if !account.holds_refresh_token(presented) {
            tracing::warn!(
                account_id = %account.id,
                "Refresh token does not match the stored session"
            );
            return Err(AccountError::SessionExpired);
        }

        let access_token = self.tokens.issue_access(&account)?;
        let refresh_token = self.tokens.issue_refresh(account.id)?;

        // A concurrent refresh may have rotated the token since the read above
        let rotated = self
            .store
            .replace_refresh_token(account.id, presented, &refresh_token)
            .await?;
        if rotated.is_none() {
            tracing::warn!(account_id = %account.id, "Refresh token rotated concurrently");
            return Err(AccountError::SessionExpired);
        }

        tracing::info!(account_id = %account.id, "Session refreshed");

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// End the account's session; succeeds when there is none
    pub async fn logout(&self, account_id: Uuid) -> Result<(), AccountError> {
        let updated = self
            .store
            .update_by_id(account_id, AccountPatch::clear_session())
            .await?;

        if updated.is_none() {
            tracing::debug!(account_id = %account_id, "Logout for unknown account");
        } else {
            tracing::info!(account_id = %account_id, "User logged out");
        }

        Ok(())
    }

    /// Change the password after checking the current one
    ///
    /// The existing refresh token is left in place, so the current session
    /// survives the change.
    pub async fn change_password(
        &self,
        account_id: Uuid,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AccountError> {
        let account = self
            .store
            .find_by_id(account_id)
            .await?
            .ok_or(AccountError::NotFound)?;

        if !self.hasher.verify(old_password, &account.password_hash).await {
            return Err(AccountError::InvalidCredentials);
        }

        self.store
            .update_by_id(account_id, AccountPatch::password(new_password))
            .await?
            .ok_or(AccountError::NotFound)?;

        tracing::info!(account_id = %account_id, "Password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCredentialStore;
    use tokio_test::{assert_err, assert_ok};

    struct Fixture {
        store: Arc<MemoryCredentialStore>,
        sessions: Arc<SessionManager>,
        account: Account,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryCredentialStore::new());
        let tokens = Arc::new(TokenIssuer::from_secrets(
            "access-secret-access-secret-0123",
            900,
            "refresh-secret-refresh-secret-01",
            864000,
        ));
        let account = store
            .create(NewAccount {
                username: "ann".into(),
                email: "ann@x.com".into(),
                full_name: "Ann".into(),
                avatar: "/media/a.png".into(),
                cover_image: String::new(),
                password: "secret1".into(),
            })
            .await
            .unwrap();
        let sessions = Arc::new(SessionManager::new(store.clone(), tokens));

        Fixture {
            store,
            sessions,
            account,
        }
    }

    fn by_username(username: &str) -> Identifier {
        Identifier::new(Some(username), None)
    }

    #[tokio::test]
    async fn test_login_stores_refresh_token() {
        let f = fixture().await;
        let response = f.sessions.login(&by_username("ann"), "secret1").await.unwrap();

        assert_eq!(response.user.id, f.account.id);
        let stored = f.store.find_by_id(f.account.id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_token.as_deref(), Some(response.refresh_token.as_str()));
    }

    #[tokio::test]
    async fn test_login_by_email_is_case_insensitive() {
        let f = fixture().await;
        let id = Identifier::new(None, Some("ANN@x.com"));
        assert_ok!(f.sessions.login(&id, "secret1").await);
    }

    #[tokio::test]
    async fn test_login_failures() {
        let f = fixture().await;

        let err = f.sessions.login(&by_username("bob"), "secret1").await.unwrap_err();
        assert!(matches!(err, AccountError::NotFound));

        let err = f.sessions.login(&by_username("ann"), "wrong").await.unwrap_err();
        assert!(matches!(err, AccountError::InvalidCredentials));

        let err = f
            .sessions
            .login(&Identifier::default(), "secret1")
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_second_login_invalidates_first_session() {
        let f = fixture().await;
        let first = f.sessions.login(&by_username("ann"), "secret1").await.unwrap();
        let _second = f.sessions.login(&by_username("ann"), "secret1").await.unwrap();

        let err = f
            .sessions
            .refresh(Some(&first.refresh_token))
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::SessionExpired));
    }

    #[tokio::test]
    async fn test_refresh_rotates_exactly_once() {
        let f = fixture().await;
        let login = f.sessions.login(&by_username("ann"), "secret1").await.unwrap();

        let pair = f.sessions.refresh(Some(&login.refresh_token)).await.unwrap();
        assert_ne!(pair.refresh_token, login.refresh_token);

        let err = f
            .sessions
            .refresh(Some(&login.refresh_token))
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::SessionExpired));

        assert_ok!(f.sessions.refresh(Some(&pair.refresh_token)).await);
    }

    #[tokio::test]
    async fn test_refresh_rejections() {
        let f = fixture().await;

        let err = f.sessions.refresh(None).await.unwrap_err();
        assert!(matches!(err, AccountError::Unauthorized));

        let err = f.sessions.refresh(Some("  ")).await.unwrap_err();
        assert!(matches!(err, AccountError::Unauthorized));

        let err = f.sessions.refresh(Some("not.a.jwt")).await.unwrap_err();
        assert!(matches!(err, AccountError::InvalidToken));

        // validly signed, but for an account that does not exist
        let orphan = TokenIssuer::from_secrets(
            "access-secret-access-secret-0123",
            900,
            "refresh-secret-refresh-secret-01",
            864000,
        )
        .issue_refresh(Uuid::new_v4())
        .unwrap();
        let err = f.sessions.refresh(Some(&orphan)).await.unwrap_err();
        assert!(matches!(err, AccountError::InvalidToken));
    }

    #[tokio::test]
    async fn test_refresh_without_session_is_expired() {
        let f = fixture().await;
        let login = f.sessions.login(&by_username("ann"), "secret1").await.unwrap();
        f.sessions.logout(f.account.id).await.unwrap();

        let err = f
            .sessions
            .refresh(Some(&login.refresh_token))
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::SessionExpired));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_refresh_single_winner() {
        let f = fixture().await;
        let login = f.sessions.login(&by_username("ann"), "secret1").await.unwrap();

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let sessions = f.sessions.clone();
                let token = login.refresh_token.clone();
                tokio::spawn(async move { sessions.refresh(Some(&token)).await })
            })
            .collect();

        let mut successes = 0;
        let mut expired = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(AccountError::SessionExpired) => expired += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(expired, 1);
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let f = fixture().await;
        f.sessions.login(&by_username("ann"), "secret1").await.unwrap();

        assert_ok!(f.sessions.logout(f.account.id).await);
        assert_ok!(f.sessions.logout(f.account.id).await);
        assert_ok!(f.sessions.logout(Uuid::new_v4()).await);

        let stored = f.store.find_by_id(f.account.id).await.unwrap().unwrap();
        assert!(!stored.has_session());
    }

    #[tokio::test]
    async fn test_change_password_keeps_session() {
        let f = fixture().await;
        let login = f.sessions.login(&by_username("ann"), "secret1").await.unwrap();

        assert_err!(
            f.sessions
                .change_password(f.account.id, "wrong", "secret2")
                .await
        );
        assert_ok!(
            f.sessions
                .change_password(f.account.id, "secret1", "secret2")
                .await
        );

        assert_err!(f.sessions.login(&by_username("ann"), "secret1").await);
        assert_ok!(f.sessions.refresh(Some(&login.refresh_token)).await);
    }

    #[tokio::test]
    async fn test_change_password_unknown_account() {
        let f = fixture().await;
        let err = f
            .sessions
            .change_password(Uuid::new_v4(), "secret1", "secret2")
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::NotFound));
    }
}

//! Account Service
//!
//! Wires the credential store, token issuer, session manager and registrar
//! together for the HTTP layer.

use crate::config::AccountsConfig;
use crate::error::AccountError;
use crate::media::MediaUploader;
use crate::models::AccountProjection;
use crate::registration::Registrar;
use crate::session::SessionManager;
use crate::store::CredentialStore;
use crate::tokens::TokenIssuer;

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Account service shared by all handlers
pub struct AccountService {
    store: Arc<dyn CredentialStore>,
    tokens: Arc<TokenIssuer>,
    sessions: SessionManager,
    registrar: Registrar,
    upload_temp_dir: PathBuf,
}

impl AccountService {
    /// Create a new account service
    pub fn new(
        config: &AccountsConfig,
        store: Arc<dyn CredentialStore>,
        uploader: Arc<dyn MediaUploader>,
    ) -> Self {
        let tokens = Arc::new(TokenIssuer::new(config));

        Self {
            sessions: SessionManager::new(store.clone(), tokens.clone()),
            registrar: Registrar::new(store.clone(), uploader),
            store,
            tokens,
            upload_temp_dir: config.upload_temp_dir.clone(),
        }
    }

    pub fn store(&self) -> &dyn CredentialStore {
        self.store.as_ref()
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn registrar(&self) -> &Registrar {
        &self.registrar
    }

    /// Directory multipart uploads are staged in
    pub fn upload_temp_dir(&self) -> &Path {
        &self.upload_temp_dir
    }

    /// Resolve an access token to the account it was issued for
    ///
    /// Bad signatures, expiry and deleted accounts are all `Unauthorized`.
    pub async fn authorize(&self, access_token: &str) -> Result<AccountProjection, AccountError> {
        let claims = self
            .tokens
            .verify_access(access_token)
            .map_err(|_| AccountError::Unauthorized)?;

        let account = self
            .store
            .find_by_id(claims.sub)
            .await?
            .ok_or(AccountError::Unauthorized)?;

        Ok(AccountProjection::from(account))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::DiskMediaUploader;
    use crate::models::{AccessTokenClaims, NewAccount};
    use crate::store::MemoryCredentialStore;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use tokio_test::{assert_err, assert_ok};
    use uuid::Uuid;

    const ACCESS_SECRET: &str = "access-secret-access-secret-0123";

    fn config() -> AccountsConfig {
        AccountsConfig {
            access_token_secret: ACCESS_SECRET.to_string(),
            access_token_expiry: 900,
            refresh_token_secret: "refresh-secret-refresh-secret-01".to_string(),
            refresh_token_expiry: 864000,
            database_url: None,
            media_root: PathBuf::from("./public/media"),
            media_base_url: "/media".to_string(),
            upload_temp_dir: PathBuf::from("./public/temp"),
            cors_origin: None,
            bind_addr: "127.0.0.1:0".to_string(),
        }
    }

    async fn service_with_ann() -> (AccountService, crate::models::Account) {
        let config = config();
        let store = Arc::new(MemoryCredentialStore::new());
        let ann = store
            .create(NewAccount {
                username: "ann".into(),
                email: "ann@x.com".into(),
                full_name: "Ann Example".into(),
                avatar: "/media/ann.png".into(),
                cover_image: String::new(),
                password: "secret1".into(),
            })
            .await
            .unwrap();
        let uploader = Arc::new(DiskMediaUploader::new(&config.media_root, "/media"));
        (AccountService::new(&config, store, uploader), ann)
    }

    #[tokio::test]
    async fn test_authorize_valid_token() {
        let (service, ann) = service_with_ann().await;
        let token = service.tokens().issue_access(&ann).unwrap();

        let account = assert_ok!(service.authorize(&token).await);
        assert_eq!(account.id, ann.id);
        assert_eq!(account.username, "ann");
    }

    #[tokio::test]
    async fn test_authorize_expired_token() {
        let (service, ann) = service_with_ann().await;
        let now = Utc::now().timestamp();
        let claims = AccessTokenClaims {
            sub: ann.id,
            username: ann.username.clone(),
            email: ann.email.clone(),
            full_name: ann.full_name.clone(),
            iat: now - 1000,
            exp: now - 100,
            jti: Uuid::new_v4(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(ACCESS_SECRET.as_bytes()),
        )
        .unwrap();

        let err = assert_err!(service.authorize(&token).await);
        assert!(matches!(err, AccountError::Unauthorized));
    }

    #[tokio::test]
    async fn test_authorize_tampered_token() {
        let (service, ann) = service_with_ann().await;
        let token = service.tokens().issue_access(&ann).unwrap();

        // swap the signature for one made with another key
        let forged = encode(
            &Header::default(),
            &service.tokens().verify_access(&token).unwrap(),
            &EncodingKey::from_secret(b"some-other-secret-some-other-sec"),
        )
        .unwrap();

        let err = assert_err!(service.authorize(&forged).await);
        assert!(matches!(err, AccountError::Unauthorized));

        let err = assert_err!(service.authorize(&format!("{token}x")).await);
        assert!(matches!(err, AccountError::Unauthorized));
    }

    #[tokio::test]
    async fn test_authorize_deleted_account() {
        let (service, mut ghost) = service_with_ann().await;
        ghost.id = Uuid::new_v4();
        let token = service.tokens().issue_access(&ghost).unwrap();

        let err = assert_err!(service.authorize(&token).await);
        assert!(matches!(err, AccountError::Unauthorized));
    }
}

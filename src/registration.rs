//! Account Registration

use crate::error::AccountError;
use crate::media::MediaUploader;
use crate::models::{AccountProjection, Identifier, NewAccount};
use crate::store::CredentialStore;

use std::path::PathBuf;
use std::sync::Arc;
use validator::ValidateEmail;

/// Registration input with staged avatar/cover image files
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
    pub avatar: Option<PathBuf>,
    pub cover_image: Option<PathBuf>,
}

impl Registration {
    /// Names of required fields that are blank
    pub fn missing_fields(&self) -> Vec<String> {
        [
            ("username", &self.username),
            ("email", &self.email),
            ("fullName", &self.full_name),
            ("password", &self.password),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name.to_string())
        .collect()
    }
}

pub struct Registrar {
    store: Arc<dyn CredentialStore>,
    uploader: Arc<dyn MediaUploader>,
}

impl Registrar {
    pub fn new(store: Arc<dyn CredentialStore>, uploader: Arc<dyn MediaUploader>) -> Self {
        Self { store, uploader }
    }

    /// Register a new account and return its public projection
    pub async fn register(&self, req: Registration) -> Result<AccountProjection, AccountError> {
        let missing = req.missing_fields();
        if !missing.is_empty() {
            return Err(AccountError::validation(
                format!("All fields are required: {}", missing.join(", ")),
                missing,
            ));
        }

        if !req.email.trim().validate_email() {
            return Err(AccountError::validation(
                "Invalid email format",
                vec!["email".to_string()],
            ));
        }

        let identifier = Identifier::new(Some(&req.username), Some(&req.email));
        if self.store.find_by_identifier(&identifier).await?.is_some() {
            return Err(AccountError::Conflict);
        }

        let avatar_path = req.avatar.as_deref().ok_or_else(|| {
            AccountError::validation("Avatar is required", vec!["avatar".to_string()])
        })?;

        let avatar = self
            .uploader
            .upload(avatar_path)
            .await
            .ok_or_else(|| AccountError::Upload("avatar image".to_string()))?;

        let cover_image = match req.cover_image.as_deref() {
            Some(path) => self.uploader.upload(path).await,
            None => None,
        };

        let created = self
            .store
            .create(NewAccount {
                username: req.username,
                email: req.email,
                full_name: req.full_name,
                avatar: avatar.url.clone(),
                cover_image: cover_image
                    .as_ref()
                    .map(|media| media.url.clone())
                    .unwrap_or_default(),
                password: req.password,
            })
            .await;

        // A concurrent registration can win the insert; withdraw our media
        let created = match created {
            Ok(created) => created,
            Err(e) => {
                self.uploader.remove(&avatar).await;
                if let Some(cover) = &cover_image {
                    self.uploader.remove(cover).await;
                }
                return Err(e);
            }
        };

        // Re-read so the response is built from the stored record alone
        let account = self
            .store
            .find_by_id(created.id)
            .await?
            .ok_or_else(|| AccountError::Internal("User registration failed".to_string()))?;

        tracing::info!(account_id = %account.id, "User registered");
        Ok(AccountProjection::from(account))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::UploadedMedia;
    use crate::store::MemoryCredentialStore;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;

    /// Uploader recording calls; fails for paths containing "fail"
    #[derive(Default)]
    struct RecordingUploader {
        calls: Mutex<Vec<PathBuf>>,
        removed: Mutex<Vec<String>>,
        /// Account inserted behind the registrar's back on first upload
        racer: Mutex<Option<(Arc<MemoryCredentialStore>, NewAccount)>>,
    }

    #[async_trait]
    impl MediaUploader for RecordingUploader {
        async fn upload(&self, local_path: &Path) -> Option<UploadedMedia> {
            self.calls.lock().unwrap().push(local_path.to_path_buf());
            let racer = self.racer.lock().unwrap().take();
            if let Some((store, account)) = racer {
                store.create(account).await.unwrap();
            }
            if local_path.to_string_lossy().contains("fail") {
                return None;
            }
            Some(UploadedMedia {
                url: format!("https://cdn.test/{}", local_path.display()),
            })
        }

        async fn remove(&self, media: &UploadedMedia) {
            self.removed.lock().unwrap().push(media.url.clone());
        }
    }

    fn registrar() -> (Registrar, Arc<MemoryCredentialStore>, Arc<RecordingUploader>) {
        let store = Arc::new(MemoryCredentialStore::new());
        let uploader = Arc::new(RecordingUploader::default());
        (
            Registrar::new(store.clone(), uploader.clone()),
            store,
            uploader,
        )
    }

    fn ann() -> Registration {
        Registration {
            username: "Ann".into(),
            email: "ann@x.com".into(),
            full_name: "Ann Example".into(),
            password: "secret1".into(),
            avatar: Some(PathBuf::from("avatar.png")),
            cover_image: None,
        }
    }

    #[tokio::test]
    async fn test_register_success() {
        let (registrar, store, _) = registrar();
        let account = registrar.register(ann()).await.unwrap();

        assert_eq!(account.username, "ann");
        assert_eq!(account.avatar, "https://cdn.test/avatar.png");
        assert_eq!(account.cover_image, "");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_all_blank_fields_are_listed() {
        let (registrar, store, uploader) = registrar();
        let err = registrar
            .register(Registration {
                username: " ".into(),
                avatar: Some(PathBuf::from("avatar.png")),
                ..Default::default()
            })
            .await
            .unwrap_err();

        match err {
            AccountError::Validation { fields, .. } => {
                assert_eq!(fields, vec!["username", "email", "fullName", "password"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(store.is_empty().await);
        assert!(uploader.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_email() {
        let (registrar, _, _) = registrar();
        let err = registrar
            .register(Registration {
                email: "not-an-email".into(),
                ..ann()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let (registrar, store, _) = registrar();
        registrar.register(ann()).await.unwrap();

        let err = registrar
            .register(Registration {
                username: "someone".into(),
                email: "ANN@x.com".into(),
                ..ann()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::Conflict));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_missing_avatar_creates_nothing() {
        let (registrar, store, uploader) = registrar();
        let err = registrar
            .register(Registration {
                avatar: None,
                ..ann()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AccountError::Validation { .. }));
        assert!(store.is_empty().await);
        assert!(uploader.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_avatar_upload_is_internal_error() {
        let (registrar, store, _) = registrar();
        let err = registrar
            .register(Registration {
                avatar: Some(PathBuf::from("fail.png")),
                ..ann()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AccountError::Upload(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_failed_cover_upload_is_ignored() {
        let (registrar, _, uploader) = registrar();
        let account = registrar
            .register(Registration {
                cover_image: Some(PathBuf::from("fail-cover.png")),
                ..ann()
            })
            .await
            .unwrap();

        assert_eq!(account.cover_image, "");
        assert_eq!(uploader.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_lost_insert_race_withdraws_media() {
        let (registrar, store, uploader) = registrar();
        *uploader.racer.lock().unwrap() = Some((
            store.clone(),
            NewAccount {
                username: "ann".into(),
                email: "other@x.com".into(),
                full_name: "Other Ann".into(),
                avatar: String::new(),
                cover_image: String::new(),
                password: "secret2".into(),
            },
        ));

        let err = registrar
            .register(Registration {
                cover_image: Some(PathBuf::from("cover.png")),
                ..ann()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AccountError::Conflict));
        assert_eq!(store.len().await, 1);
        assert_eq!(
            *uploader.removed.lock().unwrap(),
            vec![
                "https://cdn.test/avatar.png".to_string(),
                "https://cdn.test/cover.png".to_string(),
            ]
        );
    }
}

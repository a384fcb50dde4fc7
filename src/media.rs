//! Media Uploads
//!
//! Multipart files are first staged on local disk, then handed to a
//! [`MediaUploader`] which publishes them and returns a public URL. The
//! uploader owns the staged file: it is removed whether or not the upload
//! succeeds.

use crate::error::AccountError;

use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A published media file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedMedia {
    pub url: String,
}

/// Publishes a staged local file
#[async_trait]
pub trait MediaUploader: Send + Sync {
    /// Upload the file at `local_path`; `None` means the upload failed
    ///
    /// Implementations must remove `local_path` on success and on failure.
    async fn upload(&self, local_path: &Path) -> Option<UploadedMedia>;

    /// Withdraw previously published media; failures are logged, not returned
    async fn remove(&self, media: &UploadedMedia);
}

/// Uploader that moves staged files into a directory served under a URL prefix
#[derive(Debug, Clone)]
pub struct DiskMediaUploader {
    root: PathBuf,
    base_url: String,
}

impl DiskMediaUploader {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn publish(&self, local_path: &Path) -> std::io::Result<UploadedMedia> {
        tokio::fs::create_dir_all(&self.root).await?;

        let name = stored_name(local_path);
        let target = self.root.join(&name);

        // rename fails across filesystems; fall back to copying
        if tokio::fs::rename(local_path, &target).await.is_err() {
            tokio::fs::copy(local_path, &target).await?;
        }

        Ok(UploadedMedia {
            url: format!("{}/{}", self.base_url, name),
        })
    }
}

#[async_trait]
impl MediaUploader for DiskMediaUploader {
    async fn upload(&self, local_path: &Path) -> Option<UploadedMedia> {
        let result = self.publish(local_path).await;
        discard(local_path).await;

        match result {
            Ok(media) => {
                tracing::info!(url = %media.url, "File uploaded successfully");
                Some(media)
            }
            Err(e) => {
                tracing::error!(path = %local_path.display(), "Upload failed: {:?}", e);
                None
            }
        }
    }

    async fn remove(&self, media: &UploadedMedia) {
        let name = media
            .url
            .strip_prefix(self.base_url.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|name| !name.is_empty() && !name.contains('/') && !name.contains(".."));

        match name {
            Some(name) => discard(&self.root.join(name)).await,
            None => tracing::warn!(url = %media.url, "Not a media URL this uploader published"),
        }
    }
}

/// Random file name keeping the original extension
fn stored_name(path: &Path) -> String {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if !ext.is_empty() => format!("{}.{}", Uuid::new_v4(), ext.to_lowercase()),
        _ => Uuid::new_v4().to_string(),
    }
}

/// Write an uploaded file into the staging directory
pub async fn stage(
    dir: &Path,
    original_name: Option<&str>,
    data: &[u8],
) -> Result<PathBuf, AccountError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| AccountError::Internal(format!("Cannot create upload directory: {e}")))?;

    let path = dir.join(stored_name(Path::new(original_name.unwrap_or_default())));
    tokio::fs::write(&path, data)
        .await
        .map_err(|e| AccountError::Internal(format!("Cannot stage upload: {e}")))?;

    Ok(path)
}

/// Remove a staged file, ignoring files that are already gone
pub async fn discard(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), "Failed to remove staged file: {:?}", e),
    }
}

//! # Local media store
//!
//! Filesystem implementation of `MediaStore`.
//! Files live under a sharded directory layout (`ab/cd/<handle>`) and are
//! served by the web layer under `url_prefix`.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use domains::{DomainError, Image, MediaHandle, MediaStore, MediaUpload, Result};
use tokio::fs;
use tracing::warn;
use uuid::Uuid;

use super::extension_of;

pub struct LocalMediaStore {
    /// Root directory for all uploads (e.g., "./data/uploads")
    root_path: PathBuf,
    /// Public URL prefix (e.g., "/uploads")
    url_prefix: String,
}

impl LocalMediaStore {
    pub fn new(root: PathBuf, url_prefix: impl Into<String>) -> Self {
        let url_prefix = url_prefix.into().trim_end_matches('/').to_owned();
        Self {
            root_path: root,
            url_prefix,
        }
    }

    /// Generates a sharded relative path: "ab/cd/abcd…"
    fn relative_path(handle: &str) -> Option<String> {
        let valid = handle.len() > 4
            && handle
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.')
            && !handle.contains("..");
        valid.then(|| format!("{}/{}/{}", &handle[0..2], &handle[2..4], handle))
    }
}

fn io_error(err: std::io::Error) -> DomainError {
    DomainError::MediaStore(err.to_string())
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn upload(&self, upload: MediaUpload) -> Result<Image> {
        // 1. Random handle, keeping the original extension
        let mut handle = Uuid::new_v4().simple().to_string();
        if let Some(ext) = extension_of(&upload.file_name) {
            handle = format!("{handle}.{ext}");
        }
        let relative = Self::relative_path(&handle)
            .ok_or_else(|| DomainError::Internal(format!("unusable media handle {handle}")))?;
        let target_path = self.root_path.join(&relative);

        // 2. Ensure directory exists
        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent).await.map_err(io_error)?;
        }

        // 3. Save
        fs::write(&target_path, &upload.bytes).await.map_err(io_error)?;

        Ok(Image {
            url: format!("{}/{}", self.url_prefix, relative),
            handle: MediaHandle::new(handle),
        })
    }

    async fn delete(&self, handle: &MediaHandle) -> Result<()> {
        let Some(relative) = Self::relative_path(handle.as_str()) else {
            warn!(%handle, "ignoring handle not issued by the local store");
            return Ok(());
        };

        match fs::remove_file(self.root_path.join(relative)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_error(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("yelpcamp-media-{}", Uuid::new_v4().simple()))
    }

    fn upload() -> MediaUpload {
        MediaUpload {
            file_name: "site.jpg".into(),
            content_type: mime::IMAGE_JPEG,
            bytes: Bytes::from_static(&[0xFF, 0xD8, 0xFF, 0xE0]),
        }
    }

    #[tokio::test]
    async fn upload_writes_sharded_file_and_delete_removes_it() {
        let root = scratch_dir();
        let store = LocalMediaStore::new(root.clone(), "/uploads/");

        let image = store.upload(upload()).await.unwrap();
        let handle = image.handle.as_str().to_owned();
        let path = root.join(&handle[0..2]).join(&handle[2..4]).join(&handle);

        assert!(image.url.starts_with("/uploads/"));
        assert!(image.url.ends_with(".jpg"));
        assert_eq!(fs::read(&path).await.unwrap(), vec![0xFF, 0xD8, 0xFF, 0xE0]);

        store.delete(&image.handle).await.unwrap();
        assert!(!path.exists());

        let _ = fs::remove_dir_all(root).await;
    }

    #[tokio::test]
    async fn deleting_twice_is_not_an_error() {
        let root = scratch_dir();
        let store = LocalMediaStore::new(root.clone(), "/uploads");
        let image = store.upload(upload()).await.unwrap();

        store.delete(&image.handle).await.unwrap();
        store.delete(&image.handle).await.unwrap();

        let _ = fs::remove_dir_all(root).await;
    }

    #[tokio::test]
    async fn foreign_handles_never_escape_the_root() {
        let store = LocalMediaStore::new(scratch_dir(), "/uploads");
        store
            .delete(&MediaHandle::new("../../etc/passwd"))
            .await
            .unwrap();
        assert!(LocalMediaStore::relative_path("../../etc/passwd").is_none());
    }
}

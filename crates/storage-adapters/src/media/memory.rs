//! In-process media store.

use async_trait::async_trait;
use dashmap::DashMap;
use domains::{Image, MediaHandle, MediaStore, MediaUpload, Result};
use uuid::Uuid;

use super::extension_of;

/// Keeps uploads in a map; URLs use the `memory://` scheme.
#[derive(Debug, Default)]
pub struct MemoryMediaStore {
    objects: DashMap<MediaHandle, MediaUpload>,
}

impl MemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, handle: &MediaHandle) -> bool {
        self.objects.contains_key(handle)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl MediaStore for MemoryMediaStore {
    async fn upload(&self, upload: MediaUpload) -> Result<Image> {
        let mut handle = Uuid::new_v4().simple().to_string();
        if let Some(ext) = extension_of(&upload.file_name) {
            handle = format!("{handle}.{ext}");
        }
        let handle = MediaHandle::new(handle);
        let url = format!("memory://{handle}");

        self.objects.insert(handle.clone(), upload);
        Ok(Image { url, handle })
    }

    async fn delete(&self, handle: &MediaHandle) -> Result<()> {
        self.objects.remove(handle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn upload() -> MediaUpload {
        MediaUpload {
            file_name: "Tent.PNG".into(),
            content_type: mime::IMAGE_PNG,
            bytes: Bytes::from_static(b"\x89PNG"),
        }
    }

    #[tokio::test]
    async fn upload_then_delete() {
        let store = MemoryMediaStore::new();
        let image = store.upload(upload()).await.unwrap();

        assert!(image.handle.as_str().ends_with(".png"));
        assert!(store.contains(&image.handle));

        store.delete(&image.handle).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn deleting_unknown_handle_is_fine() {
        let store = MemoryMediaStore::new();
        store.delete(&MediaHandle::new("never-uploaded")).await.unwrap();
    }
}

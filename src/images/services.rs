use anyhow::Context;
use bytes::Bytes;
use uuid::Uuid;

use crate::storage::StorageClient;

pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
}

/// Stores an avatar under `avatars/<user>/<uuid>.<ext>` and returns its public URL.
/// Callers check the content type with [`ext_from_mime`] first.
pub async fn upload_avatar(
    storage: &dyn StorageClient,
    user_id: i64,
    image: UploadItem,
) -> anyhow::Result<String> {
    anyhow::ensure!(!image.body.is_empty(), "empty image");
    let ext = ext_from_mime(&image.content_type).unwrap_or("bin");
    let key = format!("avatars/{}/{}.{}", user_id, Uuid::new_v4(), ext);
    storage
        .put_object(&key, image.body, &image.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    Ok(storage.object_url(&key))
}

pub fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

#[cfg(test)]
mod image_tests {
    use super::*;
    use crate::testing::FakeStorage;

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("image/gif"), Some("gif"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
        assert_eq!(ext_from_mime("text/html"), None);
    }

    #[tokio::test]
    async fn upload_avatar_puts_object_and_returns_url() {
        let storage = FakeStorage::default();
        let url = upload_avatar(
            &storage,
            7,
            UploadItem {
                body: Bytes::from_static(b"\x89PNG"),
                content_type: "image/png".into(),
            },
        )
        .await
        .unwrap();

        assert!(url.starts_with("https://fake.local/avatars/7/"));
        assert!(url.ends_with(".png"));
        let keys = storage.keys();
        assert_eq!(keys.len(), 1);
        assert!(url.ends_with(&keys[0]));
    }

    #[tokio::test]
    async fn upload_avatar_rejects_empty_body() {
        let storage = FakeStorage::default();
        let err = upload_avatar(
            &storage,
            1,
            UploadItem {
                body: Bytes::new(),
                content_type: "image/png".into(),
            },
        )
        .await;
        assert!(err.is_err());
        assert!(storage.keys().is_empty());
    }
}

use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use bytes::Bytes;

use crate::config::StorageConfig;

/// Image host. Objects are publicly readable under [`object_url`](Self::object_url).
#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()>;
    async fn delete_object(&self, key: &str) -> anyhow::Result<()>;
    fn object_url(&self, key: &str) -> String;

    /// Inverse of `object_url`; `None` for URLs hosted elsewhere.
    fn key_for_url(&self, url: &str) -> Option<String> {
        let base = self.object_url("");
        url.strip_prefix(base.as_str())
            .filter(|k| !k.is_empty())
            .map(str::to_string)
    }
}

#[derive(Clone)]
pub struct Storage {
    client: Client,
    bucket: String,
    public_url: String,
}

impl Storage {
    pub async fn new(cfg: &StorageConfig) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(Credentials::new(
                &cfg.access_key,
                &cfg.secret_key,
                None,
                None,
                "static",
            ))
            .endpoint_url(&cfg.endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(&cfg.endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            bucket: cfg.bucket.clone(),
            public_url: cfg.public_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl StorageClient for Storage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .context("s3 put_object")?;
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .context("s3 delete_object")?;
        Ok(())
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_url, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    #[async_trait]
    impl StorageClient for Fixed {
        async fn put_object(&self, _k: &str, _b: Bytes, _ct: &str) -> anyhow::Result<()> {
            Ok(())
        }
        async fn delete_object(&self, _k: &str) -> anyhow::Result<()> {
            Ok(())
        }
        fn object_url(&self, key: &str) -> String {
            format!("https://cdn.example.com/avatars/{}", key)
        }
    }

    #[test]
    fn key_for_url_strips_public_base() {
        let url = Fixed.object_url("avatars/7/abc.png");
        assert_eq!(Fixed.key_for_url(&url).as_deref(), Some("avatars/7/abc.png"));
    }

    #[test]
    fn key_for_url_ignores_foreign_urls() {
        assert_eq!(Fixed.key_for_url("https://elsewhere.example.com/a.png"), None);
        assert_eq!(Fixed.key_for_url("https://cdn.example.com/avatars/"), None);
    }
}

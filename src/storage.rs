use async_trait::async_trait;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::{MontageError, Result};

/// A stored object: bucket key plus the public-facing URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedObject {
    pub key: String,
    pub url: String,
}

/// Boundary to the object store. Transforms only ever see this trait;
/// upload failures never invalidate an already-produced local artifact.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageUploader: Send + Sync {
    /// Upload a finished local file. `filename` supplies the extension for
    /// the generated object key; `key_prefix` nests the object within the
    /// bucket.
    async fn upload(
        &self,
        local_path: &Path,
        filename: &str,
        key_prefix: &str,
    ) -> Result<UploadedObject>;
}

/// HTTP PUT uploader against an S3-compatible or pre-signed-style endpoint.
pub struct HttpStorageUploader {
    config: StorageConfig,
    client: reqwest::Client,
}

impl HttpStorageUploader {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn build_object_key(&self, filename: &str, key_prefix: &str) -> String {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
            .unwrap_or_else(|| ".bin".to_string());

        let prefix: Vec<&str> = [self.config.key_prefix.as_str(), key_prefix]
            .iter()
            .map(|p| p.trim_matches('/'))
            .filter(|p| !p.is_empty())
            .collect();

        let name = format!("{}{}", Uuid::new_v4().simple(), ext);
        if prefix.is_empty() {
            name
        } else {
            format!("{}/{}", prefix.join("/"), name)
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!(
            "{}/{}",
            self.config.public_base_url.trim_end_matches('/'),
            key
        )
    }
}

#[async_trait]
impl StorageUploader for HttpStorageUploader {
    async fn upload(
        &self,
        local_path: &Path,
        filename: &str,
        key_prefix: &str,
    ) -> Result<UploadedObject> {
        if !self.config.is_configured() {
            return Err(MontageError::Storage(
                "Object storage is not configured".to_string(),
            ));
        }

        let key = self.build_object_key(filename, key_prefix);
        let target = format!(
            "{}/{}/{}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.bucket,
            key
        );

        let body = tokio::fs::read(local_path).await.map_err(|e| {
            MontageError::Storage(format!("Cannot read {}: {}", local_path.display(), e))
        })?;

        let mut request = self.client.put(&target).body(body);
        if !self.config.api_token.is_empty() {
            request = request.bearer_auth(&self.config.api_token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| MontageError::Storage(format!("Upload to {} failed: {}", target, e)))?;

        if !response.status().is_success() {
            return Err(MontageError::Storage(format!(
                "Upload to {} returned status {}",
                target,
                response.status()
            )));
        }

        let url = self.public_url(&key);
        info!("Uploaded {} as {}", local_path.display(), key);
        Ok(UploadedObject { key, url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uploader(key_prefix: &str) -> HttpStorageUploader {
        HttpStorageUploader::new(StorageConfig {
            endpoint: "https://store.example".to_string(),
            bucket: "media".to_string(),
            public_base_url: "https://cdn.example".to_string(),
            api_token: String::new(),
            key_prefix: key_prefix.to_string(),
        })
    }

    #[test]
    fn test_object_key_prefixes_and_extension() {
        let key = uploader("outputs").build_object_key("clip.MP4", "jobs/42/");
        assert!(key.starts_with("outputs/jobs/42/"));
        assert!(key.ends_with(".mp4"));

        let bare = uploader("").build_object_key("noext", "");
        assert!(bare.ends_with(".bin"));
        assert!(!bare.contains('/'));
    }

    #[test]
    fn test_public_url() {
        let uploader = uploader("");
        assert_eq!(
            uploader.public_url("outputs/a.mp4"),
            "https://cdn.example/outputs/a.mp4"
        );
    }

    #[tokio::test]
    async fn test_unconfigured_storage_is_storage_error() {
        let uploader = HttpStorageUploader::new(StorageConfig {
            endpoint: String::new(),
            bucket: String::new(),
            public_base_url: String::new(),
            api_token: String::new(),
            key_prefix: String::new(),
        });
        let result = uploader
            .upload(Path::new("/tmp/x.mp4"), "x.mp4", "")
            .await;
        assert!(matches!(result, Err(MontageError::Storage(_))));
    }
}

//! Object storage for uploaded audio.
//!
//! Beats and recordings are stored outside the database; rows only keep the
//! storage key and public URL. Supports the local filesystem and, with the
//! `s3` feature, S3-compatible object storage.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;

use crate::{AppError, AppResult};

/// Storage backend selection.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Files under a local directory, served by something in front of it.
    Local {
        /// Directory that holds the files.
        base_path: PathBuf,
        /// URL under which `base_path` is served.
        base_url: String,
    },
    /// S3-compatible object storage.
    S3(S3Config),
}

/// Connection settings for an S3-compatible bucket.
#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    /// Endpoint URL (AWS or `MinIO`).
    pub endpoint: String,
    /// Bucket name.
    pub bucket: String,
    /// Region, e.g. `us-east-1`.
    pub region: String,
    /// Access key ID.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
    /// Public URL prefix; defaults to the bucket's virtual-host URL.
    #[serde(default)]
    pub public_url: Option<String>,
    /// Key prefix inside the bucket.
    #[serde(default)]
    pub prefix: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Local {
            base_path: PathBuf::from("./files"),
            base_url: "http://localhost:8080".to_string(),
        }
    }
}

/// Metadata of a stored file.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Key the caller stored the file under.
    pub key: String,
    /// Public URL of the file.
    pub url: String,
    /// Size in bytes.
    pub size: u64,
    /// MIME content type.
    pub content_type: String,
    /// Hex MD5 of the contents.
    pub md5: String,
}

impl UploadedFile {
    fn new(key: &str, url: String, data: &[u8], content_type: &str) -> Self {
        Self {
            key: key.to_string(),
            url,
            size: data.len() as u64,
            content_type: content_type.to_string(),
            md5: format!("{:x}", md5::compute(data)),
        }
    }
}

/// Storage backend trait.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Upload a file.
    async fn upload(&self, key: &str, data: &[u8], content_type: &str)
    -> AppResult<UploadedFile>;

    /// Delete a file. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Get the public URL for a key.
    fn public_url(&self, key: &str) -> String;

    /// Check if a file exists.
    async fn exists(&self, key: &str) -> AppResult<bool>;
}

/// Shared handle to the configured storage backend.
pub type SharedStorage = Arc<dyn StorageBackend>;

/// Build the backend described by `config`.
pub async fn connect(config: &StorageConfig) -> AppResult<SharedStorage> {
    match config {
        StorageConfig::Local {
            base_path,
            base_url,
        } => Ok(Arc::new(LocalStorage::new(
            base_path.clone(),
            base_url.clone(),
        ))),
        #[cfg(feature = "s3")]
        StorageConfig::S3(s3) => Ok(Arc::new(S3Storage::new(s3))),
        #[cfg(not(feature = "s3"))]
        StorageConfig::S3(_) => Err(AppError::Config(
            "S3 storage requires the `s3` feature".to_string(),
        )),
    }
}

/// Maps caller keys to backend object keys and public URLs.
#[derive(Debug, Clone)]
struct KeyLayout {
    prefix: Option<String>,
    public_base: String,
}

impl KeyLayout {
    fn new(prefix: Option<&str>, public_base: &str) -> Self {
        Self {
            prefix: prefix
                .map(|p| p.trim_matches('/'))
                .filter(|p| !p.is_empty())
                .map(str::to_string),
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }

    fn object_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}/{key}"),
            None => key.to_string(),
        }
    }

    fn url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base, self.object_key(key))
    }
}

/// Local filesystem storage backend.
pub struct LocalStorage {
    base_path: PathBuf,
    layout: KeyLayout,
}

impl LocalStorage {
    /// Store files under `base_path`, published at `base_url`.
    #[must_use]
    pub fn new(base_path: PathBuf, base_url: String) -> Self {
        Self {
            base_path,
            layout: KeyLayout::new(None, &base_url),
        }
    }
}

#[async_trait::async_trait]
impl StorageBackend for LocalStorage {
    async fn upload(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> AppResult<UploadedFile> {
        let path = self.base_path.join(key);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create directory: {e}")))?;
        }

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write {key}: {e}")))?;

        Ok(UploadedFile::new(key, self.public_url(key), data, content_type))
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        match tokio::fs::remove_file(self.base_path.join(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(format!("Failed to delete {key}: {e}"))),
        }
    }

    fn public_url(&self, key: &str) -> String {
        self.layout.url(key)
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        tokio::fs::try_exists(self.base_path.join(key))
            .await
            .map_err(|e| AppError::Storage(format!("Failed to stat {key}: {e}")))
    }
}

/// S3-compatible object storage backend.
#[cfg(feature = "s3")]
pub struct S3Storage {
    client: aws_sdk_s3::Client,
    bucket: String,
    layout: KeyLayout,
}

#[cfg(feature = "s3")]
impl S3Storage {
    /// Build a client for the configured bucket. No request is made here.
    #[must_use]
    pub fn new(config: &S3Config) -> Self {
        use aws_config::Region;
        use aws_sdk_s3::config::Credentials;

        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "rapshare",
        );

        let sdk_config = aws_sdk_s3::Config::builder()
            .endpoint_url(&config.endpoint)
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        let default_base = format!("https://{}.s3.amazonaws.com", config.bucket);
        let public_base = config.public_url.as_deref().unwrap_or(&default_base);

        Self {
            client: aws_sdk_s3::Client::from_conf(sdk_config),
            bucket: config.bucket.clone(),
            layout: KeyLayout::new(config.prefix.as_deref(), public_base),
        }
    }
}

#[cfg(feature = "s3")]
#[async_trait::async_trait]
impl StorageBackend for S3Storage {
    async fn upload(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> AppResult<UploadedFile> {
        use aws_sdk_s3::primitives::ByteStream;

        let uploaded = UploadedFile::new(key, self.public_url(key), data, content_type);

        let output = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(self.layout.object_key(key))
            .body(ByteStream::from(data.to_vec()))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("S3 upload of {key} failed: {e}")))?;

        // Single-part uploads without KMS get the content MD5 as ETag.
        if let Some(etag) = output.e_tag()
            && etag.trim_matches('"') != uploaded.md5
        {
            tracing::warn!(
                key = %key,
                etag = %etag,
                md5 = %uploaded.md5,
                "S3 ETag differs from content MD5"
            );
        }

        Ok(uploaded)
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(self.layout.object_key(key))
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("S3 delete of {key} failed: {e}")))?;
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        self.layout.url(key)
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        use aws_sdk_s3::operation::head_object::HeadObjectError;

        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(self.layout.object_key(key))
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(HeadObjectError::is_not_found) => Ok(false),
            Err(e) => Err(AppError::Storage(format!("S3 head of {key} failed: {e}"))),
        }
    }
}

/// Generate a unique storage key for an uploaded audio file.
///
/// Keys look like `beats/2026/10/18/<user>/<millis>_<uuid>.mp3`.
#[must_use]
pub fn generate_storage_key(folder: &str, user_id: &str, original_name: &str) -> String {
    use chrono::Utc;

    let now = Utc::now();
    let date_path = now.format("%Y/%m/%d").to_string();
    let timestamp = now.timestamp_millis();

    let extension = original_name
        .rfind('.')
        .filter(|&pos| pos > 0 && pos < original_name.len() - 1)
        .map(|pos| &original_name[pos + 1..])
        .filter(|ext| ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("bin");

    format!(
        "{folder}/{date_path}/{user_id}/{timestamp}_{}.{}",
        uuid::Uuid::new_v4(),
        extension.to_ascii_lowercase()
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_storage_key() {
        let key = generate_storage_key("beats", "user123", "Night Drive.MP3");
        assert!(key.starts_with("beats/"));
        assert!(key.contains("/user123/"));
        assert!(key.ends_with(".mp3"));
    }

    #[test]
    fn test_generate_storage_key_no_extension() {
        let key = generate_storage_key("recordings", "user123", "take1");
        assert!(key.ends_with(".bin"));
    }

    #[test]
    fn test_generate_storage_key_rejects_odd_extension() {
        let key = generate_storage_key("recordings", "user123", "take1.m/a");
        assert!(key.ends_with(".bin"));
    }

    #[test]
    fn test_key_layout_prefix_and_url() {
        let layout = KeyLayout::new(Some("/audio/"), "https://cdn.example/");
        assert_eq!(layout.object_key("beats/a.mp3"), "audio/beats/a.mp3");
        assert_eq!(layout.url("beats/a.mp3"), "https://cdn.example/audio/beats/a.mp3");

        let bare = KeyLayout::new(Some(""), "http://localhost:8080");
        assert_eq!(bare.object_key("beats/a.mp3"), "beats/a.mp3");
    }

    #[tokio::test]
    async fn test_local_storage_roundtrip() {
        let dir = std::env::temp_dir().join(format!("rapshare-test-{}", uuid::Uuid::new_v4()));
        let storage = LocalStorage::new(dir.clone(), "https://cdn.example/".to_string());

        let uploaded = storage
            .upload("beats/a/b.mp3", b"ID3 fake audio", "audio/mpeg")
            .await
            .unwrap();
        assert_eq!(uploaded.url, "https://cdn.example/beats/a/b.mp3");
        assert_eq!(uploaded.size, 14);
        assert_eq!(uploaded.md5, format!("{:x}", md5::compute(b"ID3 fake audio")));
        assert!(storage.exists("beats/a/b.mp3").await.unwrap());

        storage.delete("beats/a/b.mp3").await.unwrap();
        assert!(!storage.exists("beats/a/b.mp3").await.unwrap());

        // Deleting a missing key is fine.
        storage.delete("beats/a/b.mp3").await.unwrap();

        tokio::fs::remove_dir_all(&dir).await.ok();
    }
}

//! Object sources: S3/MinIO and the local filesystem
//!
//! Both implementations take complete references (`s3://bucket/key` or a
//! filesystem path) so that callers can switch between them per run without
//! rewriting references.

use crate::uri::S3Uri;
use crate::{StorageError, StorageResult};
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::{Credentials, Region},
    error::DisplayErrorContext,
    primitives::ByteStream,
    Client,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// S3/MinIO configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    /// AWS region (e.g., "us-west-2") or "us-east-1" for `MinIO`
    pub region: String,

    /// S3 endpoint (custom for `MinIO`, empty for AWS S3)
    pub endpoint: Option<String>,

    /// AWS access key ID; when unset the default credential chain is used
    pub access_key_id: Option<String>,

    /// AWS secret access key
    pub secret_access_key: Option<String>,

    /// AWS session token for temporary credentials
    pub session_token: Option<String>,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            region: std::env::var("AWS_REGION")
                .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
                .unwrap_or_else(|_| "us-east-1".to_string()),
            endpoint: std::env::var("AWS_ENDPOINT_URL").ok(),
            access_key_id: std::env::var("AWS_ACCESS_KEY_ID").ok(),
            secret_access_key: std::env::var("AWS_SECRET_ACCESS_KEY").ok(),
            session_token: std::env::var("AWS_SESSION_TOKEN").ok(),
        }
    }
}

impl S3Config {
    /// Static credentials, only when an access key is explicitly configured.
    #[must_use]
    pub fn static_credentials(&self) -> Option<Credentials> {
        let access_key_id = self
            .access_key_id
            .as_deref()
            .filter(|key| !key.is_empty())?;
        Some(Credentials::new(
            access_key_id,
            self.secret_access_key.as_deref().unwrap_or_default(),
            self.session_token.clone(),
            None,
            "gt-annotations-storage",
        ))
    }
}

/// Read/list/write access to annotation inputs and converted outputs
#[async_trait::async_trait]
pub trait ObjectSource: Send + Sync {
    /// Read an object as UTF-8 text
    async fn get_object_content(&self, reference: &str) -> StorageResult<String>;

    /// Check if an object exists
    async fn object_exists(&self, reference: &str) -> StorageResult<bool>;

    /// References of all objects under a folder prefix, sorted by key.
    /// Directory placeholders are excluded.
    async fn list_objects(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Write an object, replacing any existing content
    async fn put_object_content(&self, reference: &str, data: Vec<u8>) -> StorageResult<()>;
}

/// S3/MinIO object source
#[derive(Debug, Clone)]
pub struct S3ObjectSource {
    client: Client,
}

impl S3ObjectSource {
    /// Create a new S3 object source
    ///
    /// Configured keys are used as static credentials. Without them the
    /// standard AWS chain (environment, shared profiles, SSO, instance and
    /// container roles) supplies credentials.
    pub async fn new(config: S3Config) -> Self {
        let region = Region::new(config.region.clone());

        let mut s3_config_builder = match config.static_credentials() {
            Some(credentials) => aws_sdk_s3::Config::builder()
                .credentials_provider(credentials)
                .region(region)
                .behavior_version_latest(),
            None => {
                let shared = aws_config::defaults(BehaviorVersion::latest())
                    .region(region)
                    .load()
                    .await;
                aws_sdk_s3::config::Builder::from(&shared)
            }
        };

        // Set custom endpoint for MinIO
        if let Some(endpoint) = config.endpoint {
            s3_config_builder = s3_config_builder
                .endpoint_url(endpoint)
                .force_path_style(true); // Required for MinIO
        }

        Self {
            client: Client::from_conf(s3_config_builder.build()),
        }
    }

    /// Wrap an already configured client
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl ObjectSource for S3ObjectSource {
    async fn get_object_content(&self, reference: &str) -> StorageResult<String> {
        let uri = S3Uri::parse(reference)?;

        let response = self
            .client
            .get_object()
            .bucket(&uri.bucket)
            .key(&uri.key)
            .send()
            .await
            .map_err(|e| {
                let error = e.into_service_error();
                if error.is_no_such_key() {
                    StorageError::NotFound(reference.to_string())
                } else {
                    StorageError::S3Error(DisplayErrorContext(&error).to_string())
                }
            })?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::S3Error(e.to_string()))?
            .into_bytes();

        debug!(reference, bytes = bytes.len(), "Fetched object");
        String::from_utf8(bytes.to_vec()).map_err(|_| StorageError::InvalidUtf8(reference.to_string()))
    }

    async fn object_exists(&self, reference: &str) -> StorageResult<bool> {
        let uri = S3Uri::parse(reference)?;

        match self
            .client
            .head_object()
            .bucket(&uri.bucket)
            .key(&uri.key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let error = e.into_service_error();
                if error.is_not_found() {
                    Ok(false)
                } else {
                    Err(StorageError::S3Error(DisplayErrorContext(&error).to_string()))
                }
            }
        }
    }

    async fn list_objects(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let uri = S3Uri::parse(prefix)?;
        let key_prefix = uri.folder_prefix();

        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;
        loop {
            let response = self
                .client
                .list_objects_v2()
                .bucket(&uri.bucket)
                .prefix(&key_prefix)
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(|e| StorageError::S3Error(DisplayErrorContext(&e).to_string()))?;

            keys.extend(
                response
                    .contents()
                    .iter()
                    .filter_map(|object| object.key())
                    .filter(|key| !key.ends_with('/'))
                    .map(str::to_string),
            );

            continuation_token = response.next_continuation_token().map(str::to_string);
            if response.is_truncated() != Some(true) || continuation_token.is_none() {
                break;
            }
        }

        keys.sort();
        debug!(prefix, objects = keys.len(), "Listed objects");
        Ok(keys
            .iter()
            .map(|key| uri.with_key(key).to_string())
            .collect())
    }

    async fn put_object_content(&self, reference: &str, data: Vec<u8>) -> StorageResult<()> {
        let uri = S3Uri::parse(reference)?;

        self.client
            .put_object()
            .bucket(&uri.bucket)
            .key(&uri.key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| StorageError::S3Error(DisplayErrorContext(&e).to_string()))?;

        debug!(reference, "Uploaded object");
        Ok(())
    }
}

/// Local filesystem object source; references are paths
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSource;

impl LocalFileSource {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Regular files below `root`, recursively.
    async fn collect_files(root: &Path) -> StorageResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push(entry.path());
                } else if file_type.is_file() {
                    files.push(entry.path());
                }
            }
        }

        Ok(files)
    }
}

#[async_trait::async_trait]
impl ObjectSource for LocalFileSource {
    async fn get_object_content(&self, reference: &str) -> StorageResult<String> {
        match tokio::fs::read_to_string(reference).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(reference.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                Err(StorageError::InvalidUtf8(reference.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn object_exists(&self, reference: &str) -> StorageResult<bool> {
        Ok(tokio::fs::try_exists(reference).await?)
    }

    async fn list_objects(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let root = Path::new(prefix);
        if !tokio::fs::try_exists(root).await? {
            return Ok(Vec::new());
        }

        let mut references: Vec<String> = Self::collect_files(root)
            .await?
            .into_iter()
            .map(|path| path.to_string_lossy().into_owned())
            .collect();
        references.sort();
        Ok(references)
    }

    async fn put_object_content(&self, reference: &str, data: Vec<u8>) -> StorageResult<()> {
        let path = Path::new(reference);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, data).await?;
        Ok(())
    }
}

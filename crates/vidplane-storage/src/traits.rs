use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Storage backend abstraction. Keys are forward-slash-separated relative
/// paths (e.g. `videos/{org}/{video}/original.mp4`).
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write `data` at `storage_key`, creating parent directories.
    async fn upload(&self, storage_key: &str, data: Vec<u8>) -> StorageResult<()>;

    /// Read the whole object.
    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>>;

    /// Read the inclusive byte range `[start, end]` of the object.
    async fn download_range(&self, storage_key: &str, start: u64, end: u64)
        -> StorageResult<Vec<u8>>;

    /// Stream the object in chunks.
    async fn download_stream(&self, storage_key: &str) -> StorageResult<ByteStream>;

    /// Remove the object. Removing a missing object is not an error.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Remove every object under the given key prefix (e.g. a video's
    /// output directory).
    async fn delete_prefix(&self, key_prefix: &str) -> StorageResult<()>;

    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    async fn content_length(&self, storage_key: &str) -> StorageResult<u64>;
}

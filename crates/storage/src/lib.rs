//! Object storage for photo bytes.
//!
//! Everything the pipeline reads or writes (originals, retouched copies,
//! watermarked copies, thumbnails, operator watermark images) goes through
//! the [`ObjectStore`] trait. Production wires either the local-filesystem
//! backend or S3; tests inject an in-memory fake.

use async_trait::async_trait;

pub mod error;
pub mod local;
pub mod s3;

pub use error::StorageError;
pub use local::LocalStore;
pub use s3::S3Store;

/// Byte-level object storage keyed by `/`-separated paths.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key`, replacing any existing object.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<(), StorageError>;

    /// Fetch the object at `key`.
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Remove the object at `key`. Removing a missing object is not an
    /// error; deletes are idempotent on every backend.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

//! Storage collaborators behind the document and session handlers
//!
//! Provides the blob store used for uploaded documents and the key-value store
//! holding login sessions, with in-memory and Cloudflare (R2 + KV) backends.

pub mod cloudflare;
pub mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use cloudflare::{KvSessionStore, R2BlobStore};
pub use memory::{MemoryBlobStore, MemorySessionStore};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// An object read back from the blob store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: Option<String>,
    pub size: u64,
}

/// One page of a key listing. `cursor` is `None` once the listing is complete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPage {
    pub keys: Vec<String>,
    pub cursor: Option<String>,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), StorageError>;

    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StorageError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// List keys after `cursor`; pass the returned cursor back to continue.
    async fn list(&self, cursor: Option<&str>) -> Result<KeyPage, StorageError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

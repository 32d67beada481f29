//! # Storage Collaborator
//!
//! The key-value storage abstraction consumed by the framework. The concrete
//! engine (and its concurrency discipline: atomic per-key operations,
//! list consistency) is the collaborator's responsibility; this layer assumes
//! storage calls are safe to make from multiple in-flight requests but
//! provides no cross-key transactions. WAL entries occupy a reserved key
//! namespace (see [`crate::wal`]) distinct from domain data.

pub mod memory;

pub use memory::MemoryStorage;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Error returned by a storage collaborator.
#[derive(thiserror::Error, Debug)]
#[error("{message}")]
pub struct StorageError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StorageError {
    /// Create a storage error from a message.
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self { message: message.into(), source: None }
    }

    /// Create a storage error with an underlying source.
    pub fn with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self { message: message.into(), source: Some(source) }
    }
}

/// A single stored record: a key plus an untyped JSON value.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageEntry {
    pub key: String,
    pub value: Value,
}

impl StorageEntry {
    /// Create an entry from a key and a raw JSON value.
    pub fn new<K: Into<String>>(key: K, value: Value) -> Self {
        Self { key: key.into(), value }
    }

    /// Create an entry by JSON-encoding a serializable record.
    pub fn from_json<K: Into<String>, T: Serialize>(
        key: K,
        record: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self { key: key.into(), value: serde_json::to_value(record)? })
    }

    /// Decode the entry's value into a typed record.
    pub fn decode_json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.value.clone())
    }
}

/// Key-value storage surface consumed by the framework.
///
/// `list` returns the full keys under the given prefix, in key order.
pub trait Storage: Send + Sync {
    /// Fetch the entry stored under `key`, or `None` if absent.
    fn get(&self, key: &str) -> Result<Option<StorageEntry>, StorageError>;

    /// Store an entry, replacing any existing value under its key.
    fn put(&self, entry: StorageEntry) -> Result<(), StorageError>;

    /// Remove the entry under `key`. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// List all keys beginning with `prefix`, in key order.
    fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

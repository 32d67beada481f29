//! Write-ahead-log helpers over the storage collaborator.
//!
//! A WAL entry is the durable record of an intended side effect, written
//! before the effect is attempted. If the process dies between the durable
//! write and the completion of the paired external effect, a later rollback
//! sweep finds the entry and repairs it, giving at-least-once retry
//! semantics without a distributed transaction.
//!
//! Entries live under the reserved `wal/` key namespace, distinct from
//! domain data, and are never mutated in place: they are written once and
//! deleted when resolved.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::{BackendError, Result};
use crate::storage::{Storage, StorageEntry};

/// Reserved key namespace for WAL entries.
pub const WAL_PREFIX: &str = "wal/";

/// A durable record of a pending side effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Kind tag identifying which rollback logic applies.
    pub kind: String,
    /// Opaque payload handed back to the rollback callback.
    pub data: Value,
    /// Creation time, compared against the sweep's age threshold.
    pub created_at: DateTime<Utc>,
}

/// Write a new WAL entry and return its generated identifier.
pub fn put_wal(storage: &dyn Storage, kind: &str, data: Value) -> Result<String> {
    let id = Uuid::new_v4().to_string();
    let entry = WalEntry { kind: kind.to_string(), data, created_at: Utc::now() };
    let stored = StorageEntry::from_json(wal_key(&id), &entry)?;
    storage
        .put(stored)
        .map_err(|e| BackendError::storage("failed to write WAL entry", e))?;
    tracing::debug!(wal_id = %id, kind = %kind, "wrote WAL entry");
    Ok(id)
}

/// Load a WAL entry by identifier. Returns `None` when the entry does not
/// exist (including when it vanished after a `list_wal`).
pub fn get_wal(storage: &dyn Storage, id: &str) -> Result<Option<WalEntry>> {
    let entry = storage
        .get(&wal_key(id))
        .map_err(|e| BackendError::storage(format!("failed to read WAL entry '{}'", id), e))?;
    match entry {
        Some(stored) => Ok(Some(stored.decode_json()?)),
        None => Ok(None),
    }
}

/// List the identifiers of all WAL entries.
pub fn list_wal(storage: &dyn Storage) -> Result<Vec<String>> {
    let keys = storage
        .list(WAL_PREFIX)
        .map_err(|e| BackendError::storage("failed to list WAL entries", e))?;
    Ok(keys
        .iter()
        .filter_map(|key| key.strip_prefix(WAL_PREFIX))
        .map(str::to_string)
        .collect())
}

/// Delete a WAL entry. Deleting a missing entry is not an error.
pub fn delete_wal(storage: &dyn Storage, id: &str) -> Result<()> {
    storage
        .delete(&wal_key(id))
        .map_err(|e| BackendError::storage(format!("failed to delete WAL entry '{}'", id), e))
}

fn wal_key(id: &str) -> String {
    format!("{}{}", WAL_PREFIX, id)
}

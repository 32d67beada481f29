//! Rollback reconciliation: the WAL sweep.
//!
//! A sweep repairs side effects whose durable intent record was written but
//! whose paired external effect may never have completed (a crash between
//! storing state and finishing an external provisioning call, for example).
//! Entries younger than the minimum age are left alone: they may belong to
//! an operation still in flight, and rolling them back prematurely could
//! corrupt legitimate work.
//!
//! The sweep is not atomic across entries; partial progress (some entries
//! deleted, some retained for retry) is expected and correct. Sweeps are not
//! serialized against each other, which is why rollback callbacks must be
//! idempotent (see [`RollbackHandler`](crate::backend::RollbackHandler)).

use chrono::{Duration, Utc};

use crate::backend::Backend;
use crate::errors::{BackendError, MultiError};
use crate::path::HandlerResult;
use crate::request::Request;
use crate::wal;

impl Backend {
    /// Sweep the WAL, rolling back every entry old enough to be safe.
    ///
    /// Without a registered rollback callback the backend cannot process
    /// reconciliation at all, so the request fails as unsupported. An
    /// `"immediate"` key in the request data overrides the age gate and
    /// makes every entry eligible.
    ///
    /// Per-entry failures are wrapped with the entry's kind tag, the entry
    /// is retained for a future sweep, and the scan continues; the
    /// accumulated failures come back as one aggregated error after the
    /// full scan.
    pub(crate) fn handle_rollback(&self, req: &Request) -> HandlerResult {
        let Some(rollback) = &self.rollback else {
            return Err(BackendError::UnsupportedOperation);
        };

        let ids = wal::list_wal(req.storage.as_ref())?;
        if ids.is_empty() {
            return Ok(None);
        }

        // Entries must have been created strictly before this threshold to
        // qualify. The immediate override pushes the threshold far into the
        // future so every entry qualifies regardless of age.
        let min_age = if req.data.contains_key("immediate") {
            Utc::now() + Duration::hours(1000)
        } else {
            Utc::now() - self.rollback_min_age
        };

        let mut errors = MultiError::new();
        let mut rolled_back = 0usize;
        let scanned = ids.len();

        for id in ids {
            let entry = match wal::get_wal(req.storage.as_ref(), &id) {
                Ok(Some(entry)) => entry,
                // Vanished between listing and loading: already resolved.
                Ok(None) => continue,
                Err(err) => {
                    errors.push(err);
                    continue;
                }
            };

            if entry.created_at >= min_age {
                continue;
            }

            match rollback(req, &entry.kind, &entry.data) {
                Ok(()) => match wal::delete_wal(req.storage.as_ref(), &id) {
                    Ok(()) => {
                        rolled_back += 1;
                        tracing::debug!(wal_id = %id, kind = %entry.kind, "rolled back WAL entry");
                    }
                    Err(err) => errors.push(err),
                },
                Err(err) => {
                    tracing::warn!(
                        wal_id = %id,
                        kind = %entry.kind,
                        error = %err,
                        "rollback failed, retaining WAL entry"
                    );
                    errors.push(BackendError::rollback(&entry.kind, err));
                }
            }
        }

        tracing::info!(
            scanned,
            rolled_back,
            failed = errors.len(),
            "rollback sweep complete"
        );

        if errors.is_empty() {
            Ok(None)
        } else {
            Err(BackendError::Sweep(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendBuilder;
    use crate::request::Operation;
    use crate::storage::{MemoryStorage, Storage, StorageEntry, StorageError};
    use crate::wal::{WalEntry, WAL_PREFIX};
    use serde_json::{json, Map};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn write_entry_aged(storage: &dyn Storage, id: &str, kind: &str, age: Duration) {
        let entry = WalEntry {
            kind: kind.to_string(),
            data: json!({"id": id}),
            created_at: Utc::now() - age,
        };
        storage
            .put(StorageEntry::from_json(format!("{}{}", WAL_PREFIX, id), &entry).unwrap())
            .unwrap();
    }

    fn rollback_request(storage: Arc<dyn Storage>, immediate: bool) -> Request {
        let mut req = Request::new(Operation::Rollback, "", storage);
        if immediate {
            let mut data = Map::new();
            data.insert("immediate".to_string(), json!(true));
            req = req.with_data(data);
        }
        req
    }

    #[test]
    fn test_no_rollback_callback_is_unsupported() {
        let backend = BackendBuilder::new().build().unwrap();
        let req = rollback_request(Arc::new(MemoryStorage::new()), false);
        let err = backend.handle_request(&req).unwrap_err();
        assert!(matches!(err, BackendError::UnsupportedOperation));
    }

    #[test]
    fn test_empty_wal_is_success() {
        let backend = BackendBuilder::new().rollback(|_req, _kind, _data| Ok(())).build().unwrap();
        let req = rollback_request(Arc::new(MemoryStorage::new()), false);
        assert!(backend.handle_request(&req).unwrap().is_none());
    }

    #[test]
    fn test_young_entry_untouched_aged_entry_removed() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let backend = BackendBuilder::new()
            .rollback(move |_req, _kind, _data| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .build()
            .unwrap();

        let storage = Arc::new(MemoryStorage::new());
        write_entry_aged(storage.as_ref(), "young", "ssh_key", Duration::minutes(5));
        write_entry_aged(storage.as_ref(), "old", "ssh_key", Duration::minutes(11));

        let req = rollback_request(storage.clone(), false);
        assert!(backend.handle_request(&req).unwrap().is_none());

        // The 5-minute entry is still in flight; only the 11-minute one was
        // rolled back and deleted.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(wal::get_wal(storage.as_ref(), "young").unwrap().is_some());
        assert!(wal::get_wal(storage.as_ref(), "old").unwrap().is_none());
    }

    #[test]
    fn test_immediate_overrides_age_gate() {
        let backend = BackendBuilder::new().rollback(|_req, _kind, _data| Ok(())).build().unwrap();

        let storage = Arc::new(MemoryStorage::new());
        write_entry_aged(storage.as_ref(), "young", "ssh_key", Duration::minutes(5));

        let req = rollback_request(storage.clone(), true);
        assert!(backend.handle_request(&req).unwrap().is_none());
        assert!(wal::get_wal(storage.as_ref(), "young").unwrap().is_none());
    }

    #[test]
    fn test_failed_entry_retained_and_reported_with_kind() {
        let backend = BackendBuilder::new()
            .rollback(|_req, kind, _data| match kind {
                "broken" => Err(BackendError::internal("provisioner unreachable")),
                _ => Ok(()),
            })
            .build()
            .unwrap();

        let storage = Arc::new(MemoryStorage::new());
        write_entry_aged(storage.as_ref(), "a", "broken", Duration::minutes(30));
        write_entry_aged(storage.as_ref(), "b", "fine", Duration::minutes(30));

        let req = rollback_request(storage.clone(), false);
        let err = backend.handle_request(&req).unwrap_err();

        // The failed entry stays for the next sweep; the healthy one is
        // resolved. The aggregate names the failing kind tag.
        assert!(wal::get_wal(storage.as_ref(), "a").unwrap().is_some());
        assert!(wal::get_wal(storage.as_ref(), "b").unwrap().is_none());
        assert!(matches!(err, BackendError::Sweep(_)));
        assert!(err.to_string().contains("rolling back 'broken' entry"));
        assert!(err.to_string().contains("provisioner unreachable"));
    }

    #[test]
    fn test_undecodable_entry_accumulated_and_sweep_continues() {
        let backend = BackendBuilder::new().rollback(|_req, _kind, _data| Ok(())).build().unwrap();

        let storage = Arc::new(MemoryStorage::new());
        // A value under the WAL namespace that does not decode as an entry.
        storage.put(StorageEntry::new("wal/bad", json!("garbage"))).unwrap();
        write_entry_aged(storage.as_ref(), "good", "ssh_key", Duration::minutes(30));

        let req = rollback_request(storage.clone(), false);
        let err = backend.handle_request(&req).unwrap_err();

        // The load failure is accumulated, the healthy entry is still
        // resolved, and the undecodable one is left in place.
        assert!(matches!(err, BackendError::Sweep(_)));
        assert!(err.to_string().contains("serialization error"));
        assert!(wal::get_wal(storage.as_ref(), "good").unwrap().is_none());
        assert!(storage.get("wal/bad").unwrap().is_some());
    }

    /// Storage double whose listing reports one identifier its `get` no
    /// longer returns, as if another sweep resolved it in between.
    struct VanishingStorage {
        inner: MemoryStorage,
        phantom: String,
    }

    impl Storage for VanishingStorage {
        fn get(&self, key: &str) -> Result<Option<StorageEntry>, StorageError> {
            self.inner.get(key)
        }

        fn put(&self, entry: StorageEntry) -> Result<(), StorageError> {
            self.inner.put(entry)
        }

        fn delete(&self, key: &str) -> Result<(), StorageError> {
            self.inner.delete(key)
        }

        fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
            let mut keys = self.inner.list(prefix)?;
            keys.push(format!("{}{}", prefix, self.phantom));
            Ok(keys)
        }
    }

    #[test]
    fn test_vanished_entry_skipped_silently() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let backend = BackendBuilder::new()
            .rollback(move |_req, _kind, _data| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .build()
            .unwrap();

        let storage = Arc::new(VanishingStorage {
            inner: MemoryStorage::new(),
            phantom: "ghost".to_string(),
        });
        write_entry_aged(storage.as_ref(), "real", "ssh_key", Duration::minutes(30));

        // An entry that vanished between listing and loading is already
        // resolved: no error, no callback invocation for it.
        let req = rollback_request(storage.clone(), false);
        assert!(backend.handle_request(&req).unwrap().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(wal::get_wal(storage.as_ref(), "real").unwrap().is_none());
    }

    #[test]
    fn test_custom_min_age() {
        let backend = BackendBuilder::new()
            .rollback(|_req, _kind, _data| Ok(()))
            .rollback_min_age(Duration::minutes(1))
            .build()
            .unwrap();

        let storage = Arc::new(MemoryStorage::new());
        write_entry_aged(storage.as_ref(), "entry", "ssh_key", Duration::minutes(2));

        let req = rollback_request(storage.clone(), false);
        backend.handle_request(&req).unwrap();
        assert!(wal::get_wal(storage.as_ref(), "entry").unwrap().is_none());
    }
}

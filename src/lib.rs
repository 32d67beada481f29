//! # Keyplane
//!
//! Keyplane is a framework for building secrets-engine backends. A backend
//! registers path patterns with typed field schemas and per-operation
//! handlers, secret-type descriptors with lease renew/revoke handlers, and
//! an optional rollback callback; the framework then handles routing,
//! parameter extraction, lifecycle dispatch, and write-ahead-log (WAL)
//! reconciliation for side effects that cross the durability boundary.
//!
//! ## Architecture
//!
//! ```text
//! Request ──▶ Dispatcher ──▶ Router ──▶ Field Extractor ──▶ Path handler
//!                │
//!                ├── renew/revoke ──▶ Secret registry ──▶ Lifecycle handler
//!                └── rollback ──────▶ WAL sweep ─────────▶ Rollback callback
//! ```
//!
//! Request handling is synchronous and stateless at this layer: the path,
//! secret, and configuration set is immutable once [`BackendBuilder::build`]
//! returns, patterns are compiled exactly once at that point, and all
//! durable state lives behind the [`storage::Storage`] collaborator.
//!
//! ## Errors
//!
//! Failures are two-tier. Systemic faults and contract violations
//! (unsupported paths and operations, storage errors, internal invariant
//! violations) propagate as [`BackendError`]. User-facing validation
//! failures are ordinary [`Response::error`] values that never abort the
//! dispatch pipeline.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use keyplane::{
//!     BackendBuilder, FieldSchema, FieldType, MemoryStorage, Operation, Path, Request, Response,
//! };
//!
//! let backend = BackendBuilder::new()
//!     .path(
//!         Path::new("roles/(?P<role>.+)")
//!             .field("role", FieldSchema::new(FieldType::String))
//!             .field("port", FieldSchema::new(FieldType::Int).with_default(22))
//!             .operation(Operation::Read, |_req, data| {
//!                 let mut out = serde_json::Map::new();
//!                 out.insert("role".into(), data.get_str("role")?.into());
//!                 out.insert("port".into(), data.get_int("port")?.into());
//!                 Ok(Some(Response::new(out)))
//!             }),
//!     )
//!     .build()
//!     .expect("valid backend configuration");
//!
//! let storage = Arc::new(MemoryStorage::new());
//! let req = Request::new(Operation::Read, "roles/web", storage);
//! let resp = backend.handle_request(&req).unwrap().unwrap();
//! assert_eq!(resp.data["role"], "web");
//! assert_eq!(resp.data["port"], 22);
//! ```

pub mod backend;
pub mod errors;
pub mod field;
pub mod path;
pub mod request;
pub mod response;
mod rollback;
pub mod secret;
pub mod storage;
pub mod wal;

// Re-export commonly used types and traits
pub use backend::{Backend, BackendBuilder, RollbackHandler, DEFAULT_ROLLBACK_MIN_AGE_MINUTES};
pub use errors::{BackendError, MultiError, Result};
pub use field::{FieldData, FieldSchema, FieldType};
pub use path::{HandlerResult, OperationHandler, Path, SpecialPaths};
pub use request::{Operation, Request, SecretLease, SECRET_TYPE_KEY};
pub use response::Response;
pub use secret::{LifecycleHandler, Secret};
pub use storage::{MemoryStorage, Storage, StorageEntry, StorageError};
pub use wal::{delete_wal, get_wal, list_wal, put_wal, WalEntry, WAL_PREFIX};

/// Crate version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! # Error Handling
//!
//! Error types for the backend framework using `thiserror`.
//!
//! The framework distinguishes two tiers of failure:
//!
//! - **Propagated failures** (`BackendError`): systemic faults and contract
//!   violations — storage errors, dispatch to a path or operation the backend
//!   does not expose, internal invariant violations. These abort the request.
//! - **Response-errors**: user-facing validation failures, returned as an
//!   ordinary [`Response`](crate::Response) carrying an `"error"` data key.
//!   Handlers produce these for client-correctable input; they never surface
//!   as `Err`.

use crate::storage::StorageError;

/// Custom result type for backend operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Main error type for the backend framework.
///
/// The unsupported-path, unsupported-operation, and unsupported-secret
/// variants carry fixed sentinel messages. In particular, a request whose
/// secret lacks a type tag, carries a malformed tag, or names an unregistered
/// type all produce the identical [`UnsupportedSecret`] message, so external
/// probing cannot distinguish internal record shape from misconfiguration.
///
/// [`UnsupportedSecret`]: BackendError::UnsupportedSecret
#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    /// Construction-time configuration errors (blank pattern, bad default).
    #[error("configuration error: {0}")]
    Config(String),

    /// The request path matches no registered path pattern.
    #[error("unsupported path")]
    UnsupportedPath,

    /// The matched path declares no handler for the requested operation.
    #[error("unsupported operation")]
    UnsupportedOperation,

    /// A renew/revoke request arrived without a secret record.
    #[error("request has no secret")]
    NoSecret,

    /// The secret's type tag is missing, malformed, or unregistered.
    #[error("secret is unsupported by this backend")]
    UnsupportedSecret,

    /// A supplied value cannot be coerced to its declared field type.
    #[error("field '{field}' cannot be decoded as {expected}")]
    FieldDecode { field: String, expected: &'static str },

    /// Errors from the storage collaborator.
    #[error("storage error: {context}")]
    Storage {
        context: String,
        #[source]
        source: StorageError,
    },

    /// Serialization/deserialization errors for stored records.
    #[error("serialization error: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// A rollback callback failed for a WAL entry of the given kind.
    /// The entry is retained for a future sweep.
    #[error("error rolling back '{kind}' entry: {source}")]
    Rollback {
        kind: String,
        #[source]
        source: Box<BackendError>,
    },

    /// One or more failures accumulated over a full rollback sweep.
    #[error("rollback sweep failed: {0}")]
    Sweep(MultiError),

    /// Internal dispatch invariant violations (backend programming errors).
    #[error("internal error: {0}")]
    Internal(String),
}

impl BackendError {
    /// Create a new configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new internal error.
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Create a storage error with context.
    pub fn storage<S: Into<String>>(context: S, source: StorageError) -> Self {
        Self::Storage { context: context.into(), source }
    }

    /// Wrap a failed rollback with the WAL entry's kind tag for diagnosis.
    pub fn rollback<S: Into<String>>(kind: S, source: BackendError) -> Self {
        Self::Rollback { kind: kind.into(), source: Box::new(source) }
    }
}

impl From<StorageError> for BackendError {
    fn from(error: StorageError) -> Self {
        Self::Storage { context: "storage operation failed".to_string(), source: error }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization { context: "JSON serialization failed".to_string(), source: error }
    }
}

/// A growable collection of errors accumulated over a rollback sweep.
///
/// The sweep never halts on the first failure; every per-entry error is
/// appended here and the collection is returned as one aggregated
/// [`BackendError::Sweep`] after the full scan.
#[derive(Debug, Default)]
pub struct MultiError {
    errors: Vec<BackendError>,
}

impl MultiError {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an error to the collection.
    pub fn push(&mut self, error: BackendError) {
        self.errors.push(error);
    }

    /// True when no errors have accumulated.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of accumulated errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Iterate over the accumulated errors.
    pub fn iter(&self) -> impl Iterator<Item = &BackendError> {
        self.errors.iter()
    }
}

impl std::fmt::Display for MultiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error(s) occurred: ", self.errors.len())?;
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for MultiError {}

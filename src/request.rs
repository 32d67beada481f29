//! Request types: operation kinds, lease records, and the request envelope.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::storage::Storage;

/// Key under a lease's internal data identifying its secret-type descriptor.
pub const SECRET_TYPE_KEY: &str = "secret_type";

/// The kind of operation a request performs.
///
/// Read, Write, Delete, List, and Help route through registered paths.
/// Renew, Revoke, and Rollback are global: they never route through paths
/// and are handled directly by the backend. `Custom` kinds are
/// backend-defined and route through paths like the standard path kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    Read,
    Write,
    Delete,
    List,
    Help,
    Renew,
    Revoke,
    Rollback,
    /// Backend-defined operation kind, routed through paths.
    Custom(String),
}

impl Operation {
    /// String representation of this operation kind.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Delete => "delete",
            Self::List => "list",
            Self::Help => "help",
            Self::Renew => "renew",
            Self::Revoke => "revoke",
            Self::Rollback => "rollback",
            Self::Custom(kind) => kind,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Operation {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "read" => Self::Read,
            "write" => Self::Write,
            "delete" => Self::Delete,
            "list" => Self::List,
            "help" => Self::Help,
            "renew" => Self::Renew,
            "revoke" => Self::Revoke,
            "rollback" => Self::Rollback,
            other => Self::Custom(other.to_string()),
        })
    }
}

/// A server-issued lease record attached to renew/revoke requests.
///
/// The internal data is never exposed to clients; the framework reads the
/// [`SECRET_TYPE_KEY`] entry from it to select the governing
/// [`Secret`](crate::Secret) descriptor.
#[derive(Debug, Clone, Default)]
pub struct SecretLease {
    /// Identifier of the lease, assigned by the issuing layer.
    pub lease_id: String,
    /// Internal-only data carried with the lease.
    pub internal_data: Map<String, Value>,
}

impl SecretLease {
    /// Create a lease tagged with the given secret type.
    pub fn new<I: Into<String>, T: Into<String>>(lease_id: I, secret_type: T) -> Self {
        let mut internal_data = Map::new();
        internal_data.insert(SECRET_TYPE_KEY.to_string(), Value::String(secret_type.into()));
        Self { lease_id: lease_id.into(), internal_data }
    }

    /// The lease's secret-type tag, if present and string-shaped.
    ///
    /// A missing key and a non-string value are deliberately
    /// indistinguishable here; both dispatch as unsupported.
    pub fn secret_type(&self) -> Option<&str> {
        self.internal_data.get(SECRET_TYPE_KEY).and_then(Value::as_str)
    }
}

/// An inbound request to the backend.
pub struct Request {
    /// The operation to perform.
    pub operation: Operation,
    /// The request path, matched against registered path patterns.
    pub path: String,
    /// Untyped body data supplied by the caller.
    pub data: Map<String, Value>,
    /// Lease record, required for renew/revoke.
    pub secret: Option<SecretLease>,
    /// Handle to the storage collaborator for this request.
    pub storage: Arc<dyn Storage>,
}

impl Request {
    /// Create a request with empty data and no secret.
    pub fn new<P: Into<String>>(operation: Operation, path: P, storage: Arc<dyn Storage>) -> Self {
        Self { operation, path: path.into(), data: Map::new(), secret: None, storage }
    }

    /// Attach body data.
    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = data;
        self
    }

    /// Attach a lease record.
    pub fn with_secret(mut self, secret: SecretLease) -> Self {
        self.secret = Some(secret);
        self
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("operation", &self.operation)
            .field("path", &self.path)
            .field("data", &self.data)
            .field("secret", &self.secret)
            .finish_non_exhaustive()
    }
}

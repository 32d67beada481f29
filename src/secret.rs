//! Secret-type descriptors: lease lifecycle handlers keyed by type tag.

use std::fmt;

use crate::errors::BackendError;
use crate::path::HandlerResult;
use crate::request::Request;

/// Callback invoked to renew or revoke a lease of this secret type.
pub type LifecycleHandler = Box<dyn Fn(&Request) -> HandlerResult + Send + Sync>;

/// A secret type the backend can issue, with its lifecycle handlers.
///
/// The type tag is the lookup key: renew/revoke requests carry the tag in
/// the lease's internal data and dispatch to the first registered descriptor
/// with an exact tag match. Duplicate tags are not detected; the first
/// registered wins.
pub struct Secret {
    secret_type: String,
    renew: Option<LifecycleHandler>,
    revoke: Option<LifecycleHandler>,
}

impl Secret {
    /// Create a descriptor for the given type tag.
    pub fn new<S: Into<String>>(secret_type: S) -> Self {
        Self { secret_type: secret_type.into(), renew: None, revoke: None }
    }

    /// Register the renew handler.
    pub fn on_renew<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Request) -> HandlerResult + Send + Sync + 'static,
    {
        self.renew = Some(Box::new(handler));
        self
    }

    /// Register the revoke handler.
    pub fn on_revoke<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Request) -> HandlerResult + Send + Sync + 'static,
    {
        self.revoke = Some(Box::new(handler));
        self
    }

    /// This descriptor's type tag.
    pub fn secret_type(&self) -> &str {
        &self.secret_type
    }

    /// Dispatch a renew request. A type with no renew handler does not
    /// support the operation.
    pub(crate) fn handle_renew(&self, req: &Request) -> HandlerResult {
        match &self.renew {
            Some(handler) => handler(req),
            None => Err(BackendError::UnsupportedOperation),
        }
    }

    /// Dispatch a revoke request. A type with no revoke handler does not
    /// support the operation.
    pub(crate) fn handle_revoke(&self, req: &Request) -> HandlerResult {
        match &self.revoke {
            Some(handler) => handler(req),
            None => Err(BackendError::UnsupportedOperation),
        }
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("secret_type", &self.secret_type)
            .field("renew", &self.renew.is_some())
            .field("revoke", &self.revoke.is_some())
            .finish()
    }
}

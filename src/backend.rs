//! Backend construction and request dispatch.
//!
//! A [`Backend`] is assembled once from an ordered path list, a secret-type
//! registry, and an optional rollback callback, then serves requests through
//! [`Backend::handle_request`]. The path, secret, and configuration set is
//! immutable after construction; patterns are anchored and compiled exactly
//! once at build time, so request handling needs no locking.

use std::collections::HashMap;

use chrono::Duration;
use regex::Regex;
use serde_json::Value;

use crate::errors::{BackendError, Result};
use crate::field::FieldData;
use crate::path::{HandlerResult, Path, SpecialPaths};
use crate::request::{Operation, Request};
use crate::secret::Secret;

/// Callback invoked to roll back a pending WAL entry, with the entry's kind
/// tag and opaque payload.
///
/// Overlapping sweeps are not serialized: two concurrent sweeps may both
/// select the same aged entry, so rollback callbacks must be idempotent.
pub type RollbackHandler =
    Box<dyn Fn(&Request, &str, &Value) -> Result<()> + Send + Sync>;

/// Default minimum age of a WAL entry before a sweep will roll it back.
/// This should exceed the longest time a successful secret creation takes.
pub const DEFAULT_ROLLBACK_MIN_AGE_MINUTES: i64 = 10;

/// Builder for a [`Backend`].
///
/// Configuration mistakes — a blank routing pattern, an invalid regular
/// expression, a field default that does not match its declared type — are
/// construction-time [`BackendError::Config`] failures from [`build`],
/// never runtime errors.
///
/// [`build`]: BackendBuilder::build
#[derive(Default)]
pub struct BackendBuilder {
    paths: Vec<Path>,
    special_paths: SpecialPaths,
    secrets: Vec<Secret>,
    rollback: Option<RollbackHandler>,
    rollback_min_age: Option<Duration>,
}

impl BackendBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a path. Declaration order is significant: overlapping
    /// patterns are resolved by first match in registration order.
    pub fn path(mut self, path: Path) -> Self {
        self.paths.push(path);
        self
    }

    /// Set the special path-prefix lists.
    pub fn special_paths(mut self, special_paths: SpecialPaths) -> Self {
        self.special_paths = special_paths;
        self
    }

    /// Register a secret-type descriptor. The first registered descriptor
    /// for a tag wins; duplicates are not detected.
    pub fn secret(mut self, secret: Secret) -> Self {
        self.secrets.push(secret);
        self
    }

    /// Register the global rollback callback. The callback must be
    /// idempotent (see [`RollbackHandler`]).
    pub fn rollback<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Request, &str, &Value) -> Result<()> + Send + Sync + 'static,
    {
        self.rollback = Some(Box::new(handler));
        self
    }

    /// Set the minimum WAL entry age for rollback sweeps. Defaults to
    /// [`DEFAULT_ROLLBACK_MIN_AGE_MINUTES`].
    pub fn rollback_min_age(mut self, min_age: Duration) -> Self {
        self.rollback_min_age = Some(min_age);
        self
    }

    /// Validate the configuration and compile all path patterns.
    pub fn build(self) -> Result<Backend> {
        let mut compiled = Vec::with_capacity(self.paths.len());
        for path in &self.paths {
            compiled.push(compile_pattern(path.pattern())?);
            validate_fields(path)?;
        }

        Ok(Backend {
            paths: self.paths,
            compiled,
            special_paths: self.special_paths,
            secrets: self.secrets,
            rollback: self.rollback,
            rollback_min_age: self
                .rollback_min_age
                .unwrap_or_else(|| Duration::minutes(DEFAULT_ROLLBACK_MIN_AGE_MINUTES)),
        })
    }
}

/// Anchor and compile a routing pattern. A blank pattern is a configuration
/// error.
fn compile_pattern(pattern: &str) -> Result<Regex> {
    if pattern.is_empty() {
        return Err(BackendError::config("routing pattern cannot be blank"));
    }

    let mut anchored = String::with_capacity(pattern.len() + 2);
    if !pattern.starts_with('^') {
        anchored.push('^');
    }
    anchored.push_str(pattern);
    if !pattern.ends_with('$') {
        anchored.push('$');
    }

    Regex::new(&anchored).map_err(|e| {
        BackendError::config(format!("invalid routing pattern '{}': {}", pattern, e))
    })
}

/// Check that every declared field default matches its declared type.
fn validate_fields(path: &Path) -> Result<()> {
    for (name, schema) in path.fields() {
        if let Some(default) = &schema.default {
            if !schema.field_type.matches(default) {
                return Err(BackendError::config(format!(
                    "default for field '{}' on path '{}' does not match declared type {}",
                    name,
                    path.pattern(),
                    schema.field_type
                )));
            }
        }
    }
    Ok(())
}

/// A fully constructed secrets-engine backend.
///
/// Routes path operations to registered handlers with typed field
/// extraction, dispatches lease renew/revoke to the registered secret type,
/// and reconciles pending WAL entries on rollback requests.
pub struct Backend {
    pub(crate) paths: Vec<Path>,
    pub(crate) compiled: Vec<Regex>,
    pub(crate) special_paths: SpecialPaths,
    pub(crate) secrets: Vec<Secret>,
    pub(crate) rollback: Option<RollbackHandler>,
    pub(crate) rollback_min_age: Duration,
}

impl Backend {
    /// Dispatch a request.
    ///
    /// Renew, revoke, and rollback are global operations handled directly;
    /// everything else routes through the registered paths. Handler
    /// outcomes are propagated unmodified.
    pub fn handle_request(&self, req: &Request) -> HandlerResult {
        tracing::debug!(path = %req.path, operation = %req.operation, "handling request");

        match req.operation {
            Operation::Renew | Operation::Revoke => self.handle_renew_revoke(req),
            Operation::Rollback => self.handle_rollback(req),
            _ => self.handle_path_request(req),
        }
    }

    /// Match a request path against the registered patterns, first match
    /// wins in registration order. Returns the path descriptor and the
    /// named captures, or `None` when nothing matches.
    pub fn route(&self, request_path: &str) -> Option<(&Path, HashMap<String, String>)> {
        for (path, regex) in self.paths.iter().zip(&self.compiled) {
            let Some(matched) = regex.captures(request_path) else {
                continue;
            };

            let mut captures = HashMap::new();
            for name in regex.capture_names().flatten() {
                if let Some(value) = matched.name(name) {
                    captures.insert(name.to_string(), value.as_str().to_string());
                }
            }
            return Some((path, captures));
        }

        None
    }

    /// Look up the secret descriptor registered for `secret_type`.
    pub fn secret(&self, secret_type: &str) -> Option<&Secret> {
        self.secrets.iter().find(|s| s.secret_type() == secret_type)
    }

    /// The special path-prefix lists for outer layers.
    pub fn special_paths(&self) -> &SpecialPaths {
        &self.special_paths
    }

    fn handle_path_request(&self, req: &Request) -> HandlerResult {
        let Some((path, captures)) = self.route(&req.path) else {
            tracing::debug!(path = %req.path, "no matching path");
            return Err(BackendError::UnsupportedPath);
        };

        // Merge body data with the captures, captures winning on collision:
        // they come from the trusted path structure, not the body.
        let mut raw = req.data.clone();
        for (name, value) in captures {
            raw.insert(name, Value::String(value));
        }

        match path.handler(&req.operation) {
            Some(handler) => handler(req, &FieldData::new(raw, path.fields())),
            None if req.operation == Operation::Help => {
                path.help_response().map(Some).ok_or(BackendError::UnsupportedOperation)
            }
            None => Err(BackendError::UnsupportedOperation),
        }
    }

    /// Dispatch a lease lifecycle request to the governing secret type.
    ///
    /// A missing type tag, a malformed tag, and an unregistered tag all
    /// produce the identical unsupported-secret failure, so external
    /// probing cannot distinguish internal record shape from
    /// misconfiguration.
    fn handle_renew_revoke(&self, req: &Request) -> HandlerResult {
        let Some(lease) = &req.secret else {
            return Err(BackendError::NoSecret);
        };

        let Some(secret_type) = lease.secret_type() else {
            return Err(BackendError::UnsupportedSecret);
        };

        let Some(secret) = self.secret(secret_type) else {
            return Err(BackendError::UnsupportedSecret);
        };

        match req.operation {
            Operation::Renew => secret.handle_renew(req),
            Operation::Revoke => secret.handle_revoke(req),
            _ => Err(BackendError::internal(format!(
                "invalid operation for renew/revoke: {}",
                req.operation
            ))),
        }
    }
}

//! Path descriptors and special-path matching.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::errors::Result;
use crate::field::{FieldData, FieldSchema};
use crate::request::{Operation, Request};
use crate::response::Response;

/// The outcome of an operation handler: an optional response, or a
/// propagated failure. Response-errors are `Ok(Some(Response::error(..)))`.
pub type HandlerResult = Result<Option<Response>>;

/// Callback invoked for an operation on a path.
pub type OperationHandler =
    Box<dyn Fn(&Request, &FieldData<'_>) -> HandlerResult + Send + Sync>;

/// A registered route: a pattern, its field schemas, and per-operation
/// handlers.
///
/// Patterns are regular expressions with named capture groups; they are
/// auto-anchored (`^`/`$` added if absent) and compiled exactly once when the
/// backend is built. Overlapping patterns are resolved by declaration order
/// on the backend, an explicit precedence mechanism.
///
/// ```
/// use keyplane::{FieldSchema, FieldType, Operation, Path, Response};
///
/// let path = Path::new("roles/(?P<role>.+)")
///     .field("role", FieldSchema::new(FieldType::String))
///     .operation(Operation::Read, |_req, data| {
///         let _role = data.get_str("role")?;
///         Ok(Some(Response::default()))
///     })
///     .help("Manage the roles that can be created with this backend.", None);
/// assert_eq!(path.pattern(), "roles/(?P<role>.+)");
/// ```
pub struct Path {
    pattern: String,
    fields: BTreeMap<String, FieldSchema>,
    operations: HashMap<Operation, OperationHandler>,
    help_synopsis: Option<String>,
    help_description: Option<String>,
}

impl Path {
    /// Create a path for the given pattern.
    pub fn new<S: Into<String>>(pattern: S) -> Self {
        Self {
            pattern: pattern.into(),
            fields: BTreeMap::new(),
            operations: HashMap::new(),
            help_synopsis: None,
            help_description: None,
        }
    }

    /// Declare a field schema.
    pub fn field<S: Into<String>>(mut self, name: S, schema: FieldSchema) -> Self {
        self.fields.insert(name.into(), schema);
        self
    }

    /// Register a handler for an operation kind.
    pub fn operation<F>(mut self, operation: Operation, handler: F) -> Self
    where
        F: Fn(&Request, &FieldData<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.operations.insert(operation, Box::new(handler));
        self
    }

    /// Set help text: a synopsis and an optional longer description. When a
    /// Help request hits this path and no Help handler is registered, the
    /// backend synthesizes a help response from this text.
    pub fn help<S: Into<String>>(mut self, synopsis: S, description: Option<String>) -> Self {
        self.help_synopsis = Some(synopsis.into());
        self.help_description = description;
        self
    }

    /// The (unanchored, as-registered) pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Declared field schemas, ordered by name.
    pub fn fields(&self) -> &BTreeMap<String, FieldSchema> {
        &self.fields
    }

    /// The handler registered for `operation`, if any.
    pub fn handler(&self, operation: &Operation) -> Option<&OperationHandler> {
        self.operations.get(operation)
    }

    /// Registered help synopsis, if any.
    pub fn help_synopsis(&self) -> Option<&str> {
        self.help_synopsis.as_deref()
    }

    /// Registered help description, if any.
    pub fn help_description(&self) -> Option<&str> {
        self.help_description.as_deref()
    }

    pub(crate) fn help_response(&self) -> Option<Response> {
        self.help_synopsis
            .as_deref()
            .map(|synopsis| Response::help(synopsis, self.help_description.as_deref()))
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Path")
            .field("pattern", &self.pattern)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .field("operations", &self.operations.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Path prefixes requiring special treatment by outer layers (root-only or
/// unauthenticated access). Entries are exact matches, or prefix matches
/// when suffixed with `*`. These are not regular expressions.
#[derive(Debug, Clone, Default)]
pub struct SpecialPaths {
    /// Paths requiring root privileges.
    pub root: Vec<String>,
    /// Paths reachable without authentication.
    pub unauthenticated: Vec<String>,
}

impl SpecialPaths {
    /// True when `path` matches an entry in the root list.
    pub fn is_root(&self, path: &str) -> bool {
        Self::matches(&self.root, path)
    }

    /// True when `path` matches an entry in the unauthenticated list.
    pub fn is_unauthenticated(&self, path: &str) -> bool {
        Self::matches(&self.unauthenticated, path)
    }

    fn matches(entries: &[String], path: &str) -> bool {
        entries.iter().any(|entry| match entry.strip_suffix('*') {
            Some(prefix) => path.starts_with(prefix),
            None => path == entry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldType;

    #[test]
    fn test_path_builder() {
        let path = Path::new("roles/(?P<role>.+)")
            .field("role", FieldSchema::new(FieldType::String))
            .field("port", FieldSchema::new(FieldType::Int).with_default(22))
            .operation(Operation::Read, |_req, _data| Ok(None))
            .help("Manage roles.", Some("Long description.".to_string()));

        assert_eq!(path.pattern(), "roles/(?P<role>.+)");
        assert_eq!(path.fields().len(), 2);
        assert!(path.handler(&Operation::Read).is_some());
        assert!(path.handler(&Operation::Write).is_none());
        assert_eq!(path.help_synopsis(), Some("Manage roles."));
    }

    #[test]
    fn test_help_response_synthesis() {
        let path = Path::new("roles/?").help("Synopsis.", None);
        let resp = path.help_response().unwrap();
        assert_eq!(resp.data.get("help").and_then(|v| v.as_str()), Some("Synopsis."));

        let without_help = Path::new("roles/?");
        assert!(without_help.help_response().is_none());
    }

    #[test]
    fn test_special_paths_exact_and_prefix() {
        let special = SpecialPaths {
            root: vec!["config".to_string(), "keys/*".to_string()],
            unauthenticated: vec!["login".to_string()],
        };

        assert!(special.is_root("config"));
        assert!(!special.is_root("config/extra"));
        assert!(special.is_root("keys/web"));
        assert!(special.is_root("keys/"));
        assert!(!special.is_root("key"));

        assert!(special.is_unauthenticated("login"));
        assert!(!special.is_unauthenticated("logout"));
    }
}

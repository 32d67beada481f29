//! Response types and the response-error convention.

use serde_json::{Map, Value};

/// A successful response carrying a data mapping.
///
/// A handler returning `Ok(None)` signals a pure side-effect success with no
/// response body; `Ok(Some(response))` carries data. User-facing validation
/// failures are expressed as [`Response::error`] values — ordinary responses
/// whose data carries an `"error"` key — and never as `Err`, so malformed
/// domain input cannot abort the dispatch pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    /// Response payload.
    pub data: Map<String, Value>,
}

impl Response {
    /// Create a response from a data mapping.
    pub fn new(data: Map<String, Value>) -> Self {
        Self { data }
    }

    /// Create a response-error: a client-correctable validation failure.
    pub fn error<S: Into<String>>(message: S) -> Self {
        let mut data = Map::new();
        data.insert("error".to_string(), Value::String(message.into()));
        Self { data }
    }

    /// Synthesize a help response from a path's registered help text.
    pub(crate) fn help(synopsis: &str, description: Option<&str>) -> Self {
        let mut data = Map::new();
        data.insert("help".to_string(), Value::String(synopsis.to_string()));
        if let Some(description) = description {
            data.insert("description".to_string(), Value::String(description.to_string()));
        }
        Self { data }
    }

    /// True when this is a response-error.
    pub fn is_error(&self) -> bool {
        self.data.contains_key("error")
    }

    /// The response-error message, if this is a response-error.
    pub fn error_message(&self) -> Option<&str> {
        self.data.get("error").and_then(Value::as_str)
    }
}

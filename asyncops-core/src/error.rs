//! Error types for registration, invocation, and emission

use serde_json::{json, Value};

/// Message carried by the not-registered failure payload.
pub const NOT_REGISTERED_MESSAGE: &str = "ASYNC_OPERATION_NOT_REGISTERED";

/// Kind tag of the not-registered failure payload.
pub const NOT_REGISTERED_KIND: &str = "OperationNotRegistered";

/// Kind tag of the panicked failure payload.
pub const PANICKED_KIND: &str = "OperationPanicked";

/// A registration was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidRegistration {
    #[error("unable to register: no operation name has been provided")]
    EmptyName,
    #[error("unable to register: no operation has been provided for: {name}")]
    MissingImplementation { name: String },
}

/// Outcome of invoking an operation other than success.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OperationError {
    /// No implementation (real or mock) is registered under the name.
    #[error("operation not registered: {name}")]
    NotRegistered { name: String },
    /// The implementation returned an error; the value is kept verbatim.
    #[error("operation failed: {0}")]
    Failed(Value),
    /// The implementation panicked.
    #[error("operation {name} panicked: {message}")]
    Panicked { name: String, message: String },
}

impl OperationError {
    /// Value placed in a failure action's `error` field.
    pub fn into_payload(self) -> Value {
        match self {
            OperationError::Failed(value) => value,
            OperationError::NotRegistered { name } => json!({
                "kind": NOT_REGISTERED_KIND,
                "message": NOT_REGISTERED_MESSAGE,
                "name": name,
            }),
            OperationError::Panicked { name, message } => json!({
                "kind": PANICKED_KIND,
                "message": message,
                "name": name,
            }),
        }
    }

    pub fn is_not_registered(&self) -> bool {
        matches!(self, OperationError::NotRegistered { .. })
    }
}

/// Kind tag of a failure payload produced by this crate, if any.
///
/// Implementation errors are passed through untouched and only report a kind
/// if they happen to carry a string `kind` field themselves.
pub fn error_kind(payload: &Value) -> Option<&str> {
    payload.get("kind").and_then(Value::as_str)
}

/// An emitted action could not be delivered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmitError {
    #[error("action channel closed")]
    ChannelClosed,
    #[error("action rejected: {0}")]
    Rejected(String),
}

//! Action traits and the operation action record

use std::fmt::Debug;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action_types::{operation_name, phase_of, Phase};

/// Marker trait for actions that can be dispatched to the store
///
/// Actions represent intents to change state. They should be:
/// - Clone: Actions may be logged, replayed, or sent to multiple handlers
/// - Debug: For debugging and logging
/// - Send + 'static: For async dispatch across threads
pub trait Action: Clone + Debug + Send + 'static {
    /// Get the action type for logging and filtering
    fn action_type(&self) -> &str;
}

/// One-line representation of an action for tracing output and the action log.
///
/// The default uses the `Debug` output.
pub trait ActionSummary: Action {
    fn summary(&self) -> String {
        format!("{:?}", self)
    }
}

/// A plain action record flowing through the store.
///
/// Field names are part of the wire format shared with other consumers of
/// the action stream: `type`, `name`, `channel`, `args`, `isMock`,
/// `response`, `error`.
///
/// # Example
///
/// ```
/// use asyncops_core::OpAction;
/// use serde_json::json;
///
/// let action = OpAction::new("OPERATION/fetchUser")
///     .with_name("fetchUser")
///     .with_channel("42")
///     .with_args(vec![json!(42)]);
///
/// assert_eq!(action.reducer_key(), "fetchUser__42");
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpAction {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_mock: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl OpAction {
    /// Create an action of the given type with no other fields.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    pub fn with_response(mut self, response: Value) -> Self {
        self.response = Some(response);
        self
    }

    pub fn with_error(mut self, error: Value) -> Self {
        self.error = Some(error);
        self
    }

    /// Lifecycle phase of this action, if its type belongs to the protocol.
    pub fn phase(&self) -> Option<Phase> {
        phase_of(&self.kind)
    }

    /// Operation name of this action.
    ///
    /// Prefers the `name` field and falls back to the name encoded in a
    /// named action type.
    pub fn operation(&self) -> Option<&str> {
        self.name
            .as_deref()
            .or_else(|| operation_name(&self.kind))
    }

    /// Status key this action addresses in the status map.
    pub fn reducer_key(&self) -> String {
        crate::reducer::reducer_key(self.operation().unwrap_or_default(), self.channel.as_deref())
    }

    /// Serialize to a JSON value.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Parse an action record from a JSON value.
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }
}

impl Action for OpAction {
    fn action_type(&self) -> &str {
        &self.kind
    }
}

impl ActionSummary for OpAction {
    fn summary(&self) -> String {
        let mut out = self.kind.clone();
        if let Some(channel) = self.channel.as_deref().filter(|c| !c.is_empty()) {
            out.push_str(&format!(" [{channel}]"));
        }
        if !self.args.is_empty() {
            out.push_str(&format!(" args={}", self.args.len()));
        }
        if self.response.is_some() {
            out.push_str(" ok");
        }
        if self.error.is_some() {
            out.push_str(" err");
        }
        if self.is_mock == Some(true) {
            out.push_str(" (mock)");
        }
        out
    }
}

//! Action creators bound to a registered operation

use std::fmt;

use serde_json::Value;

use crate::action::OpAction;
use crate::action_types::ActionTypes;
use crate::reducer::{OpStatus, StatusMap};
use crate::selectors::{status, StatusSelector};

/// Handle returned by [`Registry::register_operation`].
///
/// Carries the operation's three action types, builds start actions, and
/// reads the operation's status.
///
/// ```
/// use asyncops_core::{OperationHandle, StatusMap};
/// use serde_json::json;
///
/// let fetch_user = OperationHandle::new("fetchUser");
/// assert_eq!(fetch_user.operation_type(), "OPERATION/fetchUser");
/// assert_eq!(fetch_user.to_string(), "fetchUser");
///
/// let action = fetch_user.action(vec![json!(42)]);
/// assert_eq!(action.kind, "OPERATION/fetchUser");
/// assert_eq!(action.name.as_deref(), Some("fetchUser"));
///
/// assert!(!fetch_user.status(&StatusMap::new()).loading);
/// ```
///
/// [`Registry::register_operation`]: crate::registry::Registry::register_operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationHandle {
    name: String,
    types: ActionTypes,
}

impl OperationHandle {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let types = ActionTypes::for_operation(&name);
        Self { name, types }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn types(&self) -> &ActionTypes {
        &self.types
    }

    /// `OPERATION/<name>`
    pub fn operation_type(&self) -> &str {
        &self.types.operation
    }

    /// `COMPLETE/<name>`
    pub fn complete_type(&self) -> &str {
        &self.types.complete
    }

    /// `FAILURE/<name>`
    pub fn failure_type(&self) -> &str {
        &self.types.failure
    }

    /// Start action with positional arguments.
    pub fn action(&self, args: Vec<Value>) -> OpAction {
        OpAction::new(self.types.operation.clone())
            .with_name(self.name.clone())
            .with_args(args)
    }

    /// Start action tracked under a channel.
    pub fn action_on(&self, channel: impl Into<String>, args: Vec<Value>) -> OpAction {
        self.action(args).with_channel(channel)
    }

    pub fn status(&self, map: &StatusMap) -> OpStatus {
        status(map, &self.name, None)
    }

    pub fn status_on(&self, map: &StatusMap, channel: &str) -> OpStatus {
        status(map, &self.name, Some(channel))
    }

    pub fn selector(&self) -> StatusSelector {
        StatusSelector::new(self.name.clone())
    }
}

impl fmt::Display for OperationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

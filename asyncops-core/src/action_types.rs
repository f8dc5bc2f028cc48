//! Action type encoding for operation lifecycles
//!
//! Every operation name maps to three action types, one per lifecycle phase:
//!
//! | Phase       | Type                |
//! |-------------|---------------------|
//! | start       | `OPERATION/<name>`  |
//! | success     | `COMPLETE/<name>`   |
//! | failure     | `FAILURE/<name>`    |
//!
//! The bare root tokens (`OPERATION`, `COMPLETE`, `FAILURE`) form a separate
//! generic representation where the operation name travels only in the
//! action's `name` field. Generic types are never "named": the classifiers in
//! this module reject them and [`generic_phase`] recognizes them.
//!
//! # Example
//!
//! ```
//! use asyncops_core::action_types::{classify, operation_name, ActionTypes, Phase};
//!
//! let types = ActionTypes::for_operation("fetchUser");
//! assert_eq!(types.operation, "OPERATION/fetchUser");
//!
//! assert_eq!(classify("FAILURE/fetchUser"), Some((Phase::Failure, "fetchUser")));
//! assert_eq!(operation_name("COMPLETE/fetchUser"), Some("fetchUser"));
//! assert_eq!(operation_name("OPERATION"), None);
//! ```

use std::fmt;

/// Root token of start actions.
pub const OPERATION: &str = "OPERATION";
/// Root token of success actions.
pub const COMPLETE: &str = "COMPLETE";
/// Root token of failure actions.
pub const FAILURE: &str = "FAILURE";

const SEPARATOR: char = '/';

/// Lifecycle phase encoded by an action type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// An operation was requested.
    Operation,
    /// An operation resolved successfully.
    Complete,
    /// An operation failed.
    Failure,
}

impl Phase {
    /// Root token for this phase.
    pub const fn root(self) -> &'static str {
        match self {
            Phase::Operation => OPERATION,
            Phase::Complete => COMPLETE,
            Phase::Failure => FAILURE,
        }
    }

    /// Whether this phase ends an operation.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Phase::Complete | Phase::Failure)
    }

    fn from_root(root: &str) -> Option<Self> {
        match root {
            OPERATION => Some(Phase::Operation),
            COMPLETE => Some(Phase::Complete),
            FAILURE => Some(Phase::Failure),
            _ => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.root())
    }
}

/// The three action types belonging to one operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionTypes {
    pub operation: String,
    pub complete: String,
    pub failure: String,
}

impl ActionTypes {
    /// Named types for an operation (`OPERATION/<name>` and friends).
    pub fn for_operation(name: &str) -> Self {
        Self {
            operation: encode(Phase::Operation, name),
            complete: encode(Phase::Complete, name),
            failure: encode(Phase::Failure, name),
        }
    }

    /// The bare generic tokens.
    pub fn generic() -> Self {
        Self {
            operation: OPERATION.to_string(),
            complete: COMPLETE.to_string(),
            failure: FAILURE.to_string(),
        }
    }

    /// Type for the given phase.
    pub fn get(&self, phase: Phase) -> &str {
        match phase {
            Phase::Operation => &self.operation,
            Phase::Complete => &self.complete,
            Phase::Failure => &self.failure,
        }
    }

    /// Terminal types answering a start action type.
    ///
    /// A generic start is answered with the generic tokens, a named start
    /// with the named types of the same operation. Returns `None` for any
    /// type that is not a start type.
    pub fn answering(start_type: &str) -> Option<Self> {
        if start_type == OPERATION {
            return Some(Self::generic());
        }
        match classify(start_type) {
            Some((Phase::Operation, name)) => Some(Self::for_operation(name)),
            _ => None,
        }
    }
}

/// Encode `<root>/<name>` for a phase.
pub fn encode(phase: Phase, name: &str) -> String {
    format!("{}{}{}", phase.root(), SEPARATOR, name)
}

/// `[start, success, failure]` types for an operation name.
pub fn action_types(name: &str) -> [String; 3] {
    let ActionTypes {
        operation,
        complete,
        failure,
    } = ActionTypes::for_operation(name);
    [operation, complete, failure]
}

/// Split a named action type into its phase and operation name.
///
/// Accepts exactly `<root>/<rest>` where `<root>` is one of the three root
/// tokens at the very start and `<rest>` is one or more non-whitespace
/// characters. Everything else, including the bare roots, yields `None`.
pub fn classify(action_type: &str) -> Option<(Phase, &str)> {
    let (root, rest) = action_type.split_once(SEPARATOR)?;
    let phase = Phase::from_root(root)?;
    if rest.is_empty() || rest.chars().any(char::is_whitespace) {
        return None;
    }
    Some((phase, rest))
}

/// Phase of a bare generic token.
pub fn generic_phase(action_type: &str) -> Option<Phase> {
    Phase::from_root(action_type)
}

/// Phase of either representation: generic token first, then named shape.
pub fn phase_of(action_type: &str) -> Option<Phase> {
    generic_phase(action_type).or_else(|| classify(action_type).map(|(phase, _)| phase))
}

/// Whether the type is a named start type.
pub fn is_operation(action_type: &str) -> bool {
    matches!(classify(action_type), Some((Phase::Operation, _)))
}

/// Whether the type is a named success type.
pub fn is_completion(action_type: &str) -> bool {
    matches!(classify(action_type), Some((Phase::Complete, _)))
}

/// Whether the type is a named failure type.
pub fn is_failure(action_type: &str) -> bool {
    matches!(classify(action_type), Some((Phase::Failure, _)))
}

/// Operation name encoded in a named type, for any of the three phases.
pub fn operation_name(action_type: &str) -> Option<&str> {
    classify(action_type).map(|(_, name)| name)
}

//! Status map and the operation status reducer
//!
//! The status map holds one [`OpStatus`] per operation instance key. A key is
//! present while its operation is in flight or after it most recently failed,
//! and absent before the first start and after a successful completion.
//!
//! | Action phase | Effect on `key(action)`                     |
//! |--------------|---------------------------------------------|
//! | start        | `{ loading: true, error: null }`            |
//! | failure      | `{ loading: false, error: action.error }`   |
//! | success      | removed                                     |
//! | other        | map returned unchanged                      |

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action::OpAction;
use crate::action_types::Phase;

/// Name of the host state slice holding the status map.
pub const STORE_DOMAIN: &str = "asyncops";

const CHANNEL_SEPARATOR: &str = "__";

/// Status of one operation instance.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OpStatus {
    pub loading: bool,
    pub error: Option<Value>,
}

impl OpStatus {
    /// Status of an in-flight operation.
    pub fn loading() -> Self {
        Self {
            loading: true,
            error: None,
        }
    }

    /// Status of a failed operation.
    pub fn failed(error: Option<Value>) -> Self {
        Self {
            loading: false,
            error,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn has_error(&self) -> bool {
        self.error.as_ref().is_some_and(|e| !e.is_null())
    }
}

/// Status key for an operation name and optional channel.
///
/// An empty channel counts as absent.
///
/// ```
/// use asyncops_core::reducer_key;
///
/// assert_eq!(reducer_key("fetchUser", None), "fetchUser");
/// assert_eq!(reducer_key("fetchUser", Some("42")), "fetchUser__42");
/// ```
pub fn reducer_key(name: &str, channel: Option<&str>) -> String {
    match channel {
        Some(channel) if !channel.is_empty() => format!("{name}{CHANNEL_SEPARATOR}{channel}"),
        _ => name.to_string(),
    }
}

/// Immutable map from status key to [`OpStatus`].
///
/// Cloning is cheap; reductions that change nothing share storage with their
/// input (see [`StatusMap::ptr_eq`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusMap {
    entries: Arc<BTreeMap<String, OpStatus>>,
}

impl StatusMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry stored under a status key.
    pub fn get(&self, key: &str) -> Option<&OpStatus> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ordered by key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OpStatus)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries currently loading.
    pub fn loading_count(&self) -> usize {
        self.entries.values().filter(|s| s.loading).count()
    }

    /// Whether both maps share the same storage.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }

    fn with_entry(&self, key: String, status: OpStatus) -> Self {
        let mut entries = (*self.entries).clone();
        entries.insert(key, status);
        Self {
            entries: Arc::new(entries),
        }
    }

    fn without_entry(&self, key: &str) -> Self {
        let mut entries = (*self.entries).clone();
        entries.remove(key);
        Self {
            entries: Arc::new(entries),
        }
    }
}

impl FromIterator<(String, OpStatus)> for StatusMap {
    fn from_iter<I: IntoIterator<Item = (String, OpStatus)>>(iter: I) -> Self {
        Self {
            entries: Arc::new(iter.into_iter().collect()),
        }
    }
}

/// Host state that carries a status map slice.
pub trait StatusSlice {
    fn status_map(&self) -> &StatusMap;
}

impl StatusSlice for StatusMap {
    fn status_map(&self) -> &StatusMap {
        self
    }
}

/// Fold one action into a status map.
///
/// Never mutates `state`. Actions outside the operation protocol return a
/// map sharing storage with `state`.
pub fn reduce(state: &StatusMap, action: &OpAction) -> StatusMap {
    match action.phase() {
        Some(Phase::Operation) => state.with_entry(action.reducer_key(), OpStatus::loading()),
        Some(Phase::Failure) => {
            state.with_entry(action.reducer_key(), OpStatus::failed(action.error.clone()))
        }
        Some(Phase::Complete) => state.without_entry(&action.reducer_key()),
        None => state.clone(),
    }
}

/// Store reducer form of [`reduce`].
///
/// Returns `true` if the map changed.
pub fn reducer(state: &mut StatusMap, action: OpAction) -> bool {
    let next = reduce(state, &action);
    let changed = !next.ptr_eq(state) && next != *state;
    *state = next;
    changed
}

//! Read access to operation status
//!
//! Missing keys read as the idle status `{ loading: false, error: null }`.

use crate::reducer::{reducer_key, OpStatus, StatusMap, StatusSlice};

/// Status of an operation (optionally on a channel), or idle if absent.
pub fn status(map: &StatusMap, name: &str, channel: Option<&str>) -> OpStatus {
    map.get(&reducer_key(name, channel))
        .cloned()
        .unwrap_or_default()
}

/// Whether an operation (optionally on a channel) is in flight.
pub fn is_loading(map: &StatusMap, name: &str, channel: Option<&str>) -> bool {
    map.get(&reducer_key(name, channel))
        .is_some_and(|s| s.loading)
}

/// Status reader bound to one operation name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSelector {
    name: String,
}

impl StatusSelector {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read the un-channeled status from any state carrying a status slice.
    pub fn select<S: StatusSlice + ?Sized>(&self, state: &S) -> OpStatus {
        status(state.status_map(), &self.name, None)
    }

    /// Read the status of one channel.
    pub fn select_channel<S: StatusSlice + ?Sized>(&self, state: &S, channel: &str) -> OpStatus {
        status(state.status_map(), &self.name, Some(channel))
    }
}

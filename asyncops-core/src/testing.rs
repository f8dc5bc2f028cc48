//! Test utilities for code built on asyncops
//!
//! - [`TestHarness`]: a registry, a status map, and a dispatcher wired to a
//!   channel the test can drain
//! - Assertion macros for verifying emitted actions
//! - With the `testing-time` feature, wrappers around tokio's paused clock
//!
//! # Example
//!
//! ```
//! use asyncops_core::testing::TestHarness;
//! use asyncops_core::{assert_phase_emitted, operation, OpAction, Phase};
//! use serde_json::json;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let mut harness = TestHarness::new();
//! harness
//!     .registry()
//!     .register("save", operation(|_| async { Err(json!("offline")) }), None)
//!     .unwrap();
//!
//! harness.dispatch(OpAction::new("OPERATION/save"));
//! let emitted = harness.settle().await;
//!
//! assert_phase_emitted!(emitted, Phase::Failure, "save");
//! assert_eq!(harness.state.get("save").unwrap().error, Some(json!("offline")));
//! # });
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::action::OpAction;
use crate::dispatcher::Dispatcher;
use crate::reducer::{reduce, StatusMap};
use crate::registry::Registry;

/// Harness for exercising operations without a full runtime.
///
/// `dispatch` folds an action into `state` and hands it to the dispatcher;
/// terminal actions land in a channel until drained. `settle` waits for
/// every operation and folds what they emitted.
pub struct TestHarness {
    /// Status map under test
    pub state: StatusMap,
    registry: Arc<Registry>,
    dispatcher: Dispatcher,
    tx: mpsc::UnboundedSender<OpAction>,
    rx: mpsc::UnboundedReceiver<OpAction>,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    /// Harness with an empty registry.
    pub fn new() -> Self {
        Self::with_registry(Arc::new(Registry::new()))
    }

    pub fn with_registry(registry: Arc<Registry>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            state: StatusMap::new(),
            dispatcher: Dispatcher::new(registry.clone(), tx.clone()),
            registry,
            tx,
            rx,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Sender feeding the emitted-action channel.
    pub fn sender(&self) -> mpsc::UnboundedSender<OpAction> {
        self.tx.clone()
    }

    /// Put an action on the emitted channel directly.
    pub fn emit(&self, action: OpAction) {
        let _ = self.tx.send(action);
    }

    /// Fold an action into `state` and run its operation if it is a start
    /// action. Returns whether an operation was spawned.
    pub fn dispatch(&mut self, action: OpAction) -> bool {
        self.state = reduce(&self.state, &action);
        self.dispatcher.observe(&action)
    }

    /// Fold an action into `state` without dispatching.
    pub fn apply(&mut self, action: &OpAction) {
        self.state = reduce(&self.state, action);
    }

    /// Drain all emitted actions without folding them.
    pub fn drain_emitted(&mut self) -> Vec<OpAction> {
        let mut actions = Vec::new();
        while let Ok(action) = self.rx.try_recv() {
            actions.push(action);
        }
        actions
    }

    /// Wait for the next emitted action, up to `timeout`.
    pub async fn next_emitted(&mut self, timeout: Duration) -> Option<OpAction> {
        tokio::time::timeout(timeout, self.rx.recv())
            .await
            .ok()
            .flatten()
    }

    /// Wait for every running operation, then drain and fold what they
    /// emitted, in arrival order.
    pub async fn settle(&mut self) -> Vec<OpAction> {
        self.dispatcher.wait_idle().await;
        let emitted = self.drain_emitted();
        for action in &emitted {
            self.apply(action);
        }
        emitted
    }

    pub fn in_flight(&self) -> usize {
        self.dispatcher.in_flight()
    }

    /// Check if any actions were emitted (drains them).
    pub fn has_emitted(&mut self) -> bool {
        !self.drain_emitted().is_empty()
    }
}

/// Pause tokio's clock for the current runtime.
#[cfg(feature = "testing-time")]
pub fn pause_time() {
    tokio::time::pause();
}

/// Resume tokio's clock.
#[cfg(feature = "testing-time")]
pub fn resume_time() {
    tokio::time::resume();
}

/// Advance the paused clock, waking timers that expire along the way.
#[cfg(feature = "testing-time")]
pub async fn advance_time(duration: Duration) {
    tokio::time::advance(duration).await;
}

/// Assert that an action matching a pattern was emitted.
///
/// # Example
///
/// ```ignore
/// let actions = harness.drain_emitted();
/// assert_emitted!(actions, OpAction { kind, .. } if kind == "COMPLETE/load");
/// ```
#[macro_export]
macro_rules! assert_emitted {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        assert!(
            $actions.iter().any(|a| matches!(a, $pattern $(if $guard)?)),
            "Expected action matching `{}` to be emitted, but got: {:?}",
            stringify!($pattern),
            $actions
        );
    };
}

/// Assert that no action matching a pattern was emitted.
#[macro_export]
macro_rules! assert_not_emitted {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        assert!(
            !$actions.iter().any(|a| matches!(a, $pattern $(if $guard)?)),
            "Expected action matching `{}` NOT to be emitted, but it was: {:?}",
            stringify!($pattern),
            $actions
        );
    };
}

/// First action matching a pattern.
///
/// ```ignore
/// if let Some(OpAction { response: Some(r), .. }) = find_emitted!(actions, OpAction { response: Some(_), .. }) {
///     assert_eq!(r, &json!(42));
/// }
/// ```
#[macro_export]
macro_rules! find_emitted {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        $actions.iter().find(|a| matches!(a, $pattern $(if $guard)?))
    };
}

/// Count actions matching a pattern.
#[macro_export]
macro_rules! count_emitted {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        $actions.iter().filter(|a| matches!(a, $pattern $(if $guard)?)).count()
    };
}

/// Count actions in a lifecycle phase.
///
/// ```ignore
/// assert_eq!(count_phase!(actions, Phase::Failure), 1);
/// ```
#[macro_export]
macro_rules! count_phase {
    ($actions:expr, $phase:expr) => {
        $actions
            .iter()
            .filter(|a| a.phase() == Some($phase))
            .count()
    };
}

/// Assert that an action of a phase was emitted, optionally for one
/// operation name.
#[macro_export]
macro_rules! assert_phase_emitted {
    ($actions:expr, $phase:expr) => {
        assert!(
            $actions.iter().any(|a| a.phase() == Some($phase)),
            "Expected a {} action to be emitted, but got: {:?}",
            $phase,
            $actions
        );
    };
    ($actions:expr, $phase:expr, $name:expr) => {
        assert!(
            $actions
                .iter()
                .any(|a| a.phase() == Some($phase) && a.operation() == Some($name)),
            "Expected a {} action for `{}` to be emitted, but got: {:?}",
            $phase,
            $name,
            $actions
        );
    };
}

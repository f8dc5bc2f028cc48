//! Runtime helper that hosts the operation protocol.
//!
//! [`OpsRuntime`] wires a store, the action logger, and the [`Dispatcher`]
//! around one unbounded action channel: actions are folded by the reducer,
//! start actions are picked up by the dispatcher after the fold, and the
//! terminal actions it emits come back through the same channel.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use asyncops_core::{operation, OpsRuntime, Registry};
//! use serde_json::json;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let registry = Arc::new(Registry::new());
//! let load = registry
//!     .register_operation("load", operation(|_| async { Ok(json!("ok")) }), None)
//!     .unwrap();
//!
//! let mut runtime = OpsRuntime::new(registry);
//! runtime.dispatch(load.action(vec![]));
//! assert!(load.status(runtime.state()).loading);
//!
//! runtime.settle().await;
//! assert!(runtime.state().is_empty());
//! # });
//! ```

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::action::OpAction;
use crate::debug::{ActionLog, ActionLogConfig, ActionLoggerMiddleware};
use crate::dispatcher::Dispatcher;
use crate::reducer::{reducer, StatusMap};
use crate::registry::Registry;
use crate::store::{Middleware, Reducer, StoreWithMiddleware};

/// Configuration for an [`OpsRuntime`].
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    /// Keep an in-memory log of recent actions.
    pub action_log: Option<ActionLogConfig>,
    /// Trace every action at debug level.
    pub log_actions: bool,
    /// Start with mock mode enabled on the registry.
    pub mock: bool,
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_action_log(mut self, config: ActionLogConfig) -> Self {
        self.action_log = Some(config);
        self
    }

    pub fn log_actions(mut self, enabled: bool) -> Self {
        self.log_actions = enabled;
        self
    }

    pub fn mock(mut self, enabled: bool) -> Self {
        self.mock = enabled;
        self
    }

    fn logger(&self) -> Option<ActionLoggerMiddleware> {
        match (&self.action_log, self.log_actions) {
            (Some(config), _) => Some(ActionLoggerMiddleware::with_log(config.clone())),
            (None, true) => Some(ActionLoggerMiddleware::log_all()),
            (None, false) => None,
        }
    }
}

/// Middleware stack of an [`OpsRuntime`]: the optional logger, then the
/// dispatcher.
#[derive(Debug)]
pub struct RuntimeMiddleware {
    logger: Option<ActionLoggerMiddleware>,
    dispatcher: Dispatcher,
}

impl RuntimeMiddleware {
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn logger(&self) -> Option<&ActionLoggerMiddleware> {
        self.logger.as_ref()
    }
}

impl Middleware<OpAction> for RuntimeMiddleware {
    fn before(&mut self, action: &OpAction) {
        if let Some(logger) = self.logger.as_mut() {
            logger.before(action);
        }
    }

    fn after(&mut self, action: &OpAction, state_changed: bool) {
        if let Some(logger) = self.logger.as_mut() {
            logger.after(action, state_changed);
        }
        self.dispatcher.after(action, state_changed);
    }
}

/// Store, dispatcher, and action channel in one place.
///
/// Must be driven from within a tokio runtime.
pub struct OpsRuntime<S = StatusMap> {
    store: StoreWithMiddleware<S, OpAction, RuntimeMiddleware>,
    action_tx: mpsc::UnboundedSender<OpAction>,
    action_rx: mpsc::UnboundedReceiver<OpAction>,
    registry: Arc<Registry>,
}

impl OpsRuntime<StatusMap> {
    /// Runtime whose state is the bare status map.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self::with_state(registry, StatusMap::new(), reducer)
    }
}

impl<S> OpsRuntime<S> {
    /// Runtime over host state with its own reducer.
    ///
    /// The reducer is expected to fold operation actions into the host's
    /// status slice with [`reduce`](crate::reducer::reduce).
    pub fn with_state(registry: Arc<Registry>, state: S, reducer: Reducer<S, OpAction>) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let middleware = RuntimeMiddleware {
            logger: None,
            dispatcher: Dispatcher::new(registry.clone(), action_tx.clone()),
        };

        Self {
            store: StoreWithMiddleware::new(state, reducer, middleware),
            action_tx,
            action_rx,
            registry,
        }
    }

    /// Apply a [`RuntimeConfig`].
    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.store.middleware_mut().logger = config.logger();
        if config.mock {
            self.registry.enable_mock();
        }
        self
    }

    /// Send an action into the runtime queue.
    pub fn enqueue(&self, action: OpAction) {
        let _ = self.action_tx.send(action);
    }

    /// Clone the action sender.
    pub fn action_tx(&self) -> mpsc::UnboundedSender<OpAction> {
        self.action_tx.clone()
    }

    /// Fold an action now and start its operation if it is a start action.
    ///
    /// Returns `true` if the state changed.
    pub fn dispatch(&mut self, action: OpAction) -> bool {
        self.store.dispatch(action)
    }

    /// Process queued actions until no operation is in flight and the queue
    /// is empty.
    ///
    /// Never returns while an operation is still pending.
    pub async fn settle(&mut self) {
        loop {
            while let Ok(action) = self.action_rx.try_recv() {
                self.store.dispatch(action);
            }

            let tracker = self.store.middleware().dispatcher().tracker().clone();
            if tracker.is_empty() && self.action_rx.is_empty() {
                break;
            }

            tracker.close();
            let next = tokio::select! {
                action = self.action_rx.recv() => action,
                _ = tracker.wait() => None,
            };
            tracker.reopen();

            if let Some(action) = next {
                self.store.dispatch(action);
            }
        }
    }

    /// Process actions until `cancel` fires.
    ///
    /// Operations still in flight keep running; their terminal actions stay
    /// queued for a later `settle` or `run`.
    pub async fn run(&mut self, cancel: CancellationToken) {
        tracing::debug!("Runtime started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                Some(action) = self.action_rx.recv() => {
                    self.store.dispatch(action);
                }
            }
        }
        tracing::debug!(in_flight = self.in_flight(), "Runtime stopped");
    }

    /// Number of operations still running.
    pub fn in_flight(&self) -> usize {
        self.store.middleware().dispatcher().in_flight()
    }

    pub fn state(&self) -> &S {
        self.store.state()
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        self.store.middleware().dispatcher()
    }

    /// Recent actions, if the action log is enabled.
    pub fn action_log(&self) -> Option<&ActionLog> {
        self.store.middleware().logger().and_then(|logger| logger.log())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug::ActionLoggerConfig;
    use crate::error::{error_kind, NOT_REGISTERED_KIND};
    use crate::reducer::{reduce, StatusSlice};
    use crate::registry::operation;
    use serde_json::json;
    use std::time::Duration;

    fn registry() -> Arc<Registry> {
        let registry = Arc::new(Registry::new());
        registry
            .register(
                "load",
                operation(|args| async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Ok(json!({"args": args}))
                }),
                Some(operation(|_| async { Ok(json!("mocked")) })),
            )
            .unwrap();
        registry
            .register("reject", operation(|_| async { Err(json!("nope")) }), None)
            .unwrap();
        registry
    }

    #[tokio::test]
    async fn test_success_clears_status() {
        let mut runtime = OpsRuntime::new(registry());

        assert!(runtime.dispatch(OpAction::new("OPERATION/load").with_channel("1")));
        assert!(runtime.state().get("load__1").unwrap().loading);
        assert_eq!(runtime.in_flight(), 1);

        runtime.settle().await;
        assert!(runtime.state().is_empty());
        assert_eq!(runtime.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_failure_and_unregistered_recorded() {
        let mut runtime = OpsRuntime::new(registry());

        runtime.enqueue(OpAction::new("OPERATION/reject"));
        runtime.enqueue(OpAction::new("OPERATION/ghost"));
        runtime.settle().await;

        let reject = runtime.state().get("reject").unwrap();
        assert!(!reject.loading);
        assert_eq!(reject.error, Some(json!("nope")));

        let ghost = runtime.state().get("ghost").unwrap();
        assert_eq!(
            error_kind(ghost.error.as_ref().unwrap()),
            Some(NOT_REGISTERED_KIND)
        );
    }

    #[tokio::test]
    async fn test_settle_with_nothing_to_do() {
        let mut runtime = OpsRuntime::new(registry());
        runtime.enqueue(OpAction::new("ROUTE_CHANGED"));
        runtime.settle().await;
        assert!(runtime.state().is_empty());
    }

    #[tokio::test]
    async fn test_config_mock_and_action_log() {
        let config = RuntimeConfig::new()
            .mock(true)
            .with_action_log(ActionLogConfig::new(
                20,
                ActionLoggerConfig::operations_only(),
            ));
        let mut runtime = OpsRuntime::new(registry()).with_config(config);
        assert!(runtime.registry().is_mock_enabled());

        runtime.enqueue(OpAction::new("NOISE"));
        runtime.enqueue(OpAction::new("OPERATION/load"));
        runtime.settle().await;

        let log = runtime.action_log().expect("action log enabled");
        let types: Vec<_> = log.entries().map(|e| e.action_type.as_str()).collect();
        assert_eq!(types, vec!["OPERATION/load", "COMPLETE/load"]);
        assert!(log.entries().all(|e| e.state_changed == Some(true)));
        assert!(log.entries().last().unwrap().summary.ends_with("(mock)"));
    }

    #[test]
    fn test_config_logger_selection() {
        assert!(RuntimeConfig::new().logger().is_none());
        assert!(RuntimeConfig::new()
            .log_actions(true)
            .logger()
            .is_some_and(|l| l.log().is_none()));
        assert!(RuntimeConfig::new()
            .with_action_log(ActionLogConfig::default())
            .logger()
            .is_some_and(|l| l.log().is_some()));
    }

    #[derive(Debug, Default)]
    struct HostState {
        route: String,
        ops: StatusMap,
    }

    impl StatusSlice for HostState {
        fn status_map(&self) -> &StatusMap {
            &self.ops
        }
    }

    fn host_reducer(state: &mut HostState, action: OpAction) -> bool {
        if action.kind == "NAVIGATE" {
            state.route = action.name.unwrap_or_default();
            return true;
        }
        let next = reduce(&state.ops, &action);
        let changed = !next.ptr_eq(&state.ops);
        state.ops = next;
        changed
    }

    #[tokio::test]
    async fn test_host_state_runtime() {
        let registry = registry();
        let mut runtime = OpsRuntime::with_state(registry, HostState::default(), host_reducer);

        runtime.dispatch(OpAction::new("NAVIGATE").with_name("home"));
        runtime.dispatch(OpAction::new("OPERATION/reject"));
        assert!(runtime.state().status_map().get("reject").unwrap().loading);

        runtime.settle().await;
        assert_eq!(runtime.state().route, "home");
        assert!(runtime.state().status_map().get("reject").unwrap().has_error());
    }

    #[tokio::test]
    async fn test_run_until_cancelled() {
        let mut runtime = OpsRuntime::new(registry());
        let tx = runtime.action_tx();
        let cancel = CancellationToken::new();

        let handle = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                runtime.run(cancel).await;
                runtime
            })
        };

        tx.send(OpAction::new("OPERATION/load")).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();

        let runtime = handle.await.unwrap();
        assert!(runtime.state().is_empty());
        assert_eq!(runtime.in_flight(), 0);
    }
}

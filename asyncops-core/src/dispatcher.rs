//! Dispatch process: runs operations for start actions
//!
//! For every start action it observes (generic `OPERATION` or a named
//! `OPERATION/<name>`), the [`Dispatcher`] looks up the implementation in the
//! [`Registry`], runs it on its own task, and emits exactly one terminal
//! action through its [`ActionSink`]:
//!
//! - `COMPLETE` / `COMPLETE/<name>` with `response` on success
//! - `FAILURE` / `FAILURE/<name>` with `error` on failure, on a missing
//!   registration, or when the implementation panics
//!
//! Terminal actions echo `name`, `channel`, and `args` of the start action and
//! carry `isMock`, the registry's mock flag at the time the start action was
//! observed. Start actions are never queued or deduplicated: two starts for
//! the same key run side by side, and whichever terminal action is reduced
//! last decides the key's final status.
//!
//! # Example
//!
//! ```ignore
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//! let dispatcher = Dispatcher::new(registry.clone(), tx);
//!
//! dispatcher.observe(&fetch_user.action(vec![json!(42)]));
//!
//! let terminal = rx.recv().await.unwrap();
//! assert_eq!(terminal.kind, "COMPLETE/fetchUser");
//! ```

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::action::OpAction;
use crate::action_types::ActionTypes;
use crate::error::{EmitError, OperationError};
use crate::registry::{Operation, Registry};
use crate::store::Middleware;

/// Destination of terminal actions.
pub trait ActionSink: Clone + Send + Sync + 'static {
    fn emit(&self, action: OpAction) -> Result<(), EmitError>;
}

impl ActionSink for mpsc::UnboundedSender<OpAction> {
    fn emit(&self, action: OpAction) -> Result<(), EmitError> {
        self.send(action).map_err(|_| EmitError::ChannelClosed)
    }
}

/// Runs registered operations for observed start actions.
///
/// Must be used from within a tokio runtime.
pub struct Dispatcher<K: ActionSink = mpsc::UnboundedSender<OpAction>> {
    registry: Arc<Registry>,
    sink: K,
    tracker: TaskTracker,
}

impl<K: ActionSink> std::fmt::Debug for Dispatcher<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("in_flight", &self.tracker.len())
            .finish()
    }
}

impl<K: ActionSink> Dispatcher<K> {
    pub fn new(registry: Arc<Registry>, sink: K) -> Self {
        Self {
            registry,
            sink,
            tracker: TaskTracker::new(),
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Tracker of operation tasks that have not finished yet.
    pub fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }

    /// Number of operations still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Wait until every operation dispatched so far has emitted its terminal
    /// action.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Handle one action from the stream.
    ///
    /// Spawns the operation and returns `true` if the action is a start
    /// action; any other action is ignored. The task is only reachable
    /// through [`tracker`](Self::tracker), so it cannot be aborted before
    /// its terminal action is emitted.
    pub fn observe(&self, action: &OpAction) -> bool {
        let Some(types) = ActionTypes::answering(&action.kind) else {
            return false;
        };
        let name = action.operation().unwrap_or_default().to_string();
        let is_mock = self.registry.is_mock_enabled();
        let implementation = self.registry.get(&name);

        tracing::debug!(
            operation = %name,
            channel = ?action.channel,
            mock = is_mock,
            "Dispatching operation"
        );

        let template = OpAction {
            kind: String::new(),
            name: Some(name.clone()),
            channel: action.channel.clone(),
            args: action.args.clone(),
            is_mock: Some(is_mock),
            response: None,
            error: None,
        };
        let sink = self.sink.clone();

        self.tracker.spawn(async move {
            let outcome = match implementation {
                Some(operation) => invoke(operation, &name, template.args.clone()).await,
                None => {
                    tracing::warn!(operation = %name, "Operation not registered");
                    Err(OperationError::NotRegistered { name: name.clone() })
                }
            };

            let terminal = match outcome {
                Ok(response) => {
                    tracing::debug!(operation = %name, "Operation completed");
                    OpAction {
                        kind: types.complete,
                        response: Some(response),
                        ..template
                    }
                }
                Err(err) => {
                    tracing::debug!(operation = %name, error = %err, "Operation failed");
                    OpAction {
                        kind: types.failure,
                        error: Some(err.into_payload()),
                        ..template
                    }
                }
            };

            emit(&sink, terminal);
        });
        true
    }

    /// Observe every action of a stream until it ends or `cancel` fires.
    ///
    /// Operations already spawned keep running after the listener stops.
    pub async fn listen<St>(&self, stream: St, cancel: CancellationToken)
    where
        St: Stream<Item = OpAction>,
    {
        let mut stream = std::pin::pin!(stream);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                next = stream.next() => match next {
                    Some(action) => {
                        self.observe(&action);
                    }
                    None => break,
                },
            }
        }
    }
}

impl<K: ActionSink> Middleware<OpAction> for Dispatcher<K> {
    fn before(&mut self, _action: &OpAction) {}

    fn after(&mut self, action: &OpAction, _state_changed: bool) {
        self.observe(action);
    }
}

/// Run the implementation on its own task so a panic becomes a failure.
async fn invoke(operation: Operation, name: &str, args: Vec<Value>) -> Result<Value, OperationError> {
    match tokio::spawn(async move { operation(args).await }).await {
        Ok(result) => result.map_err(OperationError::Failed),
        Err(err) => {
            let message = join_error_message(err);
            tracing::warn!(operation = %name, %message, "Operation panicked");
            Err(OperationError::Panicked {
                name: name.to_string(),
                message,
            })
        }
    }
}

/// Emission failures are logged and dropped.
fn emit<K: ActionSink>(sink: &K, action: OpAction) {
    let kind = action.kind.clone();
    match catch_unwind(AssertUnwindSafe(|| sink.emit(action))) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            tracing::warn!(action = %kind, error = %err, "Dropped terminal action");
        }
        Err(panic) => {
            tracing::warn!(
                action = %kind,
                panic = %panic_message(panic.as_ref()),
                "Terminal action emission panicked"
            );
        }
    }
}

fn join_error_message(err: JoinError) -> String {
    if err.is_panic() {
        panic_message(err.into_panic().as_ref())
    } else {
        "task cancelled".to_string()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

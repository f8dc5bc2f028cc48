//! Core types and dispatch process for asyncops
//!
//! Tracks the lifecycle of named async operations in an action-driven store.
//! Each operation moves through three action types:
//!
//! - `OPERATION/<name>` starts it
//! - `COMPLETE/<name>` carries the result
//! - `FAILURE/<name>` carries the error
//!
//! # Core Concepts
//!
//! - **Action types**: encoding and classification of the three phases
//!   ([`action_types`])
//! - **Status reducer**: a pure fold of actions into a [`StatusMap`] of
//!   `{ loading, error }` per operation key ([`reducer`])
//! - **Registry**: name to async implementation, with optional mocks
//!   ([`Registry`])
//! - **Dispatcher**: runs the implementation for each start action and emits
//!   exactly one terminal action ([`Dispatcher`])
//! - **Runtime**: store, dispatcher, and action channel wired together
//!   ([`OpsRuntime`])
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use asyncops_core::prelude::*;
//! use serde_json::json;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let registry = Arc::new(Registry::new());
//! let fetch_user = registry
//!     .register_operation(
//!         "fetchUser",
//!         operation(|args| async move { Ok(json!({ "id": args[0] })) }),
//!         None,
//!     )
//!     .unwrap();
//!
//! let mut runtime = OpsRuntime::new(registry);
//! runtime.dispatch(fetch_user.action_on("42", vec![json!(42)]));
//! assert!(fetch_user.status_on(runtime.state(), "42").loading);
//!
//! runtime.settle().await;
//! assert!(!fetch_user.status_on(runtime.state(), "42").loading);
//! # });
//! ```

pub mod action;
pub mod action_types;
pub mod debug;
pub mod dispatcher;
pub mod error;
pub mod operation;
pub mod reducer;
pub mod registry;
pub mod runtime;
pub mod selectors;
pub mod store;
pub mod testing;

// Action exports
pub use action::{Action, ActionSummary, OpAction};
pub use action_types::{
    action_types, classify, encode, generic_phase, is_completion, is_failure, is_operation,
    operation_name, phase_of, ActionTypes, Phase, COMPLETE, FAILURE, OPERATION,
};

// Status exports
pub use reducer::{reduce, reducer, reducer_key, OpStatus, StatusMap, StatusSlice, STORE_DOMAIN};
pub use selectors::{is_loading, status, StatusSelector};

// Registry and dispatch exports
pub use dispatcher::{ActionSink, Dispatcher};
pub use error::{error_kind, EmitError, InvalidRegistration, OperationError};
pub use operation::OperationHandle;
pub use registry::{operation, BoxedFuture, Operation, OperationSpec, Registration, Registry};

// Store exports
pub use store::{
    ComposedMiddleware, LoggingMiddleware, Middleware, NoopMiddleware, Reducer, Store,
    StoreWithMiddleware,
};

// Runtime exports
pub use runtime::{OpsRuntime, RuntimeConfig, RuntimeMiddleware};

// Testing exports
pub use testing::TestHarness;

#[cfg(feature = "testing-time")]
pub use testing::{advance_time, pause_time, resume_time};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::action::{Action, ActionSummary, OpAction};
    pub use crate::action_types::{ActionTypes, Phase};
    pub use crate::dispatcher::{ActionSink, Dispatcher};
    pub use crate::error::{EmitError, InvalidRegistration, OperationError};
    pub use crate::operation::OperationHandle;
    pub use crate::reducer::{reduce, reducer, OpStatus, StatusMap, StatusSlice};
    pub use crate::registry::{operation, Operation, OperationSpec, Registry};
    pub use crate::runtime::{OpsRuntime, RuntimeConfig};
    pub use crate::selectors::{status, StatusSelector};
    pub use crate::store::{
        ComposedMiddleware, LoggingMiddleware, Middleware, NoopMiddleware, Reducer, Store,
        StoreWithMiddleware,
    };
}

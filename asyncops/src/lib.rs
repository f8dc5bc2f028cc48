//! asyncops: lifecycle tracking for named async operations
//!
//! Register async implementations by name, dispatch `OPERATION/<name>`
//! actions, and read `{ loading, error }` for every operation (optionally per
//! channel) from a status map kept by a pure reducer.
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use asyncops::prelude::*;
//! use serde_json::json;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let registry = Arc::new(Registry::new());
//! let save = registry
//!     .register_operation("save", operation(|_| async { Err(json!("offline")) }), None)
//!     .unwrap();
//!
//! let mut runtime = OpsRuntime::new(registry);
//! runtime.dispatch(save.action(vec![json!({ "title": "draft" })]));
//! runtime.settle().await;
//!
//! let status = save.status(runtime.state());
//! assert!(!status.loading);
//! assert_eq!(status.error, Some(json!("offline")));
//! # });
//! ```

// Re-export everything from core
pub use asyncops_core::*;

/// Prelude for convenient imports
pub mod prelude {
    // Actions and types
    pub use asyncops_core::{Action, ActionSummary, ActionTypes, OpAction, Phase};

    // Status
    pub use asyncops_core::{
        reduce, reducer, status, OpStatus, StatusMap, StatusSelector, StatusSlice,
    };

    // Registry and dispatch
    pub use asyncops_core::{
        operation, ActionSink, Dispatcher, EmitError, InvalidRegistration, Operation,
        OperationError, OperationHandle, OperationSpec, Registry,
    };

    // Store and runtime
    pub use asyncops_core::{
        ComposedMiddleware, LoggingMiddleware, Middleware, NoopMiddleware, OpsRuntime, Reducer,
        RuntimeConfig, Store, StoreWithMiddleware,
    };

    // Debug
    pub use asyncops_core::debug::{
        ActionLog, ActionLogConfig, ActionLoggerConfig, ActionLoggerMiddleware,
    };
}

//! Registry of operation implementations
//!
//! Maps operation names to async implementations, with an optional mock per
//! name. While mock mode is enabled, lookups prefer the mock.
//!
//! # Example
//!
//! ```
//! use asyncops_core::registry::{operation, Registry};
//! use serde_json::json;
//!
//! # tokio_test_block(async {
//! let registry = Registry::new();
//! registry
//!     .register(
//!         "double",
//!         operation(|args| async move {
//!             let n = args.first().and_then(|v| v.as_i64()).unwrap_or(0);
//!             Ok(json!(n * 2))
//!         }),
//!         None,
//!     )
//!     .unwrap();
//!
//! assert_eq!(registry.call("double", vec![json!(21)]).await, Ok(json!(42)));
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::error::{InvalidRegistration, OperationError};
use crate::operation::OperationHandle;

/// Future returned by an operation implementation.
pub type BoxedFuture = Pin<Box<dyn Future<Output = Result<Value, Value>> + Send>>;

/// An async operation taking positional arguments.
///
/// `Ok` carries the response, `Err` the error reported verbatim in the
/// failure action.
pub type Operation = Arc<dyn Fn(Vec<Value>) -> BoxedFuture + Send + Sync>;

/// Wrap an async closure as an [`Operation`].
pub fn operation<F, Fut>(f: F) -> Operation
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, Value>> + Send + 'static,
{
    Arc::new(move |args| Box::pin(f(args)))
}

/// Description of an operation to register.
///
/// Unlike [`Registry::register`], the implementation may be left out here;
/// registering such a spec fails with
/// [`InvalidRegistration::MissingImplementation`].
#[derive(Clone, Default)]
pub struct OperationSpec {
    name: String,
    implementation: Option<Operation>,
    mock: Option<Operation>,
}

impl OperationSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn implementation(mut self, implementation: Operation) -> Self {
        self.implementation = Some(implementation);
        self
    }

    pub fn mock(mut self, mock: Operation) -> Self {
        self.mock = Some(mock);
        self
    }
}

impl std::fmt::Debug for OperationSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationSpec")
            .field("name", &self.name)
            .field("has_implementation", &self.implementation.is_some())
            .field("has_mock", &self.mock.is_some())
            .finish()
    }
}

/// Whether a registration added a new name or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Inserted,
    Replaced,
}

#[derive(Clone)]
struct RegisteredOperation {
    implementation: Operation,
    mock: Option<Operation>,
}

/// Name to implementation table plus the mock-mode flag.
///
/// Shared between callers and the dispatcher through `Arc<Registry>`.
#[derive(Default)]
pub struct Registry {
    operations: RwLock<HashMap<String, RegisteredOperation>>,
    mock_enabled: AtomicBool,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("operations", &self.names())
            .field("mock_enabled", &self.is_mock_enabled())
            .finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an implementation (and optional mock) under a name.
    ///
    /// Replacing an existing name succeeds, logs a warning, and returns
    /// [`Registration::Replaced`]. The previous mock is dropped along with it.
    pub fn register(
        &self,
        name: impl Into<String>,
        implementation: Operation,
        mock: Option<Operation>,
    ) -> Result<Registration, InvalidRegistration> {
        let mut spec = OperationSpec::new(name).implementation(implementation);
        spec.mock = mock;
        self.register_spec(spec)
    }

    /// Register from an [`OperationSpec`].
    pub fn register_spec(&self, spec: OperationSpec) -> Result<Registration, InvalidRegistration> {
        let OperationSpec {
            name,
            implementation,
            mock,
        } = spec;

        if name.is_empty() {
            return Err(InvalidRegistration::EmptyName);
        }
        let Some(implementation) = implementation else {
            return Err(InvalidRegistration::MissingImplementation { name });
        };

        let has_mock = mock.is_some();
        let previous = self.operations.write().insert(
            name.clone(),
            RegisteredOperation {
                implementation,
                mock,
            },
        );

        if previous.is_some() {
            tracing::warn!(operation = %name, "Overwriting existing operation");
            Ok(Registration::Replaced)
        } else {
            tracing::debug!(operation = %name, has_mock, "Registered operation");
            Ok(Registration::Inserted)
        }
    }

    /// Register and return an [`OperationHandle`] for building actions and
    /// reading status.
    pub fn register_operation(
        &self,
        name: impl Into<String>,
        implementation: Operation,
        mock: Option<Operation>,
    ) -> Result<OperationHandle, InvalidRegistration> {
        let name = name.into();
        self.register(name.clone(), implementation, mock)?;
        Ok(OperationHandle::new(name))
    }

    /// Implementation to run for a name under the current mock mode.
    pub fn get(&self, name: &str) -> Option<Operation> {
        let operations = self.operations.read();
        let entry = operations.get(name)?;
        match (&entry.mock, self.is_mock_enabled()) {
            (Some(mock), true) => Some(mock.clone()),
            _ => Some(entry.implementation.clone()),
        }
    }

    /// Invoke an operation by name.
    pub async fn call(&self, name: &str, args: Vec<Value>) -> Result<Value, OperationError> {
        let Some(operation) = self.get(name) else {
            return Err(OperationError::NotRegistered {
                name: name.to_string(),
            });
        };
        operation(args).await.map_err(OperationError::Failed)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operations.read().contains_key(name)
    }

    /// Whether a mock is registered for the name.
    pub fn has_mock(&self, name: &str) -> bool {
        self.operations
            .read()
            .get(name)
            .is_some_and(|entry| entry.mock.is_some())
    }

    pub fn len(&self) -> usize {
        self.operations.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.read().is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.operations.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn enable_mock(&self) {
        self.mock_enabled.store(true, Ordering::SeqCst);
        tracing::debug!("Mock mode enabled");
    }

    pub fn disable_mock(&self) {
        self.mock_enabled.store(false, Ordering::SeqCst);
        tracing::debug!("Mock mode disabled");
    }

    pub fn is_mock_enabled(&self) -> bool {
        self.mock_enabled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn constant(value: Value) -> Operation {
        operation(move |_| {
            let value = value.clone();
            async move { Ok(value) }
        })
    }

    #[test]
    fn test_register_rejects_empty_name() {
        let registry = Registry::new();
        assert_eq!(
            registry.register("", constant(json!(1)), None),
            Err(InvalidRegistration::EmptyName)
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_spec_requires_implementation() {
        let registry = Registry::new();
        let result = registry.register_spec(OperationSpec::new("fetch").mock(constant(json!(1))));
        assert_eq!(
            result,
            Err(InvalidRegistration::MissingImplementation {
                name: "fetch".into()
            })
        );
        assert!(!registry.contains("fetch"));
    }

    #[test]
    fn test_overwrite_is_reported() {
        // The returned `Registration` is the overwrite signal; the `warn!`
        // event alongside it is not captured here.
        let registry = Registry::new();
        assert_eq!(
            registry.register("a", constant(json!(1)), None),
            Ok(Registration::Inserted)
        );
        assert_eq!(
            registry.register("a", constant(json!(2)), None),
            Ok(Registration::Replaced)
        );
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_behavior() {
        let registry = Registry::new();
        registry.register("a", constant(json!(1)), None).unwrap();
        registry.register("a", constant(json!(2)), None).unwrap();
        assert_eq!(registry.call("a", vec![]).await, Ok(json!(2)));
    }

    #[tokio::test]
    async fn test_call_passes_args_in_order() {
        let registry = Registry::new();
        registry
            .register("echo", operation(|args| async move { Ok(Value::Array(args)) }), None)
            .unwrap();

        let result = registry.call("echo", vec![json!("a"), json!(2), json!(null)]).await;
        assert_eq!(result, Ok(json!(["a", 2, null])));
    }

    #[tokio::test]
    async fn test_call_unknown_name() {
        let registry = Registry::new();
        let err = registry.call("missing", vec![]).await.unwrap_err();
        assert!(err.is_not_registered());
    }

    #[tokio::test]
    async fn test_call_keeps_error_verbatim() {
        let registry = Registry::new();
        registry
            .register(
                "fail",
                operation(|_| async { Err(json!({"status": 503})) }),
                None,
            )
            .unwrap();

        assert_eq!(
            registry.call("fail", vec![]).await,
            Err(OperationError::Failed(json!({"status": 503})))
        );
    }

    #[tokio::test]
    async fn test_mock_toggle() {
        let registry = Registry::new();
        let real_calls = Arc::new(AtomicUsize::new(0));
        let counter = real_calls.clone();
        let real = operation(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(json!("real")) }
        });
        registry
            .register("fetch", real, Some(constant(json!("mock"))))
            .unwrap();
        registry.register("plain", constant(json!("plain")), None).unwrap();

        assert!(!registry.is_mock_enabled());
        assert_eq!(registry.call("fetch", vec![]).await, Ok(json!("real")));

        registry.enable_mock();
        assert_eq!(registry.call("fetch", vec![]).await, Ok(json!("mock")));
        // No mock registered: falls back to the real implementation
        assert_eq!(registry.call("plain", vec![]).await, Ok(json!("plain")));

        registry.disable_mock();
        assert_eq!(registry.call("fetch", vec![]).await, Ok(json!("real")));
        assert_eq!(real_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_introspection() {
        let registry = Registry::new();
        registry.register("b", constant(json!(1)), None).unwrap();
        registry
            .register("a", constant(json!(1)), Some(constant(json!(0))))
            .unwrap();

        assert_eq!(registry.names(), vec!["a".to_string(), "b".to_string()]);
        assert!(registry.has_mock("a"));
        assert!(!registry.has_mock("b"));
        assert!(!registry.has_mock("c"));
    }
}

//! Handler registration and lookup.
//!
//! Workers collect activity and workflow handlers into a
//! [`HandlerRegistry`] before they start. Registration happens through a
//! builder that rejects duplicate names; the built registry is immutable
//! and shared by every poller through the [`Lookup`] trait, which is the
//! only view task processing ever sees.
//!
//! Handlers are async functions from an [`ExecutionContext`] and a raw
//! JSON input string to a JSON output string. The `*_typed` registration
//! variants wrap a handler over serde-serializable types in the JSON
//! encoding so business code never touches raw payloads.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::context::ExecutionContext;
use crate::error::ClientError;
use crate::task::TaskKind;

/// An invokable activity or workflow body.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn invoke(&self, context: ExecutionContext, input: String) -> Result<String, String>;
}

/// Adapter so plain async functions and closures can be registered as
/// handlers.
pub struct FnHandler<F, Fut>(pub F)
where
    F: Fn(ExecutionContext, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<String, String>> + Send + 'static;

#[async_trait]
impl<F, Fut> TaskHandler for FnHandler<F, Fut>
where
    F: Fn(ExecutionContext, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<String, String>> + Send + 'static,
{
    async fn invoke(&self, context: ExecutionContext, input: String) -> Result<String, String> {
        (self.0)(context, input).await
    }
}

/// Read-only handler lookup, keyed by task kind and registered name.
pub trait Lookup: Send + Sync {
    fn find(&self, kind: TaskKind, name: &str) -> Option<Arc<dyn TaskHandler>>;
}

/// Immutable set of registered handlers.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    activities: Arc<HashMap<String, Arc<dyn TaskHandler>>>,
    workflows: Arc<HashMap<String, Arc<dyn TaskHandler>>>,
}

impl HandlerRegistry {
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::default()
    }

    /// Registered activity names, sorted.
    pub fn activity_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.activities.keys().cloned().collect();
        names.sort();
        names
    }

    /// Registered workflow names, sorted.
    pub fn workflow_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.workflows.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Lookup for HandlerRegistry {
    fn find(&self, kind: TaskKind, name: &str) -> Option<Arc<dyn TaskHandler>> {
        let handlers = match kind {
            TaskKind::Activity => &self.activities,
            TaskKind::Workflow => &self.workflows,
        };
        let found = handlers.get(name).cloned();
        if found.is_none() {
            debug!(?kind, name, "no handler registered under this name");
        }
        found
    }
}

/// Collects handlers and reports duplicate registrations at build time.
#[derive(Default)]
pub struct HandlerRegistryBuilder {
    activities: HashMap<String, Arc<dyn TaskHandler>>,
    workflows: HashMap<String, Arc<dyn TaskHandler>>,
    errors: Vec<ClientError>,
}

impl HandlerRegistryBuilder {
    pub fn register_activity<F, Fut>(self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(ExecutionContext, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, String>> + Send + 'static,
    {
        self.register_activity_handler(name, Arc::new(FnHandler(handler)))
    }

    pub fn register_workflow<F, Fut>(self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(ExecutionContext, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, String>> + Send + 'static,
    {
        self.register_workflow_handler(name, Arc::new(FnHandler(handler)))
    }

    pub fn register_activity_handler(mut self, name: impl Into<String>, handler: Arc<dyn TaskHandler>) -> Self {
        self.insert(TaskKind::Activity, name.into(), handler);
        self
    }

    pub fn register_workflow_handler(mut self, name: impl Into<String>, handler: Arc<dyn TaskHandler>) -> Self {
        self.insert(TaskKind::Workflow, name.into(), handler);
        self
    }

    /// Registers an activity over serde-typed input and output. The input
    /// is decoded from JSON before the handler runs and the output encoded
    /// back to JSON after it returns; a decode failure fails the task.
    pub fn register_activity_typed<In, Out, F, Fut>(self, name: impl Into<String>, handler: F) -> Self
    where
        In: DeserializeOwned + Send + 'static,
        Out: Serialize + Send + 'static,
        F: Fn(ExecutionContext, In) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Out, String>> + Send + 'static,
    {
        self.register_activity(name, typed(handler))
    }

    /// Typed counterpart of [`register_workflow`](Self::register_workflow).
    pub fn register_workflow_typed<In, Out, F, Fut>(self, name: impl Into<String>, handler: F) -> Self
    where
        In: DeserializeOwned + Send + 'static,
        Out: Serialize + Send + 'static,
        F: Fn(ExecutionContext, In) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Out, String>> + Send + 'static,
    {
        self.register_workflow(name, typed(handler))
    }

    /// True when a handler of this kind is already registered under `name`.
    pub fn contains(&self, kind: TaskKind, name: &str) -> bool {
        match kind {
            TaskKind::Activity => self.activities.contains_key(name),
            TaskKind::Workflow => self.workflows.contains_key(name),
        }
    }

    /// Finalizes the registry. Fails with the first duplicate registration
    /// recorded, if any.
    pub fn build(mut self) -> Result<HandlerRegistry, ClientError> {
        if let Some(error) = self.errors.drain(..).next() {
            return Err(error);
        }
        Ok(HandlerRegistry {
            activities: Arc::new(self.activities),
            workflows: Arc::new(self.workflows),
        })
    }

    fn insert(&mut self, kind: TaskKind, name: String, handler: Arc<dyn TaskHandler>) {
        if self.contains(kind, &name) {
            self.errors.push(ClientError::AlreadyRegistered { name });
            return;
        }
        match kind {
            TaskKind::Activity => self.activities.insert(name, handler),
            TaskKind::Workflow => self.workflows.insert(name, handler),
        };
    }
}

fn typed<In, Out, F, Fut>(
    handler: F,
) -> impl Fn(ExecutionContext, String) -> futures::future::BoxFuture<'static, Result<String, String>>
+ Send
+ Sync
+ 'static
where
    In: DeserializeOwned + Send + 'static,
    Out: Serialize + Send + 'static,
    F: Fn(ExecutionContext, In) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Out, String>> + Send + 'static,
{
    let handler = Arc::new(handler);
    move |context: ExecutionContext, raw: String| {
        let handler = Arc::clone(&handler);
        Box::pin(async move {
            let input: In = codec::decode(&raw)?;
            let output = handler(context, input).await?;
            codec::encode(&output)
        })
    }
}

mod codec {
    use serde::Serialize;
    use serde::de::DeserializeOwned;

    /// Empty payloads decode as JSON null so unit-input handlers work.
    pub(super) fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
        let raw = if raw.is_empty() { "null" } else { raw };
        serde_json::from_str(raw).map_err(|e| format!("failed to decode input: {e}"))
    }

    pub(super) fn encode<T: Serialize>(value: &T) -> Result<String, String> {
        serde_json::to_string(value).map_err(|e| format!("failed to encode output: {e}"))
    }
}

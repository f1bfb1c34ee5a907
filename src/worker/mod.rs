//! Worker facade: handler registration, middleware declaration, and the
//! lifecycle of the pollers that feed the execution pool.

pub mod pool;
pub mod poller;
pub mod processor;

pub use poller::{Poller, PollerOptions, PollerState};
pub use pool::TaskPool;
pub use processor::TaskProcessor;

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::config::Configuration;
use crate::connection::Connection;
use crate::context::ExecutionContext;
use crate::error::ClientError;
use crate::middleware::Entry;
use crate::registry::{HandlerRegistryBuilder, Lookup};
use crate::task::TaskKind;

/// Hosts one or more task-queue pollers sharing a handler registry and a
/// middleware stack.
///
/// Handlers and middleware are declared up front; [`Worker::start`] freezes
/// them into an immutable registry and spawns a poller per queue.
pub struct Worker {
    config: Arc<Configuration>,
    connection: Arc<dyn Connection>,
    options: PollerOptions,
    handlers: HandlerRegistryBuilder,
    middleware: Vec<Entry>,
    queues: Vec<(String, String)>,
    pollers: Vec<Arc<Poller>>,
    started: bool,
}

impl Worker {
    /// A worker polling the configuration's default namespace and task
    /// queue. Add more queues with [`Worker::add_task_queue`].
    pub fn new(connection: Arc<dyn Connection>, config: Configuration) -> Self {
        let queues = vec![(config.namespace.clone(), config.task_queue.clone())];
        Self {
            config: Arc::new(config),
            connection,
            options: PollerOptions::default(),
            handlers: HandlerRegistryBuilder::default(),
            middleware: Vec::new(),
            queues,
            pollers: Vec::new(),
            started: false,
        }
    }

    pub fn with_poller_options(mut self, options: PollerOptions) -> Self {
        self.options = options;
        self
    }

    /// Polls an additional (namespace, task queue) pair. Duplicate pairs
    /// are ignored.
    pub fn add_task_queue(&mut self, namespace: impl Into<String>, task_queue: impl Into<String>) {
        let queue = (namespace.into(), task_queue.into());
        if !self.queues.contains(&queue) {
            self.queues.push(queue);
        }
    }

    /// Appends a middleware entry. Entries wrap task processing in
    /// declaration order, first entry outermost.
    pub fn add_middleware(&mut self, entry: Entry) {
        self.middleware.push(entry);
    }

    pub fn register_activity<F, Fut>(&mut self, name: impl Into<String>, handler: F) -> Result<(), ClientError>
    where
        F: Fn(ExecutionContext, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, String>> + Send + 'static,
    {
        let name = self.claim_name(TaskKind::Activity, name)?;
        self.handlers = std::mem::take(&mut self.handlers).register_activity(name, handler);
        Ok(())
    }

    pub fn register_workflow<F, Fut>(&mut self, name: impl Into<String>, handler: F) -> Result<(), ClientError>
    where
        F: Fn(ExecutionContext, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, String>> + Send + 'static,
    {
        let name = self.claim_name(TaskKind::Workflow, name)?;
        self.handlers = std::mem::take(&mut self.handlers).register_workflow(name, handler);
        Ok(())
    }

    /// Registers an activity over serde-typed input and output.
    pub fn register_activity_typed<In, Out, F, Fut>(
        &mut self,
        name: impl Into<String>,
        handler: F,
    ) -> Result<(), ClientError>
    where
        In: DeserializeOwned + Send + 'static,
        Out: Serialize + Send + 'static,
        F: Fn(ExecutionContext, In) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Out, String>> + Send + 'static,
    {
        let name = self.claim_name(TaskKind::Activity, name)?;
        self.handlers = std::mem::take(&mut self.handlers).register_activity_typed(name, handler);
        Ok(())
    }

    /// Registers a workflow over serde-typed input and output.
    pub fn register_workflow_typed<In, Out, F, Fut>(
        &mut self,
        name: impl Into<String>,
        handler: F,
    ) -> Result<(), ClientError>
    where
        In: DeserializeOwned + Send + 'static,
        Out: Serialize + Send + 'static,
        F: Fn(ExecutionContext, In) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Out, String>> + Send + 'static,
    {
        let name = self.claim_name(TaskKind::Workflow, name)?;
        self.handlers = std::mem::take(&mut self.handlers).register_workflow_typed(name, handler);
        Ok(())
    }

    /// Freezes the registry and spawns one poller per queue. Starting an
    /// already started worker is a logged no-op.
    pub fn start(&mut self) -> Result<(), ClientError> {
        if self.started {
            warn!("worker was already started");
            return Ok(());
        }

        init_tracing();

        let registry = std::mem::take(&mut self.handlers).build()?;
        info!(
            activities = ?registry.activity_names(),
            workflows = ?registry.workflow_names(),
            queues = self.queues.len(),
            "starting worker"
        );
        let lookup: Arc<dyn Lookup> = Arc::new(registry);

        for (namespace, task_queue) in &self.queues {
            let poller = Arc::new(Poller::new(
                namespace.clone(),
                task_queue.clone(),
                Arc::clone(&lookup),
                &self.middleware,
                Arc::clone(&self.config),
                Arc::clone(&self.connection),
                self.options.clone(),
            ));
            poller.start();
            self.pollers.push(poller);
        }
        self.started = true;
        Ok(())
    }

    /// Stops every poller: request shutdown, abort in-flight polls, then
    /// wait for each loop to exit and its pool to drain.
    pub async fn stop(&mut self) {
        for poller in &self.pollers {
            poller.stop_polling();
        }
        for poller in &self.pollers {
            poller.cancel_pending_requests();
        }
        for poller in &self.pollers {
            poller.wait().await;
        }
        self.pollers.clear();
        info!("worker stopped");
    }

    /// The pollers spawned by [`Worker::start`].
    pub fn pollers(&self) -> &[Arc<Poller>] {
        &self.pollers
    }

    fn claim_name(&mut self, kind: TaskKind, name: impl Into<String>) -> Result<String, ClientError> {
        let name = name.into();
        if self.handlers.contains(kind, &name) {
            return Err(ClientError::AlreadyRegistered { name });
        }
        Ok(name)
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}

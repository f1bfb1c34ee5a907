//! Ambient metadata about the execution currently being processed.
//!
//! The processor binds an [`ExecutionContext`] around each handler
//! invocation with [`bind`]. Handler code (and anything it calls, such as
//! logging layers) reads it back with [`current`]. The binding is scoped to
//! the invocation future, so it is released on success, failure, and
//! cancellation alike; at most one context is visible to a task at a time.

use std::collections::HashMap;

use crate::task::{Task, TaskKind};

/// Metadata describing the execution a handler is running under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    name: String,
    kind: TaskKind,
    namespace: String,
    task_queue: String,
    workflow_id: Option<String>,
    run_id: Option<String>,
    headers: HashMap<String, String>,
}

impl ExecutionContext {
    /// Context for a task dequeued from the service.
    pub fn for_task(task: &Task) -> Self {
        Self {
            name: task.handler_name.clone(),
            kind: task.kind,
            namespace: task.namespace.clone(),
            task_queue: task.task_queue.clone(),
            workflow_id: task.workflow_id.clone(),
            run_id: task.run_id.clone(),
            headers: task.headers.clone(),
        }
    }

    /// Context for a workflow run executed by the simulation harness.
    pub fn for_local(
        name: impl Into<String>,
        workflow_id: impl Into<String>,
        run_id: impl Into<String>,
        namespace: impl Into<String>,
        task_queue: impl Into<String>,
        headers: HashMap<String, String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: TaskKind::Workflow,
            namespace: namespace.into(),
            task_queue: task_queue.into(),
            workflow_id: Some(workflow_id.into()),
            run_id: Some(run_id.into()),
            headers,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn task_queue(&self) -> &str {
        &self.task_queue
    }

    pub fn workflow_id(&self) -> Option<&str> {
        self.workflow_id.as_deref()
    }

    pub fn run_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }
}

tokio::task_local! {
    static CURRENT_CONTEXT: ExecutionContext;
}

/// The context bound to the current task, if any.
pub fn current() -> Option<ExecutionContext> {
    CURRENT_CONTEXT.try_with(|context| context.clone()).ok()
}

/// Runs `future` with `context` bound as the current execution context.
/// The binding ends when the future does, however it ends.
pub async fn bind<F>(context: ExecutionContext, future: F) -> F::Output
where
    F: Future,
{
    CURRENT_CONTEXT.scope(context, future).await
}

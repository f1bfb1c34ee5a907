//! Processing of a single dequeued task.

use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tracing::{debug, error};

use crate::config::Configuration;
use crate::connection::Connection;
use crate::context::{self, ExecutionContext};
use crate::error::{ClientError, Error};
use crate::metrics::names::{ACTIVITY_TASK_LATENCY, WORKFLOW_TASK_LATENCY};
use crate::middleware::Chain;
use crate::registry::Lookup;
use crate::task::{Task, TaskKind};

/// Runs one task to completion and reports the outcome back to the
/// service: handler lookup, the middleware pipeline, the handler itself,
/// and the completed/failed response.
pub struct TaskProcessor {
    task: Task,
    namespace: String,
    lookup: Arc<dyn Lookup>,
    chain: Arc<Chain>,
    config: Arc<Configuration>,
    connection: Arc<dyn Connection>,
}

impl TaskProcessor {
    pub fn new(
        task: Task,
        namespace: String,
        lookup: Arc<dyn Lookup>,
        chain: Arc<Chain>,
        config: Arc<Configuration>,
        connection: Arc<dyn Connection>,
    ) -> Self {
        Self {
            task,
            namespace,
            lookup,
            chain,
            config,
            connection,
        }
    }

    /// Processes the task and reports its outcome. Infallible on purpose:
    /// every failure ends up either in the failed-task response or in the
    /// log, never with the pool slot.
    pub async fn process(self) {
        let started = Instant::now();
        debug!(
            namespace = %self.namespace,
            task_queue = %self.task.task_queue,
            handler = %self.task.handler_name,
            "processing task"
        );

        match self.execute().await {
            Ok(result) => {
                if let Err(error) = self.connection.respond_completed(&self.task.token, &result).await {
                    error!(
                        namespace = %self.namespace,
                        task_queue = %self.task.task_queue,
                        %error,
                        "unable to report task completion"
                    );
                }
            }
            Err(failure) => {
                if failure.is_internal() {
                    error!(
                        namespace = %self.namespace,
                        task_queue = %self.task.task_queue,
                        handler = %self.task.handler_name,
                        %failure,
                        "internal failure while processing task"
                    );
                }
                if let Err(error) = self.connection.respond_failed(&self.task.token, &failure).await {
                    error!(
                        namespace = %self.namespace,
                        task_queue = %self.task.task_queue,
                        %error,
                        "unable to report task failure"
                    );
                }
            }
        }

        let metric = match self.task.kind {
            TaskKind::Activity => ACTIVITY_TASK_LATENCY,
            TaskKind::Workflow => WORKFLOW_TASK_LATENCY,
        };
        self.config.metrics.timing(
            metric,
            started.elapsed(),
            &[
                ("namespace", self.namespace.as_str()),
                ("task_queue", self.task.task_queue.as_str()),
            ],
        );
    }

    async fn execute(&self) -> Result<String, Error> {
        let Some(handler) = self.lookup.find(self.task.kind, &self.task.handler_name) else {
            let name = self.task.handler_name.clone();
            return Err(match self.task.kind {
                TaskKind::Activity => ClientError::ActivityNotRegistered { name }.into(),
                TaskKind::Workflow => ClientError::WorkflowNotRegistered { name }.into(),
            });
        };

        let handler_context = ExecutionContext::for_task(&self.task);
        let terminal = move |task: &Task| {
            let handler = Arc::clone(&handler);
            let context = handler_context.clone();
            let input = task.payload.clone();
            async move {
                context::bind(context.clone(), handler.invoke(context, input))
                    .await
                    .map_err(|message| Error::Client(ClientError::ActivityException { message }))
            }
            .boxed()
        };

        self.chain.invoke(&self.task, terminal).await
    }
}

//! Boundary to the orchestration service.
//!
//! Everything the runtime needs from the service is expressed through the
//! [`Connection`] trait so pollers and clients never depend on a concrete
//! transport. Production hosts supply an RPC-backed implementation; tests
//! supply scripted fakes.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ApiError, Error};
use crate::options::{RetryPolicy, ReusePolicy, TimeoutKind};
use crate::task::Task;

/// Request to start (or cron-schedule) a workflow execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StartWorkflowExecutionRequest {
    pub namespace: String,
    pub workflow_id: String,
    pub workflow_name: String,
    pub task_queue: String,
    pub input: String,
    pub reuse_policy: ReusePolicy,
    pub retry_policy: Option<RetryPolicy>,
    pub timeouts: HashMap<TimeoutKind, Duration>,
    pub headers: HashMap<String, String>,
    /// When set the service runs the workflow on this cron expression
    /// instead of starting it immediately.
    pub cron_schedule: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartWorkflowExecutionResponse {
    pub run_id: String,
}

/// Transport-agnostic handle to the orchestration service.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Long-polls the given task queue. Resolves with `None` when the poll
    /// timed out server-side without a task becoming available.
    async fn poll_activity_task_queue(
        &self,
        namespace: &str,
        task_queue: &str,
    ) -> Result<Option<Task>, ApiError>;

    /// Aborts any in-flight poll immediately instead of letting it run to
    /// its server-side timeout. Safe to call with no poll outstanding.
    fn cancel_polling_request(&self);

    async fn start_workflow_execution(
        &self,
        request: StartWorkflowExecutionRequest,
    ) -> Result<StartWorkflowExecutionResponse, ApiError>;

    /// Reports a successfully processed task, echoing its token.
    async fn respond_completed(&self, task_token: &str, result: &str) -> Result<(), ApiError>;

    /// Reports a failed task, echoing its token.
    async fn respond_failed(&self, task_token: &str, failure: &Error) -> Result<(), ApiError>;
}

//! Caller-facing facade for starting and scheduling workflows.
//!
//! A client is backed either by a [`Connection`] to the real service or by
//! a [`LocalOrchestrator`], so test code and production code issue the
//! same calls. Option resolution happens here, once per call, before
//! anything crosses the backend boundary.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::config::Configuration;
use crate::connection::{Connection, StartWorkflowExecutionRequest};
use crate::error::Error;
use crate::options::{DefaultsProvider, ExecutionOptions, StartOptions};
use crate::testing::LocalOrchestrator;

enum Backend {
    Remote(Arc<dyn Connection>),
    Local(Arc<LocalOrchestrator>),
}

pub struct Client {
    backend: Backend,
    config: Arc<Configuration>,
}

impl Client {
    /// A client talking to the real service over `connection`.
    pub fn new(connection: Arc<dyn Connection>, config: Configuration) -> Self {
        Self {
            backend: Backend::Remote(connection),
            config: Arc::new(config),
        }
    }

    /// A client backed by an in-process orchestrator. Shares the
    /// orchestrator's configuration so both resolve options identically.
    pub fn local(orchestrator: Arc<LocalOrchestrator>) -> Self {
        let config = orchestrator.config();
        Self {
            backend: Backend::Local(orchestrator),
            config,
        }
    }

    /// Starts a workflow execution and returns its run id.
    pub async fn start_workflow(
        &self,
        workflow_name: &str,
        input: impl Into<String>,
        options: StartOptions,
    ) -> Result<String, Error> {
        self.start_workflow_with(workflow_name, None, input, options).await
    }

    /// Like [`Client::start_workflow`], consulting `target` for
    /// object-level option defaults.
    pub async fn start_workflow_with(
        &self,
        workflow_name: &str,
        target: Option<&dyn DefaultsProvider>,
        input: impl Into<String>,
        options: StartOptions,
    ) -> Result<String, Error> {
        let input = input.into();
        match &self.backend {
            Backend::Remote(connection) => {
                let request = self.build_start_request(workflow_name, target, &options, input, None)?;
                debug!(
                    workflow = %request.workflow_name,
                    workflow_id = %request.workflow_id,
                    namespace = %request.namespace,
                    "starting workflow execution"
                );
                let response = connection.start_workflow_execution(request).await?;
                Ok(response.run_id)
            }
            Backend::Local(orchestrator) => {
                orchestrator.start_workflow_with(workflow_name, target, input, &options).await
            }
        }
    }

    /// Registers a cron schedule for a workflow and returns the workflow
    /// id the schedule is keyed by.
    pub async fn schedule_workflow(
        &self,
        workflow_name: &str,
        cron_expression: &str,
        input: impl Into<String>,
        options: StartOptions,
    ) -> Result<String, Error> {
        let input = input.into();
        match &self.backend {
            Backend::Remote(connection) => {
                let request = self.build_start_request(
                    workflow_name,
                    None,
                    &options,
                    input,
                    Some(cron_expression.to_string()),
                )?;
                let workflow_id = request.workflow_id.clone();
                debug!(
                    workflow = %request.workflow_name,
                    workflow_id = %workflow_id,
                    cron = cron_expression,
                    "scheduling workflow execution"
                );
                connection.start_workflow_execution(request).await?;
                Ok(workflow_id)
            }
            Backend::Local(orchestrator) => {
                orchestrator.schedule_workflow(workflow_name, cron_expression, input, &options).await
            }
        }
    }

    fn build_start_request(
        &self,
        workflow_name: &str,
        target: Option<&dyn DefaultsProvider>,
        options: &StartOptions,
        input: String,
        cron_schedule: Option<String>,
    ) -> Result<StartWorkflowExecutionRequest, Error> {
        let resolved = ExecutionOptions::resolve(workflow_name, target, options, Some(&self.config))?;
        let workflow_id = options.workflow_id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());

        Ok(StartWorkflowExecutionRequest {
            namespace: resolved.namespace().unwrap_or(&self.config.namespace).to_string(),
            workflow_id,
            workflow_name: resolved.name().to_string(),
            task_queue: resolved.task_queue().unwrap_or(&self.config.task_queue).to_string(),
            input,
            reuse_policy: options.workflow_id_reuse_policy.unwrap_or_default(),
            retry_policy: resolved.retry_policy().cloned(),
            timeouts: resolved.timeouts().clone(),
            headers: resolved.headers().clone(),
            cron_schedule,
        })
    }
}

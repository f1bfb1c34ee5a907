//! In-process simulation of the orchestration service.
//!
//! [`LocalOrchestrator`] runs registered workflows synchronously inside the
//! caller, records every run with the same id-reuse rules the service
//! applies, and stores cron schedules as inert entries that tests trigger
//! explicitly. Each orchestrator instance owns its own state; two
//! orchestrators never share records, and [`LocalOrchestrator::reset`]
//! returns one to a blank slate between tests.

pub mod execution;
pub mod scheduler;

pub use execution::{ExecutionStatus, WorkflowExecution};
pub use scheduler::ScheduleEntry;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::Configuration;
use crate::context::{self, ExecutionContext};
use crate::error::{ClientError, Error};
use crate::options::{DefaultsProvider, ExecutionOptions, StartOptions};
use crate::registry::Lookup;
use crate::task::TaskKind;
use execution::ExecutionRegistry;
use scheduler::CronSchedules;

pub struct LocalOrchestrator {
    lookup: Arc<dyn Lookup>,
    config: Arc<Configuration>,
    executions: Mutex<ExecutionRegistry>,
    schedules: Mutex<CronSchedules>,
}

impl LocalOrchestrator {
    pub fn new(lookup: Arc<dyn Lookup>, config: Configuration) -> Self {
        Self {
            lookup,
            config: Arc::new(config),
            executions: Mutex::new(ExecutionRegistry::default()),
            schedules: Mutex::new(CronSchedules::default()),
        }
    }

    pub fn config(&self) -> Arc<Configuration> {
        Arc::clone(&self.config)
    }

    /// Starts a workflow and runs it to completion in the caller. Returns
    /// the new run id; a handler failure is recorded and then surfaced
    /// directly.
    pub async fn start_workflow(
        &self,
        workflow_name: &str,
        input: impl Into<String>,
        options: &StartOptions,
    ) -> Result<String, Error> {
        self.start_workflow_with(workflow_name, None, input, options).await
    }

    /// Like [`LocalOrchestrator::start_workflow`], consulting `target` for
    /// object-level option defaults.
    pub async fn start_workflow_with(
        &self,
        workflow_name: &str,
        target: Option<&dyn DefaultsProvider>,
        input: impl Into<String>,
        options: &StartOptions,
    ) -> Result<String, Error> {
        let resolved = ExecutionOptions::resolve(workflow_name, target, options, Some(&self.config))?;
        let workflow_id = options.workflow_id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
        let reuse_policy = options.workflow_id_reuse_policy.unwrap_or_default();

        let run_id = self.executions.lock().await.admit(&workflow_id, reuse_policy)?;
        info!(
            workflow = %resolved.name(),
            workflow_id = %workflow_id,
            run_id = %run_id,
            "starting local workflow run"
        );

        let outcome = self.run_workflow(&resolved, &workflow_id, &run_id, input.into()).await;

        let mut executions = self.executions.lock().await;
        match &outcome {
            Ok(result) => executions.record_completed(&workflow_id, &run_id, result.clone()),
            Err(failure) => executions.record_failed(&workflow_id, &run_id, failure.to_string()),
        }
        drop(executions);

        outcome.map(|_| run_id)
    }

    /// Registers a cron schedule under the resolved workflow id without
    /// running anything. Returns the id the schedule is keyed by.
    pub async fn schedule_workflow(
        &self,
        workflow_name: &str,
        cron_expression: &str,
        input: impl Into<String>,
        options: &StartOptions,
    ) -> Result<String, Error> {
        let workflow_id = options.workflow_id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut captured = options.clone();
        captured.workflow_id = Some(workflow_id.clone());

        let entry = ScheduleEntry {
            workflow_name: workflow_name.to_string(),
            cron_expression: cron_expression.to_string(),
            input: input.into(),
            options: captured,
        };
        self.schedules.lock().await.insert(workflow_id.clone(), entry);
        info!(
            workflow = workflow_name,
            workflow_id = %workflow_id,
            cron = cron_expression,
            "registered workflow schedule"
        );
        Ok(workflow_id)
    }

    /// Triggers the schedule registered under `workflow_id`, running the
    /// workflow exactly as an immediate start would: same id-reuse rules,
    /// same records, same propagation of failures.
    pub async fn execute(&self, workflow_id: &str) -> Result<String, Error> {
        let Some(entry) = self.schedules.lock().await.get(workflow_id) else {
            return Err(Error::NotScheduled { workflow_id: workflow_id.to_string() });
        };
        self.trigger(workflow_id, &entry).await
    }

    /// Triggers every registered schedule once, in workflow-id order. A
    /// failing run is logged and does not stop the rest.
    pub async fn execute_all(&self) {
        let entries = self.schedules.lock().await.all();
        for (workflow_id, entry) in entries {
            if let Err(error) = self.trigger(&workflow_id, &entry).await {
                error!(workflow_id = %workflow_id, %error, "scheduled workflow run failed");
            }
        }
    }

    /// Removes every registered schedule. Execution records are kept.
    pub async fn clear_all(&self) {
        self.schedules.lock().await.clear();
    }

    /// Workflow id to cron expression for every registered schedule.
    pub async fn cron_schedules(&self) -> HashMap<String, String> {
        self.schedules.lock().await.cron_view()
    }

    pub async fn schedule(&self, workflow_id: &str) -> Option<ScheduleEntry> {
        self.schedules.lock().await.get(workflow_id)
    }

    /// Drops all execution records and schedules.
    pub async fn reset(&self) {
        self.executions.lock().await.clear();
        self.schedules.lock().await.clear();
    }

    pub async fn execution_status(&self, workflow_id: &str, run_id: &str) -> Option<ExecutionStatus> {
        self.executions.lock().await.status_of(workflow_id, run_id)
    }

    /// Every recorded run of `workflow_id`, in start order.
    pub async fn executions(&self, workflow_id: &str) -> Vec<WorkflowExecution> {
        self.executions.lock().await.runs_of(workflow_id)
    }

    pub async fn latest_execution(&self, workflow_id: &str) -> Option<WorkflowExecution> {
        self.executions.lock().await.latest(workflow_id).cloned()
    }

    /// Injects an execution record directly, so id-reuse behavior can be
    /// exercised without running a workflow first.
    pub async fn seed_execution(&self, workflow_id: &str, run_id: &str, status: ExecutionStatus) {
        self.executions.lock().await.insert(workflow_id, run_id, status);
    }

    async fn trigger(&self, workflow_id: &str, entry: &ScheduleEntry) -> Result<String, Error> {
        info!(workflow_id, cron = %entry.cron_expression, "triggering scheduled workflow");
        self.start_workflow(&entry.workflow_name, entry.input.clone(), &entry.options).await
    }

    async fn run_workflow(
        &self,
        resolved: &ExecutionOptions,
        workflow_id: &str,
        run_id: &str,
        input: String,
    ) -> Result<String, Error> {
        let name = resolved.name();
        let Some(handler) = self.lookup.find(TaskKind::Workflow, name) else {
            return Err(ClientError::WorkflowNotRegistered { name: name.to_string() }.into());
        };

        let namespace = resolved.namespace().unwrap_or(&self.config.namespace);
        let task_queue = resolved.task_queue().unwrap_or(&self.config.task_queue);
        let context = ExecutionContext::for_local(
            name,
            workflow_id,
            run_id,
            namespace,
            task_queue,
            resolved.headers().clone(),
        );

        context::bind(context.clone(), handler.invoke(context, input))
            .await
            .map_err(|message| ClientError::ActivityException { message }.into())
    }
}

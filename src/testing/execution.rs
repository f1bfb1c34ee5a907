//! Execution records kept by the simulation harness.

use std::collections::HashMap;

use uuid::Uuid;

use crate::error::ApiError;
use crate::options::ReusePolicy;

/// Status of one recorded workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
    Terminated,
    Canceled,
    ContinuedAsNew,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExecutionStatus::Running)
    }
}

/// One recorded workflow run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowExecution {
    pub workflow_id: String,
    pub run_id: String,
    pub status: ExecutionStatus,
    pub result: Option<String>,
    pub failure: Option<String>,
}

/// Every run keyed by workflow id, in start order. The admit step is the
/// single place id-reuse rules are enforced; callers hold the registry
/// lock across it so check and insert are one atomic step.
#[derive(Debug, Default)]
pub(crate) struct ExecutionRegistry {
    executions: HashMap<String, Vec<WorkflowExecution>>,
}

impl ExecutionRegistry {
    /// Applies the reuse policy against the most recent run of
    /// `workflow_id` and, when admitted, records a fresh `Running` run
    /// under a new run id.
    ///
    /// A running prior always rejects. A completed prior rejects unless
    /// the policy is `Allow`. Any other terminal prior rejects only under
    /// `Reject`. The rejection carries the prior run's id.
    pub(crate) fn admit(&mut self, workflow_id: &str, reuse_policy: ReusePolicy) -> Result<String, ApiError> {
        if let Some(prior) = self.latest(workflow_id) {
            let reusable = match prior.status {
                ExecutionStatus::Running => false,
                ExecutionStatus::Completed => matches!(reuse_policy, ReusePolicy::Allow),
                _ => !matches!(reuse_policy, ReusePolicy::Reject),
            };
            if !reusable {
                return Err(ApiError::WorkflowExecutionAlreadyStarted {
                    workflow_id: workflow_id.to_string(),
                    run_id: prior.run_id.clone(),
                });
            }
        }

        let run_id = Uuid::new_v4().to_string();
        self.insert(workflow_id, &run_id, ExecutionStatus::Running);
        Ok(run_id)
    }

    pub(crate) fn insert(&mut self, workflow_id: &str, run_id: &str, status: ExecutionStatus) {
        self.executions.entry(workflow_id.to_string()).or_default().push(WorkflowExecution {
            workflow_id: workflow_id.to_string(),
            run_id: run_id.to_string(),
            status,
            result: None,
            failure: None,
        });
    }

    pub(crate) fn record_completed(&mut self, workflow_id: &str, run_id: &str, result: String) {
        self.transition(workflow_id, run_id, ExecutionStatus::Completed, Some(result), None);
    }

    pub(crate) fn record_failed(&mut self, workflow_id: &str, run_id: &str, failure: String) {
        self.transition(workflow_id, run_id, ExecutionStatus::Failed, None, Some(failure));
    }

    pub(crate) fn latest(&self, workflow_id: &str) -> Option<&WorkflowExecution> {
        self.executions.get(workflow_id).and_then(|runs| runs.last())
    }

    pub(crate) fn status_of(&self, workflow_id: &str, run_id: &str) -> Option<ExecutionStatus> {
        self.find(workflow_id, run_id).map(|run| run.status)
    }

    pub(crate) fn runs_of(&self, workflow_id: &str) -> Vec<WorkflowExecution> {
        self.executions.get(workflow_id).cloned().unwrap_or_default()
    }

    pub(crate) fn clear(&mut self) {
        self.executions.clear();
    }

    fn find(&self, workflow_id: &str, run_id: &str) -> Option<&WorkflowExecution> {
        self.executions
            .get(workflow_id)
            .and_then(|runs| runs.iter().find(|run| run.run_id == run_id))
    }

    fn transition(
        &mut self,
        workflow_id: &str,
        run_id: &str,
        status: ExecutionStatus,
        result: Option<String>,
        failure: Option<String>,
    ) {
        if let Some(run) = self
            .executions
            .get_mut(workflow_id)
            .and_then(|runs| runs.iter_mut().find(|run| run.run_id == run_id))
        {
            run.status = status;
            run.result = result;
            run.failure = failure;
        }
    }
}

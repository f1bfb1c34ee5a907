//! Failure taxonomy for the client runtime.
//!
//! Every fallible surface in the crate reports one of five families:
//! - [`InternalError`]: bugs in the runtime itself. Never swallowed.
//! - [`ClientError`]: caller mistakes and handler-raised failures.
//! - [`ApiError`]: structured rejections from the orchestration service.
//! - [`WorkflowError`]: terminal outcomes surfaced while awaiting a result.
//! - [`WorkflowRunError`]: a run that ended without producing a result.
//!
//! The umbrella [`Error`] carries whichever family applies so call sites can
//! match on the broad class first and drill into variants when they care.

use thiserror::Error;

/// Defects inside the runtime. These indicate a bug in this crate, not in
/// caller code, and are always logged at error level before being reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InternalError {
    /// Replay of workflow history diverged from the recorded decisions.
    #[error("non-deterministic workflow execution: {message}")]
    NonDeterministicWorkflow { message: String },

    /// A command could not be encoded for the wire.
    #[error("failed to serialize command: {message}")]
    Serialization { message: String },
}

/// Mistakes made by the caller, plus failures raised explicitly by handler
/// code that are meant to propagate to whoever invoked it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("operation timed out: {message}")]
    Timeout { message: String },

    #[error("activity '{name}' is not registered on this worker")]
    ActivityNotRegistered { name: String },

    #[error("workflow '{name}' is not registered on this worker")]
    WorkflowNotRegistered { name: String },

    /// A failure raised by handler code, propagated to the caller verbatim.
    #[error("{message}")]
    ActivityException { message: String },

    #[error("invalid retry policy: {message}")]
    InvalidRetryPolicy { message: String },

    #[error("a handler named '{name}' is already registered")]
    AlreadyRegistered { name: String },
}

/// Structured rejections returned by the orchestration service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("not found: {message}")]
    NotFound { message: String },

    /// The workflow id is already taken by a prior execution. Carries the
    /// run id of that execution so callers can attach to it.
    #[error("workflow '{workflow_id}' was already started (run id {run_id})")]
    WorkflowExecutionAlreadyStarted { workflow_id: String, run_id: String },

    #[error("namespace '{namespace}' is not active")]
    NamespaceNotActive { namespace: String },

    #[error("namespace '{namespace}' already exists")]
    NamespaceAlreadyExists { namespace: String },

    #[error("client version is not supported: {message}")]
    ClientVersionNotSupported { message: String },

    #[error("cancellation was already requested for workflow '{workflow_id}'")]
    CancellationAlreadyRequested { workflow_id: String },

    #[error("query failed: {message}")]
    QueryFailed { message: String },

    /// The request never produced a structured answer: connectivity loss,
    /// malformed response, or any other transport-level fault.
    #[error("transport failure: {message}")]
    Transport { message: String },
}

/// Terminal outcomes observed while awaiting a workflow result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("workflow timed out")]
    TimedOut,

    #[error("workflow was terminated")]
    Terminated,

    #[error("workflow was canceled")]
    Canceled,
}

/// The awaited run finished without a result of its own.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowRunError {
    /// The run closed by handing off to a fresh run. Carries the run id of
    /// the continuation so callers can follow the chain.
    #[error("workflow run continued as new run {new_run_id}")]
    ContinuedAsNew { new_run_id: String },
}

/// Umbrella error for every fallible operation in the crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Internal(#[from] InternalError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    WorkflowRun(#[from] WorkflowRunError),

    /// Raised by the simulation harness when a trigger names a workflow id
    /// that has no registered schedule.
    #[error("no schedule is registered for workflow id '{workflow_id}'")]
    NotScheduled { workflow_id: String },
}

impl Error {
    /// True when the failure is a runtime defect rather than a caller or
    /// service fault.
    pub fn is_internal(&self) -> bool {
        matches!(self, Error::Internal(_))
    }

    /// The prior run id when the failure reports an id collision.
    pub fn already_started_run_id(&self) -> Option<&str> {
        match self {
            Error::Api(ApiError::WorkflowExecutionAlreadyStarted { run_id, .. }) => Some(run_id),
            _ => None,
        }
    }
}

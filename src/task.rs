use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Category of work a dequeued task represents. Drives handler lookup and
/// how an unknown handler name is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    Activity,
    Workflow,
}

/// A unit of work dequeued from a task queue.
///
/// The token is opaque to this crate; it is echoed back verbatim when the
/// outcome is reported. The payload is a JSON string produced by the caller
/// that scheduled the work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub token: String,
    pub kind: TaskKind,
    pub namespace: String,
    pub task_queue: String,
    /// Registered name of the activity or workflow to run.
    pub handler_name: String,
    pub payload: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub run_id: Option<String>,
}

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::metrics::{MetricsSink, NoopMetrics};
use crate::options::{RetryPolicy, TimeoutKind};

/// Global runtime configuration.
///
/// The namespace, task queue, timeouts, and headers recorded here are the
/// lowest-priority source when per-call options are resolved. The metrics
/// sink receives every timing sample the runtime emits.
#[derive(Clone)]
pub struct Configuration {
    pub namespace: String,
    pub task_queue: String,
    pub retry_policy: Option<RetryPolicy>,
    pub timeouts: HashMap<TimeoutKind, Duration>,
    pub headers: HashMap<String, String>,
    pub metrics: Arc<dyn MetricsSink>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }
}

impl Default for Configuration {
    fn default() -> Self {
        let mut timeouts = HashMap::new();
        timeouts.insert(TimeoutKind::Execution, Duration::from_secs(86_400));
        timeouts.insert(TimeoutKind::Run, Duration::from_secs(86_400));
        timeouts.insert(TimeoutKind::Task, Duration::from_secs(10));

        Self {
            namespace: "default".to_string(),
            task_queue: "default".to_string(),
            retry_policy: None,
            timeouts,
            headers: HashMap::new(),
            metrics: Arc::new(NoopMetrics),
        }
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("namespace", &self.namespace)
            .field("task_queue", &self.task_queue)
            .field("retry_policy", &self.retry_policy)
            .field("timeouts", &self.timeouts)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

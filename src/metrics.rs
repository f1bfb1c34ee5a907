//! Pluggable metrics reporting.
//!
//! The runtime emits timing samples at a few fixed points (poll spacing,
//! task latency). Hosts route them wherever they like by installing a
//! [`MetricsSink`] in the configuration; the default sink discards
//! everything.

use std::sync::Mutex;
use std::time::Duration;

/// Names of the timing metrics the runtime emits.
pub mod names {
    /// Elapsed time between consecutive polls on one task queue, recorded
    /// once per poll iteration.
    pub const TIME_SINCE_LAST_POLL: &str = "activity_poller.time_since_last_poll";
    /// Wall-clock time spent processing one activity task.
    pub const ACTIVITY_TASK_LATENCY: &str = "activity_task.latency";
    /// Wall-clock time spent processing one workflow task.
    pub const WORKFLOW_TASK_LATENCY: &str = "workflow_task.latency";
}

/// Receiver for timing samples emitted by the runtime.
pub trait MetricsSink: Send + Sync {
    fn timing(&self, metric: &str, duration: Duration, tags: &[(&str, &str)]);
}

/// Discards every sample. Installed by default.
#[derive(Debug, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn timing(&self, _metric: &str, _duration: Duration, _tags: &[(&str, &str)]) {}
}

/// One recorded timing sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingSample {
    pub metric: String,
    pub duration: Duration,
    pub tags: Vec<(String, String)>,
}

/// Collects samples in memory so tests can assert on what was emitted.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    timings: Mutex<Vec<TimingSample>>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every sample recorded so far, in emission order.
    pub fn timings(&self) -> Vec<TimingSample> {
        self.timings.lock().expect("metrics mutex should not be poisoned").clone()
    }

    /// Samples recorded under one metric name.
    pub fn timings_named(&self, metric: &str) -> Vec<TimingSample> {
        self.timings().into_iter().filter(|sample| sample.metric == metric).collect()
    }
}

impl MetricsSink for InMemoryMetrics {
    fn timing(&self, metric: &str, duration: Duration, tags: &[(&str, &str)]) {
        let sample = TimingSample {
            metric: metric.to_string(),
            duration,
            tags: tags.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        };
        self.timings.lock().expect("metrics mutex should not be poisoned").push(sample);
    }
}

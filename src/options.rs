//! Per-call execution options and the rules for resolving them.
//!
//! Options arrive from up to three sources in ascending priority: global
//! configuration defaults, defaults exposed by the invoked object, and
//! explicit per-call options. [`ExecutionOptions::resolve`] merges them
//! once, up front, so everything downstream reads a single immutable value.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Configuration;
use crate::error::ClientError;

/// Which phase of an execution a timeout bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeoutKind {
    /// Whole execution, across continue-as-new runs.
    Execution,
    /// A single run.
    Run,
    /// One workflow task.
    Task,
    ScheduleToClose,
    ScheduleToStart,
    StartToClose,
    Heartbeat,
}

/// Retry behavior requested for an execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub interval: Option<Duration>,
    pub backoff_coefficient: Option<f64>,
    pub max_interval: Option<Duration>,
    /// Total attempts including the first. `None` means unlimited.
    pub max_attempts: Option<u32>,
    /// Failure types that must not be retried.
    pub non_retriable_errors: Vec<String>,
}

impl RetryPolicy {
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.max_attempts == Some(0) {
            return Err(ClientError::InvalidRetryPolicy {
                message: "max_attempts must be at least 1".to_string(),
            });
        }
        if self.max_attempts != Some(1) && (self.interval.is_none() || self.backoff_coefficient.is_none()) {
            return Err(ClientError::InvalidRetryPolicy {
                message: "interval and backoff_coefficient are required unless max_attempts is 1".to_string(),
            });
        }
        if let Some(interval) = self.interval {
            if interval.is_zero() {
                return Err(ClientError::InvalidRetryPolicy {
                    message: "interval must be greater than zero".to_string(),
                });
            }
        }
        if let Some(backoff) = self.backoff_coefficient {
            if backoff < 1.0 {
                return Err(ClientError::InvalidRetryPolicy {
                    message: "backoff_coefficient must be at least 1.0".to_string(),
                });
            }
        }
        if let (Some(max_interval), Some(interval)) = (self.max_interval, self.interval) {
            if max_interval < interval {
                return Err(ClientError::InvalidRetryPolicy {
                    message: "max_interval must not be smaller than interval".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// What to do when a start request reuses a workflow id that already has an
/// execution on record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReusePolicy {
    /// Never reuse the id while any prior execution exists.
    Reject,
    /// Reuse the id after any terminal outcome.
    Allow,
    /// Reuse the id only when the prior execution did not complete
    /// successfully.
    #[default]
    AllowFailed,
}

/// Defaults an invokable object may expose for its own executions.
///
/// Every method is optional; the resolver consults whichever ones the
/// object actually provides and falls through to global configuration for
/// the rest.
pub trait DefaultsProvider: Send + Sync {
    fn namespace(&self) -> Option<String> {
        None
    }

    fn task_queue(&self) -> Option<String> {
        None
    }

    fn retry_policy(&self) -> Option<RetryPolicy> {
        None
    }

    fn timeouts(&self) -> HashMap<TimeoutKind, Duration> {
        HashMap::new()
    }

    fn headers(&self) -> HashMap<String, String> {
        HashMap::new()
    }
}

/// Options supplied explicitly on a single start or schedule call. All
/// fields are optional; unset fields fall back to object defaults and then
/// to global configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StartOptions {
    /// Overrides the registered name of the invoked object.
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub task_queue: Option<String>,
    pub retry_policy: Option<RetryPolicy>,
    pub timeouts: HashMap<TimeoutKind, Duration>,
    pub headers: HashMap<String, String>,
    /// Caller-chosen workflow id. Generated when absent.
    pub workflow_id: Option<String>,
    pub workflow_id_reuse_policy: Option<ReusePolicy>,
}

/// The fully resolved options for one execution. Built once per call and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOptions {
    name: String,
    namespace: Option<String>,
    task_queue: Option<String>,
    retry_policy: Option<RetryPolicy>,
    timeouts: HashMap<TimeoutKind, Duration>,
    headers: HashMap<String, String>,
}

impl ExecutionOptions {
    /// Merges explicit call options over object defaults over global
    /// configuration. Scalars take the first value present in that order;
    /// timeout and header maps overlay key by key, higher priority winning.
    ///
    /// Fails when the winning retry policy does not validate.
    pub fn resolve(
        fallback_name: &str,
        target: Option<&dyn DefaultsProvider>,
        call: &StartOptions,
        defaults: Option<&Configuration>,
    ) -> Result<Self, ClientError> {
        let mut namespace = call.namespace.clone();
        let mut task_queue = call.task_queue.clone();
        let mut retry_policy = call.retry_policy.clone();
        let mut timeouts = call.timeouts.clone();
        let mut headers = call.headers.clone();

        if let Some(target) = target {
            namespace = namespace.or_else(|| target.namespace());
            task_queue = task_queue.or_else(|| target.task_queue());
            retry_policy = retry_policy.or_else(|| target.retry_policy());
            timeouts = overlay(target.timeouts(), timeouts);
            headers = overlay(target.headers(), headers);
        }

        if let Some(defaults) = defaults {
            namespace = namespace.or_else(|| Some(defaults.namespace.clone()));
            task_queue = task_queue.or_else(|| Some(defaults.task_queue.clone()));
            retry_policy = retry_policy.or_else(|| defaults.retry_policy.clone());
            timeouts = overlay(defaults.timeouts.clone(), timeouts);
            headers = overlay(defaults.headers.clone(), headers);
        }

        if let Some(policy) = &retry_policy {
            policy.validate()?;
        }

        Ok(Self {
            name: call.name.clone().unwrap_or_else(|| fallback_name.to_string()),
            namespace,
            task_queue,
            retry_policy,
            timeouts,
            headers,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn task_queue(&self) -> Option<&str> {
        self.task_queue.as_deref()
    }

    pub fn retry_policy(&self) -> Option<&RetryPolicy> {
        self.retry_policy.as_ref()
    }

    pub fn timeouts(&self) -> &HashMap<TimeoutKind, Duration> {
        &self.timeouts
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }
}

fn overlay<K, V>(base: HashMap<K, V>, over: HashMap<K, V>) -> HashMap<K, V>
where
    K: std::hash::Hash + Eq,
{
    let mut merged = base;
    merged.extend(over);
    merged
}

use std::collections::HashMap;
use std::time::Duration;

use windlass::config::Configuration;
use windlass::error::ClientError;
use windlass::options::{DefaultsProvider, ExecutionOptions, RetryPolicy, StartOptions, TimeoutKind};

struct BillingDefaults;

impl DefaultsProvider for BillingDefaults {
    fn task_queue(&self) -> Option<String> {
        Some("billing".to_string())
    }

    fn timeouts(&self) -> HashMap<TimeoutKind, Duration> {
        HashMap::from([
            (TimeoutKind::Run, Duration::from_secs(60)),
            (TimeoutKind::Task, Duration::from_secs(5)),
        ])
    }

    fn headers(&self) -> HashMap<String, String> {
        HashMap::from([("team".to_string(), "billing".to_string())])
    }
}

fn valid_retry_policy(interval_secs: u64) -> RetryPolicy {
    RetryPolicy {
        interval: Some(Duration::from_secs(interval_secs)),
        backoff_coefficient: Some(2.0),
        max_interval: None,
        max_attempts: Some(3),
        non_retriable_errors: Vec::new(),
    }
}

#[test]
fn explicit_options_win_over_every_default() {
    let config = Configuration::default();
    let call = StartOptions {
        namespace: Some("payments".to_string()),
        task_queue: Some("priority".to_string()),
        retry_policy: Some(valid_retry_policy(7)),
        timeouts: HashMap::from([(TimeoutKind::Task, Duration::from_secs(2))]),
        headers: HashMap::from([("team".to_string(), "ops".to_string())]),
        ..StartOptions::default()
    };

    let resolved =
        ExecutionOptions::resolve("SendInvoice", Some(&BillingDefaults), &call, Some(&config)).unwrap();

    assert_eq!(resolved.name(), "SendInvoice");
    assert_eq!(resolved.namespace(), Some("payments"));
    assert_eq!(resolved.task_queue(), Some("priority"));
    assert_eq!(resolved.retry_policy().and_then(|p| p.interval), Some(Duration::from_secs(7)));
    assert_eq!(resolved.timeouts().get(&TimeoutKind::Task), Some(&Duration::from_secs(2)));
    assert_eq!(resolved.headers().get("team"), Some(&"ops".to_string()));
}

#[test]
fn object_defaults_fill_fields_the_call_left_unset() {
    let config = Configuration::default();
    let call = StartOptions::default();

    let resolved =
        ExecutionOptions::resolve("SendInvoice", Some(&BillingDefaults), &call, Some(&config)).unwrap();

    // Task queue comes from the object, namespace falls through to config.
    assert_eq!(resolved.task_queue(), Some("billing"));
    assert_eq!(resolved.namespace(), Some("default"));
    assert_eq!(resolved.headers().get("team"), Some(&"billing".to_string()));
}

#[test]
fn timeout_maps_overlay_key_by_key() {
    let config = Configuration::default();
    let call = StartOptions {
        timeouts: HashMap::from([(TimeoutKind::Task, Duration::from_secs(2))]),
        ..StartOptions::default()
    };

    let resolved =
        ExecutionOptions::resolve("SendInvoice", Some(&BillingDefaults), &call, Some(&config)).unwrap();

    // Each key independently takes the highest-priority source that set it.
    assert_eq!(resolved.timeouts().get(&TimeoutKind::Task), Some(&Duration::from_secs(2)));
    assert_eq!(resolved.timeouts().get(&TimeoutKind::Run), Some(&Duration::from_secs(60)));
    assert_eq!(resolved.timeouts().get(&TimeoutKind::Execution), Some(&Duration::from_secs(86_400)));
}

#[test]
fn call_name_overrides_the_fallback_name() {
    let call = StartOptions {
        name: Some("SendInvoiceV2".to_string()),
        ..StartOptions::default()
    };

    let resolved = ExecutionOptions::resolve("SendInvoice", None, &call, None).unwrap();
    assert_eq!(resolved.name(), "SendInvoiceV2");
}

#[test]
fn resolve_works_with_no_target_and_no_global_defaults() {
    let resolved = ExecutionOptions::resolve("SendInvoice", None, &StartOptions::default(), None).unwrap();

    assert_eq!(resolved.name(), "SendInvoice");
    assert_eq!(resolved.namespace(), None);
    assert_eq!(resolved.task_queue(), None);
    assert!(resolved.timeouts().is_empty());
    assert!(resolved.headers().is_empty());
}

#[test]
fn global_retry_policy_applies_when_nothing_closer_sets_one() {
    let mut config = Configuration::default();
    config.retry_policy = Some(valid_retry_policy(11));

    let resolved =
        ExecutionOptions::resolve("SendInvoice", None, &StartOptions::default(), Some(&config)).unwrap();

    assert_eq!(resolved.retry_policy().and_then(|p| p.interval), Some(Duration::from_secs(11)));
}

#[test]
fn invalid_retry_policy_is_rejected_at_resolve_time() {
    let call = StartOptions {
        retry_policy: Some(RetryPolicy {
            interval: None,
            backoff_coefficient: None,
            max_interval: None,
            max_attempts: Some(3),
            non_retriable_errors: Vec::new(),
        }),
        ..StartOptions::default()
    };

    let error = ExecutionOptions::resolve("SendInvoice", None, &call, None).unwrap_err();
    assert!(matches!(error, ClientError::InvalidRetryPolicy { .. }));
}

#[test]
fn single_attempt_policy_needs_no_interval() {
    let policy = RetryPolicy {
        interval: None,
        backoff_coefficient: None,
        max_interval: None,
        max_attempts: Some(1),
        non_retriable_errors: Vec::new(),
    };
    assert!(policy.validate().is_ok());
}

#[test]
fn zero_max_attempts_is_rejected() {
    let policy = RetryPolicy {
        max_attempts: Some(0),
        ..valid_retry_policy(3)
    };
    assert!(matches!(policy.validate(), Err(ClientError::InvalidRetryPolicy { .. })));
}

#[test]
fn backoff_below_one_is_rejected() {
    let policy = RetryPolicy {
        backoff_coefficient: Some(0.5),
        ..valid_retry_policy(3)
    };
    assert!(matches!(policy.validate(), Err(ClientError::InvalidRetryPolicy { .. })));
}

#[test]
fn max_interval_smaller_than_interval_is_rejected() {
    let policy = RetryPolicy {
        max_interval: Some(Duration::from_secs(1)),
        ..valid_retry_policy(10)
    };
    assert!(matches!(policy.validate(), Err(ClientError::InvalidRetryPolicy { .. })));
}

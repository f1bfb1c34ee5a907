mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use common::FakeConnection;
use windlass::client::Client;
use windlass::config::Configuration;
use windlass::connection::StartWorkflowExecutionResponse;
use windlass::error::ApiError;
use windlass::options::{DefaultsProvider, ReusePolicy, StartOptions, TimeoutKind};
use windlass::registry::{HandlerRegistry, Lookup};
use windlass::testing::{ExecutionStatus, LocalOrchestrator};

struct BillingDefaults;

impl DefaultsProvider for BillingDefaults {
    fn task_queue(&self) -> Option<String> {
        Some("billing".to_string())
    }

    fn headers(&self) -> HashMap<String, String> {
        HashMap::from([("team".to_string(), "billing".to_string())])
    }
}

fn remote_client() -> (Arc<FakeConnection>, Client) {
    let connection = Arc::new(FakeConnection::scripted_idle(vec![]));
    let client = Client::new(connection.clone(), Configuration::default());
    (connection, client)
}

fn local_client() -> (Arc<LocalOrchestrator>, Client) {
    let lookup: Arc<dyn Lookup> = Arc::new(
        HandlerRegistry::builder()
            .register_workflow("Greet", |_ctx, input: String| async move { Ok(format!("hello {input}")) })
            .build()
            .unwrap(),
    );
    let orchestrator = Arc::new(LocalOrchestrator::new(lookup, Configuration::default()));
    let client = Client::local(Arc::clone(&orchestrator));
    (orchestrator, client)
}

#[tokio::test]
async fn a_remote_start_sends_the_resolved_request() {
    let (connection, client) = remote_client();
    connection.push_start_response(Ok(StartWorkflowExecutionResponse { run_id: "run-42".to_string() }));

    let options = StartOptions {
        namespace: Some("payments".to_string()),
        workflow_id: Some("order-1".to_string()),
        timeouts: HashMap::from([(TimeoutKind::Task, Duration::from_secs(5))]),
        ..StartOptions::default()
    };
    let run_id = client.start_workflow("Charge", "{\"amount\":5}", options).await.unwrap();
    assert_eq!(run_id, "run-42");

    let started = connection.started();
    assert_eq!(started.len(), 1);
    let request = &started[0];
    assert_eq!(request.workflow_name, "Charge");
    assert_eq!(request.workflow_id, "order-1");
    assert_eq!(request.namespace, "payments");
    assert_eq!(request.task_queue, "default");
    assert_eq!(request.input, "{\"amount\":5}");
    assert_eq!(request.reuse_policy, ReusePolicy::AllowFailed);
    assert_eq!(request.cron_schedule, None);
    // Call-site timeouts overlay the global map key by key.
    assert_eq!(request.timeouts.get(&TimeoutKind::Task), Some(&Duration::from_secs(5)));
    assert_eq!(request.timeouts.get(&TimeoutKind::Execution), Some(&Duration::from_secs(86_400)));
}

#[tokio::test]
async fn object_defaults_reach_the_remote_request() {
    let (connection, client) = remote_client();

    client
        .start_workflow_with("SendInvoice", Some(&BillingDefaults), "{}", StartOptions::default())
        .await
        .unwrap();

    let request = &connection.started()[0];
    assert_eq!(request.task_queue, "billing");
    assert_eq!(request.headers.get("team"), Some(&"billing".to_string()));
}

#[tokio::test]
async fn a_workflow_id_is_generated_when_none_is_given() {
    let (connection, client) = remote_client();

    client.start_workflow("Charge", "{}", StartOptions::default()).await.unwrap();
    client.start_workflow("Charge", "{}", StartOptions::default()).await.unwrap();

    let started = connection.started();
    assert!(!started[0].workflow_id.is_empty());
    assert!(!started[1].workflow_id.is_empty());
    assert_ne!(started[0].workflow_id, started[1].workflow_id);
}

#[tokio::test]
async fn an_id_collision_rejection_carries_the_prior_run_id() {
    let (connection, client) = remote_client();
    connection.push_start_response(Err(ApiError::WorkflowExecutionAlreadyStarted {
        workflow_id: "order-1".to_string(),
        run_id: "run-9".to_string(),
    }));

    let options = StartOptions {
        workflow_id: Some("order-1".to_string()),
        ..StartOptions::default()
    };
    let error = client.start_workflow("Charge", "{}", options).await.unwrap_err();

    assert_eq!(error.already_started_run_id(), Some("run-9"));
}

#[tokio::test]
async fn scheduling_remotely_sends_the_cron_expression() {
    let (connection, client) = remote_client();

    let options = StartOptions {
        workflow_id: Some("nightly".to_string()),
        ..StartOptions::default()
    };
    let workflow_id = client.schedule_workflow("NightlyReport", "0 0 * * *", "{}", options).await.unwrap();

    assert_eq!(workflow_id, "nightly");
    let request = &connection.started()[0];
    assert_eq!(request.cron_schedule.as_deref(), Some("0 0 * * *"));
    assert_eq!(request.workflow_name, "NightlyReport");
}

#[tokio::test]
async fn a_local_client_runs_workflows_in_process() {
    let (orchestrator, client) = local_client();

    let options = StartOptions {
        workflow_id: Some("order-1".to_string()),
        ..StartOptions::default()
    };
    let run_id = client.start_workflow("Greet", "sam", options).await.unwrap();

    let record = orchestrator.latest_execution("order-1").await.unwrap();
    assert_eq!(record.run_id, run_id);
    assert_eq!(record.status, ExecutionStatus::Completed);
    assert_eq!(record.result.as_deref(), Some("hello sam"));
}

#[tokio::test]
async fn a_local_client_registers_schedules_in_process() {
    let (orchestrator, client) = local_client();

    let options = StartOptions {
        workflow_id: Some("nightly".to_string()),
        ..StartOptions::default()
    };
    let workflow_id = client.schedule_workflow("Greet", "0 0 * * *", "ops", options).await.unwrap();
    assert_eq!(workflow_id, "nightly");

    let schedules = orchestrator.cron_schedules().await;
    assert_eq!(schedules.get("nightly").map(String::as_str), Some("0 0 * * *"));

    let run_id = orchestrator.execute("nightly").await.unwrap();
    assert_eq!(
        orchestrator.execution_status("nightly", &run_id).await,
        Some(ExecutionStatus::Completed)
    );
}

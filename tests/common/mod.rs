#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use windlass::connection::{Connection, StartWorkflowExecutionRequest, StartWorkflowExecutionResponse};
use windlass::error::{ApiError, Error};
use windlass::task::{Task, TaskKind};

/// What the fake connection returns for one poll, in script order.
pub enum PollScript {
    Idle,
    Deliver(Box<Task>),
    Fail(ApiError),
}

/// Scripted stand-in for the service connection. Polls consume the script
/// front to back; an exhausted script either parks like a real long poll
/// (until `cancel_polling_request`) or keeps answering idle, depending on
/// the constructor.
pub struct FakeConnection {
    scripts: Mutex<VecDeque<PollScript>>,
    poll_hook: Mutex<Option<Box<dyn Fn(usize) + Send + Sync>>>,
    poll_count: AtomicUsize,
    canceled: AtomicBool,
    idle_when_drained: bool,
    reject_responds: AtomicBool,
    completed: Mutex<Vec<(String, String)>>,
    failed: Mutex<Vec<(String, Error)>>,
    started: Mutex<Vec<StartWorkflowExecutionRequest>>,
    start_responses: Mutex<VecDeque<Result<StartWorkflowExecutionResponse, ApiError>>>,
}

impl FakeConnection {
    /// An exhausted script parks the poll until it is canceled.
    pub fn scripted(scripts: Vec<PollScript>) -> Self {
        Self::build(scripts, false)
    }

    /// An exhausted script answers idle immediately.
    pub fn scripted_idle(scripts: Vec<PollScript>) -> Self {
        Self::build(scripts, true)
    }

    fn build(scripts: Vec<PollScript>, idle_when_drained: bool) -> Self {
        Self {
            scripts: Mutex::new(scripts.into_iter().collect()),
            poll_hook: Mutex::new(None),
            poll_count: AtomicUsize::new(0),
            canceled: AtomicBool::new(false),
            idle_when_drained,
            reject_responds: AtomicBool::new(false),
            completed: Mutex::new(Vec::new()),
            failed: Mutex::new(Vec::new()),
            started: Mutex::new(Vec::new()),
            start_responses: Mutex::new(VecDeque::new()),
        }
    }

    /// Runs at the top of every poll with the 1-based poll number. Lets a
    /// test flip a poller to shutdown at an exact loop iteration.
    pub fn set_poll_hook(&self, hook: impl Fn(usize) + Send + Sync + 'static) {
        *self.poll_hook.lock().unwrap() = Some(Box::new(hook));
    }

    /// Makes respond_completed/respond_failed fail with a transport error.
    pub fn reject_responds(&self) {
        self.reject_responds.store(true, Ordering::SeqCst);
    }

    pub fn push_start_response(&self, response: Result<StartWorkflowExecutionResponse, ApiError>) {
        self.start_responses.lock().unwrap().push_back(response);
    }

    pub fn poll_count(&self) -> usize {
        self.poll_count.load(Ordering::SeqCst)
    }

    pub fn was_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> Vec<(String, String)> {
        self.completed.lock().unwrap().clone()
    }

    pub fn failed(&self) -> Vec<(String, Error)> {
        self.failed.lock().unwrap().clone()
    }

    pub fn started(&self) -> Vec<StartWorkflowExecutionRequest> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connection for FakeConnection {
    async fn poll_activity_task_queue(
        &self,
        _namespace: &str,
        _task_queue: &str,
    ) -> Result<Option<Task>, ApiError> {
        let number = self.poll_count.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(hook) = self.poll_hook.lock().unwrap().as_ref() {
            hook(number);
        }

        let script = self.scripts.lock().unwrap().pop_front();
        match script {
            Some(PollScript::Idle) => Ok(None),
            Some(PollScript::Deliver(task)) => Ok(Some(*task)),
            Some(PollScript::Fail(error)) => Err(error),
            None => {
                if self.idle_when_drained {
                    // Pace like a short server-side poll timeout.
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    return Ok(None);
                }
                loop {
                    if self.canceled.load(Ordering::SeqCst) {
                        return Ok(None);
                    }
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            }
        }
    }

    fn cancel_polling_request(&self) {
        self.canceled.store(true, Ordering::SeqCst);
    }

    async fn start_workflow_execution(
        &self,
        request: StartWorkflowExecutionRequest,
    ) -> Result<StartWorkflowExecutionResponse, ApiError> {
        self.started.lock().unwrap().push(request);
        match self.start_responses.lock().unwrap().pop_front() {
            Some(response) => response,
            None => {
                let count = self.started.lock().unwrap().len();
                Ok(StartWorkflowExecutionResponse { run_id: format!("run-{count}") })
            }
        }
    }

    async fn respond_completed(&self, task_token: &str, result: &str) -> Result<(), ApiError> {
        if self.reject_responds.load(Ordering::SeqCst) {
            return Err(ApiError::Transport { message: "respond rejected by test".to_string() });
        }
        self.completed.lock().unwrap().push((task_token.to_string(), result.to_string()));
        Ok(())
    }

    async fn respond_failed(&self, task_token: &str, failure: &Error) -> Result<(), ApiError> {
        if self.reject_responds.load(Ordering::SeqCst) {
            return Err(ApiError::Transport { message: "respond rejected by test".to_string() });
        }
        self.failed.lock().unwrap().push((task_token.to_string(), failure.clone()));
        Ok(())
    }
}

pub fn activity_task(token: &str, handler: &str, payload: &str) -> Task {
    Task {
        token: token.to_string(),
        kind: TaskKind::Activity,
        namespace: "default".to_string(),
        task_queue: "default".to_string(),
        handler_name: handler.to_string(),
        payload: payload.to_string(),
        headers: HashMap::new(),
        workflow_id: None,
        run_id: None,
    }
}

pub fn workflow_task(token: &str, handler: &str, payload: &str) -> Task {
    Task {
        kind: TaskKind::Workflow,
        workflow_id: Some(format!("{token}-wf")),
        run_id: Some(format!("{token}-run")),
        ..activity_task(token, handler, payload)
    }
}

/// Polls `predicate` until it holds or `timeout_ms` elapses.
pub async fn wait_until<F>(predicate: F, timeout_ms: u64) -> bool
where
    F: Fn() -> bool,
{
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if predicate() {
            return true;
        }
        if Instant::now() > deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

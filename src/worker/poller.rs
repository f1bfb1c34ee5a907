//! Long-poll loop against one task queue.
//!
//! A poller owns a single control loop: wait for pool capacity, check for a
//! shutdown request, poll the queue, hand any task to the pool. Polls are
//! strictly sequential, so the pool's capacity is the only thing that bounds
//! in-flight work.
//!
//! Lifecycle: a poller starts in `Created`, moves to `Polling` on
//! [`Poller::start`], to `Stopping` on [`Poller::stop_polling`], and to
//! `Stopped` once [`Poller::wait`] has drained the loop and the pool.
//! [`Poller::cancel_pending_requests`] aborts an in-flight poll so shutdown
//! does not have to sit out a full long-poll timeout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::Configuration;
use crate::connection::Connection;
use crate::metrics::names::TIME_SINCE_LAST_POLL;
use crate::middleware::{Chain, Entry};
use crate::registry::Lookup;
use crate::task::Task;
use crate::worker::pool::TaskPool;
use crate::worker::processor::TaskProcessor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Created,
    Polling,
    Stopping,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct PollerOptions {
    /// Upper bound on tasks processed concurrently from this queue.
    pub max_concurrent_tasks: usize,
}

impl Default for PollerOptions {
    fn default() -> Self {
        Self { max_concurrent_tasks: 20 }
    }
}

pub struct Poller {
    namespace: String,
    task_queue: String,
    connection: Arc<dyn Connection>,
    lookup: Arc<dyn Lookup>,
    chain: Arc<Chain>,
    config: Arc<Configuration>,
    pool: Arc<TaskPool>,
    shutdown_requested: AtomicBool,
    state: Mutex<PollerState>,
    control: Mutex<Option<JoinHandle<()>>>,
}

impl Poller {
    pub fn new(
        namespace: impl Into<String>,
        task_queue: impl Into<String>,
        lookup: Arc<dyn Lookup>,
        middleware: &[Entry],
        config: Arc<Configuration>,
        connection: Arc<dyn Connection>,
        options: PollerOptions,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            task_queue: task_queue.into(),
            connection,
            lookup,
            chain: Arc::new(Chain::new(middleware)),
            config,
            pool: Arc::new(TaskPool::new(options.max_concurrent_tasks)),
            shutdown_requested: AtomicBool::new(false),
            state: Mutex::new(PollerState::Created),
            control: Mutex::new(None),
        }
    }

    /// Spawns the poll loop. Calling start on a poller that has already
    /// been started is a logged no-op.
    pub fn start(self: &Arc<Self>) {
        {
            let mut state = self.state.lock().expect("poller state mutex should not be poisoned");
            if *state != PollerState::Created {
                warn!(
                    namespace = %self.namespace,
                    task_queue = %self.task_queue,
                    state = ?*state,
                    "poller was already started"
                );
                return;
            }
            *state = PollerState::Polling;
        }

        info!(
            namespace = %self.namespace,
            task_queue = %self.task_queue,
            capacity = self.pool.capacity(),
            "starting task queue poller"
        );

        let poller = Arc::clone(self);
        let handle = tokio::spawn(async move { poller.poll_loop().await });
        *self.control.lock().expect("poller control mutex should not be poisoned") = Some(handle);
    }

    /// Asks the loop to exit at its next shutdown check. Returns without
    /// waiting; pair with [`Poller::wait`].
    pub fn stop_polling(&self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
        let mut state = self.state.lock().expect("poller state mutex should not be poisoned");
        if *state == PollerState::Polling {
            *state = PollerState::Stopping;
        }
        info!(namespace = %self.namespace, task_queue = %self.task_queue, "poller shutting down");
    }

    /// Aborts an in-flight poll so a stop request takes effect promptly.
    pub fn cancel_pending_requests(&self) {
        self.connection.cancel_polling_request();
    }

    /// Waits for the poll loop to exit, then drains the pool. Only returns
    /// once every task already dequeued has finished processing.
    pub async fn wait(&self) {
        let handle = self.control.lock().expect("poller control mutex should not be poisoned").take();
        if let Some(handle) = handle {
            if let Err(error) = handle.await {
                error!(
                    namespace = %self.namespace,
                    task_queue = %self.task_queue,
                    %error,
                    "poll loop terminated abnormally"
                );
            }
        }
        self.pool.shutdown().await;
        *self.state.lock().expect("poller state mutex should not be poisoned") = PollerState::Stopped;
    }

    pub fn state(&self) -> PollerState {
        *self.state.lock().expect("poller state mutex should not be poisoned")
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn task_queue(&self) -> &str {
        &self.task_queue
    }

    fn shutting_down(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }

    async fn poll_loop(self: Arc<Self>) {
        let mut last_poll: Option<Instant> = None;
        loop {
            self.pool.wait_for_available_slots().await;
            if self.shutting_down() {
                break;
            }

            // One spacing sample per gap between consecutive polls.
            if let Some(previous) = last_poll {
                self.config.metrics.timing(
                    TIME_SINCE_LAST_POLL,
                    previous.elapsed(),
                    &[
                        ("namespace", self.namespace.as_str()),
                        ("task_queue", self.task_queue.as_str()),
                    ],
                );
            }
            last_poll = Some(Instant::now());

            match self.connection.poll_activity_task_queue(&self.namespace, &self.task_queue).await {
                Ok(Some(task)) => self.schedule_processing(task).await,
                Ok(None) => {}
                Err(error) => {
                    error!(
                        namespace = %self.namespace,
                        task_queue = %self.task_queue,
                        %error,
                        "unable to poll task queue"
                    );
                }
            }
        }
        info!(namespace = %self.namespace, task_queue = %self.task_queue, "poll loop exited");
    }

    async fn schedule_processing(&self, task: Task) {
        let processor = TaskProcessor::new(
            task,
            self.namespace.clone(),
            Arc::clone(&self.lookup),
            Arc::clone(&self.chain),
            Arc::clone(&self.config),
            Arc::clone(&self.connection),
        );
        self.pool.schedule(processor.process()).await;
    }
}

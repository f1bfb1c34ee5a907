//! Bounded pool for concurrent task processing.
//!
//! The pool admits at most `capacity` units at a time. [`TaskPool::schedule`]
//! suspends until a slot frees up, which is what keeps a poller from pulling
//! work faster than it can be processed. A panicking unit is confined to its
//! own slot: the slot is released, the panic logged, and the pool keeps
//! serving.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tracing::{error, warn};

pub struct TaskPool {
    capacity: usize,
    slots: Arc<Semaphore>,
    units: Mutex<JoinSet<()>>,
    shutting_down: AtomicBool,
}

impl TaskPool {
    /// A pool with `capacity` concurrent slots. Capacity is clamped to at
    /// least one slot.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            slots: Arc::new(Semaphore::new(capacity)),
            units: Mutex::new(JoinSet::new()),
            shutting_down: AtomicBool::new(false),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots not currently occupied by running units.
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    /// Suspends until at least one slot is free. Returns immediately once
    /// shutdown has begun.
    pub async fn wait_for_available_slots(&self) {
        if self.shutting_down.load(Ordering::SeqCst) {
            return;
        }
        if let Ok(permit) = self.slots.acquire().await {
            drop(permit);
        }
    }

    /// Runs `unit` on a pool slot, suspending the caller until a slot is
    /// free. Units scheduled after shutdown begins are discarded with a
    /// warning.
    pub async fn schedule<F>(&self, unit: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.shutting_down.load(Ordering::SeqCst) {
            warn!("pool is shutting down, discarding newly scheduled work");
            return;
        }
        let Ok(permit) = Arc::clone(&self.slots).acquire_owned().await else {
            return;
        };
        let mut units = self.units.lock().await;
        while let Some(finished) = units.try_join_next() {
            log_outcome(finished);
        }
        units.spawn(async move {
            unit.await;
            drop(permit);
        });
    }

    /// Stops admitting new work and waits for every in-flight unit to
    /// finish.
    pub async fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
        let mut units = self.units.lock().await;
        while let Some(finished) = units.join_next().await {
            log_outcome(finished);
        }
    }
}

fn log_outcome(outcome: Result<(), JoinError>) {
    if let Err(error) = outcome {
        if error.is_panic() {
            error!(%error, "pooled work unit panicked");
        } else if error.is_cancelled() {
            warn!(%error, "pooled work unit was cancelled");
        }
    }
}

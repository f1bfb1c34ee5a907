//! Middleware pipeline wrapped around task processing.
//!
//! Middleware compose as an onion: the first entry sees the task first and
//! its result last. Each layer receives the task plus a [`Next`] handle and
//! decides whether to continue inward, short-circuit with its own result,
//! or map what came back from deeper layers.

use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::debug;

use crate::error::Error;
use crate::task::Task;

/// Innermost step of the pipeline, supplied per invocation by the caller.
/// Takes whatever it needs from the task up front so the returned future
/// owns its data.
pub type Terminal = dyn Fn(&Task) -> BoxFuture<'static, Result<String, Error>> + Send + Sync;

/// One layer of the pipeline.
#[async_trait::async_trait]
pub trait Middleware: Send + Sync {
    async fn call(&self, task: &Task, next: Next<'_>) -> Result<String, Error>;
}

/// Handle to the remainder of the pipeline. Consumed by [`Next::run`], so a
/// layer can continue inward at most once.
pub struct Next<'a> {
    remaining: &'a [Arc<dyn Middleware>],
    terminal: &'a Terminal,
}

impl<'a> Next<'a> {
    /// Invokes the rest of the pipeline and, at the center, the terminal
    /// step.
    pub async fn run(self, task: &Task) -> Result<String, Error> {
        match self.remaining.split_first() {
            Some((head, rest)) => {
                let next = Next { remaining: rest, terminal: self.terminal };
                head.call(task, next).await
            }
            None => (self.terminal)(task).await,
        }
    }
}

/// Deferred construction of a middleware layer. Entries are declared once
/// on the worker; each chain instantiates its own layer stack from them.
pub struct Entry {
    factory: Box<dyn Fn() -> Arc<dyn Middleware> + Send + Sync>,
}

impl Entry {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Arc<dyn Middleware> + Send + Sync + 'static,
    {
        Self { factory: Box::new(factory) }
    }

    fn init(&self) -> Arc<dyn Middleware> {
        (self.factory)()
    }
}

/// An instantiated middleware stack, ready to wrap invocations.
pub struct Chain {
    middleware: Vec<Arc<dyn Middleware>>,
}

impl Chain {
    /// Instantiates every entry once, in declaration order.
    pub fn new(entries: &[Entry]) -> Self {
        let middleware: Vec<Arc<dyn Middleware>> = entries.iter().map(Entry::init).collect();
        if !middleware.is_empty() {
            debug!(layers = middleware.len(), "initialized middleware chain");
        }
        Self { middleware }
    }

    pub fn empty() -> Self {
        Self { middleware: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    /// Runs `task` through every layer, ending at `terminal`. With no
    /// layers registered this is a plain call to `terminal`.
    pub async fn invoke<F>(&self, task: &Task, terminal: F) -> Result<String, Error>
    where
        F: Fn(&Task) -> BoxFuture<'static, Result<String, Error>> + Send + Sync + 'static,
    {
        let terminal: &Terminal = &terminal;
        let next = Next { remaining: &self.middleware, terminal };
        next.run(task).await
    }
}

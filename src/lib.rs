//! Worker-side client runtime for a workflow orchestration service.
//!
//! The service owns workflow state and task queues; this crate owns the
//! machinery a host process needs to take part: polling queues for work,
//! running registered handlers under a concurrency bound, reporting
//! outcomes, and starting or scheduling workflows from application code.
//!
//! # Components
//!
//! - [`Worker`]: registers activity and workflow handlers, declares
//!   middleware, and runs one [`Poller`] per task queue.
//! - [`Poller`]: a sequential long-poll loop feeding a bounded
//!   [`TaskPool`]. Polling stops cooperatively; in-flight work drains
//!   before shutdown completes.
//! - [`TaskProcessor`]: runs one dequeued task through the middleware
//!   chain and its handler, then reports completion or failure.
//! - [`Client`]: starts and cron-schedules workflow executions, resolving
//!   per-call options against object and global defaults first.
//! - [`testing::LocalOrchestrator`]: an in-process stand-in for the
//!   service. Workflows run synchronously in the caller, with the same
//!   id-reuse rules and execution records the service keeps, so tests
//!   exercise real code paths without a server.
//!
//! The service boundary is the [`Connection`] trait; everything above it
//! is transport-agnostic. Handlers receive an [`ExecutionContext`] and a
//! JSON payload, and the same context is readable ambiently through
//! [`context::current`] while a handler runs.

pub mod client;
pub mod config;
pub mod connection;
pub mod context;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod options;
pub mod registry;
pub mod serializer;
pub mod task;
pub mod testing;
pub mod worker;

pub use client::Client;
pub use config::Configuration;
pub use connection::{Connection, StartWorkflowExecutionRequest, StartWorkflowExecutionResponse};
pub use context::ExecutionContext;
pub use error::{ApiError, ClientError, Error, InternalError, WorkflowError, WorkflowRunError};
pub use options::{
    DefaultsProvider, ExecutionOptions, RetryPolicy, ReusePolicy, StartOptions, TimeoutKind,
};
pub use registry::{FnHandler, HandlerRegistry, HandlerRegistryBuilder, Lookup, TaskHandler};
pub use task::{Task, TaskKind};
pub use worker::{Poller, PollerOptions, PollerState, TaskPool, TaskProcessor, Worker};

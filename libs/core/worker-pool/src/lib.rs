//! Worker Pool - Background Job Processing Library
//!
//! A library for draining work items from a durable message queue with:
//! - Name-keyed job factories reconstructing jobs from JSON arguments
//! - A composable middleware chain (panic recovery, logging, crash
//!   reporting) around every execution
//! - A bounded worker set fed by a rendezvous fan-out channel
//! - A per-job time-to-run deadline after which the message is rejected
//!   and the runaway job abandoned to the backend's redelivery
//! - Graceful shutdown on SIGINT/SIGTERM/SIGUSR1 or caller request
//!
//! # Architecture
//!
//! ```text
//! Queue backend (beanstalkd, SQS, in-memory)
//!   ↓ (poller, one task per reserve)
//! master
//!   ↓ (fan-out channel)
//! workers (N)
//!   ↓ (middleware chain: recovery → logger → job)
//! Factory::make → Job::run
//!   ↓ (status cell)
//! delete on OK / reject on failure
//! ```
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use worker_pool::{Args, Factory, Job, MemoryQueue, Payload, Pool, PoolConfig, PoolError};
//!
//! #[derive(Debug, Default, serde::Serialize)]
//! struct ResizeJob {
//!     width: u32,
//!     height: u32,
//! }
//!
//! impl Factory for ResizeJob {
//!     fn make(&self, args: &Args) -> Result<Box<dyn Job>, PoolError> {
//!         Ok(Box::new(ResizeJob {
//!             width: args.get("width").must_u64(0) as u32,
//!             height: args.get("height").must_u64(0) as u32,
//!         }))
//!     }
//! }
//!
//! #[async_trait::async_trait]
//! impl Job for ResizeJob {
//!     async fn run(&mut self) -> Result<(), PoolError> {
//!         // resize...
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() -> Result<(), PoolError> {
//! let queue = Arc::new(MemoryQueue::new());
//! queue.put(Payload::wrap(&ResizeJob { width: 800, height: 600 })?).await?;
//!
//! let mut pool = Pool::new(queue, PoolConfig::new());
//! pool.add(ResizeJob::default())?;
//!
//! let (_shutdown, on_signals) = tokio::sync::watch::channel(false);
//! pool.run(on_signals).await
//! # }
//! ```

mod args;
mod envelope;
mod error;
mod logger;
mod memory;
pub mod metrics;
mod middleware;
mod poller;
mod pool;
mod queue;
mod recovery;
mod registry;
mod reporter;
pub mod signal;
mod status;

// Re-export all public types
pub use args::{ArgValue, Args};
pub use envelope::{Envelope, Payload};
pub use error::PoolError;
pub use logger::Logger;
pub use memory::{MemoryMessage, MemoryQueue};
pub use middleware::{common_stack, crash_stack, Handler, Next};
pub use pool::{Pool, PoolConfig, DEFAULT_TTR, DEFAULT_WORKERS};
pub use queue::{Message, Queue, QueueStats};
pub use recovery::Recovery;
pub use registry::{struct_name, Factory, Job, Registry};
pub use reporter::CrashReporter;
pub use status::Status;

/// Result type alias for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;

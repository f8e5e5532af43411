//! AWS SQS backend for the worker pool.
//!
//! Uses a main queue plus a `<name>_dead` dead letter queue wired up
//! through the queue's redrive policy. Credentials and region come
//! from the environment (`AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`,
//! `AWS_REGION`, profiles, instance metadata).
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use sqs_queue::SqsQueue;
//! use worker_pool::{Pool, PoolConfig};
//!
//! let queue = SqsQueue::connect("worker-jobs").await?;
//! let mut pool = Pool::new(Arc::new(queue), PoolConfig::new());
//! ```

mod queue;

pub use queue::{SqsMessage, SqsQueue};

//! The contract every queue backend must satisfy.

use crate::args::Args;
use crate::envelope::Payload;
use crate::error::PoolError;
use async_trait::async_trait;
use std::any::Any;
use std::fmt;

/// Best-effort counts of queued work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueStats {
    /// Messages ready for delivery.
    pub ready: u64,
    /// Messages marked failed (buried, dead-lettered).
    pub failed: u64,
}

/// A message reserved from a backend.
///
/// Concrete backends embed an [`crate::Envelope`] and add whatever
/// acknowledgement handle they need (a beanstalk job id, an SQS receipt
/// handle, a counter). The pool never interprets the handle; `as_any`
/// lets the owning backend downcast it back out in `delete`/`reject`.
pub trait Message: fmt::Debug + Send + Sync {
    /// The registered job type name, empty when the payload had none.
    fn kind(&self) -> String;

    /// The job arguments.
    fn args(&self) -> Args;

    /// Downcast seam for the owning backend.
    fn as_any(&self) -> &dyn Any;
}

/// A durable message queue.
///
/// Backends are used concurrently: the master calls `get` while workers
/// call `delete` and `reject`, so implementations must be safe to share.
#[async_trait]
pub trait Queue: Send + Sync {
    /// Serialize the payload into the canonical envelope and enqueue it.
    async fn put(&self, payload: Payload) -> Result<(), PoolError>;

    /// Reserve the next message, blocking up to a short internal
    /// timeout (one second is typical).
    ///
    /// An empty queue must yield an error whose
    /// [`PoolError::is_timeout`] is true so the master retries instead
    /// of shutting down.
    async fn get(&self) -> Result<Box<dyn Message>, PoolError>;

    /// Permanently acknowledge a successfully completed message.
    ///
    /// Backends accept only messages they produced themselves;
    /// anything else is a domain error.
    async fn delete(&self, msg: &dyn Message) -> Result<(), PoolError>;

    /// Mark a message as failed so it stops being redelivered here.
    async fn reject(&self, msg: &dyn Message) -> Result<(), PoolError>;

    /// Best-effort queue depth.
    async fn size(&self) -> Result<QueueStats, PoolError>;
}

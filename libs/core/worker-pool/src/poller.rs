//! Non-blocking wrapper around the backend's blocking `get`.

use crate::error::PoolError;
use crate::queue::{Message, Queue};
use std::sync::Arc;
use tokio::sync::oneshot;

/// Start one poll of the queue on its own task.
///
/// The task always runs the reserve to completion and delivers the
/// result on a one-shot channel, so the master can select between the
/// poll and cancellation without leaking tasks, and a backend holding a
/// stateful connection (the beanstalk protocol is pipelined over one
/// socket) is never abandoned mid-exchange by a cancelled future.
pub(crate) fn poll(
    queue: Arc<dyn Queue>,
) -> oneshot::Receiver<Result<Box<dyn Message>, PoolError>> {
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let result = queue.get().await;
        // The receiver may be gone if the pool shut down mid-poll.
        let _ = tx.send(result);
    });

    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryQueue;

    #[tokio::test]
    async fn test_poll_delivers_timeout_from_empty_queue() {
        let queue: Arc<dyn Queue> = Arc::new(MemoryQueue::new());

        let result = poll(queue).await.expect("poll task died");
        assert!(result.unwrap_err().is_timeout());
    }

    #[tokio::test]
    async fn test_dropped_receiver_does_not_wedge_the_task() {
        let queue: Arc<dyn Queue> = Arc::new(MemoryQueue::new());

        // Dropping the receiver immediately must not panic the task.
        drop(poll(queue));
        tokio::task::yield_now().await;
    }
}

//! In-memory queue backend.
//!
//! An ordered list guarded by a mutex, used as the default backend and
//! in tests. Reserved messages are parked in a separate list so a
//! later reject can still move them to the failed list, and delete
//! actually removes them.

use crate::args::Args;
use crate::envelope::{Envelope, Payload};
use crate::error::PoolError;
use crate::queue::{Message, Queue, QueueStats};
use async_trait::async_trait;
use std::any::Any;
use std::sync::Mutex;
use std::time::Duration;

/// How long an empty reserve waits before reporting a timeout.
const EMPTY_BACKOFF: Duration = Duration::from_millis(5);

#[derive(Debug, Clone)]
pub struct MemoryMessage {
    id: u64,
    envelope: Envelope,
}

impl Message for MemoryMessage {
    fn kind(&self) -> String {
        self.envelope.kind()
    }

    fn args(&self) -> Args {
        self.envelope.args()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Default)]
struct State {
    counter: u64,
    ready: Vec<MemoryMessage>,
    reserved: Vec<MemoryMessage>,
    failed: Vec<MemoryMessage>,
}

/// An in-process queue with monotonic ids.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    state: Mutex<State>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn own(msg: &dyn Message) -> Result<u64, PoolError> {
        msg.as_any()
            .downcast_ref::<MemoryMessage>()
            .map(|m| m.id)
            .ok_or_else(|| {
                PoolError::Queue("bad envelope: message does not belong to this queue".to_string())
            })
    }
}

fn remove(list: &mut Vec<MemoryMessage>, id: u64) -> Option<MemoryMessage> {
    list.iter().position(|m| m.id == id).map(|i| list.remove(i))
}

#[async_trait]
impl Queue for MemoryQueue {
    async fn put(&self, payload: Payload) -> Result<(), PoolError> {
        let body = payload.to_bytes()?;
        let envelope = Envelope::parse(&body)?;

        let mut state = self.lock();
        state.counter += 1;
        let id = state.counter;
        state.ready.push(MemoryMessage { id, envelope });
        Ok(())
    }

    async fn get(&self) -> Result<Box<dyn Message>, PoolError> {
        {
            let mut state = self.lock();
            if let Some(msg) = state.ready.pop() {
                state.reserved.push(msg.clone());
                return Ok(Box::new(msg));
            }
        }

        // Mimic a real backend's short blocking reserve instead of
        // spinning the master.
        tokio::time::sleep(EMPTY_BACKOFF).await;

        let mut state = self.lock();
        match state.ready.pop() {
            Some(msg) => {
                state.reserved.push(msg.clone());
                Ok(Box::new(msg))
            }
            None => Err(PoolError::timeout()),
        }
    }

    async fn delete(&self, msg: &dyn Message) -> Result<(), PoolError> {
        let id = Self::own(msg)?;
        let mut state = self.lock();
        let _ = remove(&mut state.reserved, id).or_else(|| remove(&mut state.ready, id));
        Ok(())
    }

    async fn reject(&self, msg: &dyn Message) -> Result<(), PoolError> {
        let id = Self::own(msg)?;
        let mut state = self.lock();
        if let Some(msg) = remove(&mut state.reserved, id).or_else(|| remove(&mut state.ready, id))
        {
            state.failed.push(msg);
        }
        Ok(())
    }

    async fn size(&self) -> Result<QueueStats, PoolError> {
        let state = self.lock();
        Ok(QueueStats {
            ready: state.ready.len() as u64,
            failed: state.failed.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Factory, Job};
    use serde::Serialize;
    use std::sync::Arc;

    #[derive(Debug, Default, Serialize)]
    struct AddJob {
        x: i64,
        y: i64,
    }

    impl Factory for AddJob {
        fn make(&self, args: &Args) -> Result<Box<dyn Job>, PoolError> {
            Ok(Box::new(AddJob {
                x: args.get("x").must_i64(-1),
                y: args.get("y").must_i64(-1),
            }))
        }
    }

    #[async_trait]
    impl Job for AddJob {
        async fn run(&mut self) -> Result<(), PoolError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_round_trip() {
        let queue = MemoryQueue::new();
        queue
            .put(Payload::wrap(&AddJob { x: 2, y: 3 }).unwrap())
            .await
            .unwrap();

        let msg = queue.get().await.unwrap();
        assert_eq!(msg.kind(), "AddJob");
        assert_eq!(msg.args().get("x").must_i64(-1), 2);
        assert_eq!(msg.args().get("y").must_i64(-1), 3);
    }

    #[tokio::test]
    async fn test_empty_get_is_a_timeout() {
        let queue = MemoryQueue::new();
        for _ in 0..100 {
            assert!(queue.get().await.unwrap_err().is_timeout());
        }
    }

    #[tokio::test]
    async fn test_delete_removes_the_entry() {
        let queue = MemoryQueue::new();
        queue
            .put(Payload::wrap(&AddJob { x: 1, y: 1 }).unwrap())
            .await
            .unwrap();

        let msg = queue.get().await.unwrap();
        queue.delete(msg.as_ref()).await.unwrap();

        let stats = queue.size().await.unwrap();
        assert_eq!(stats, QueueStats { ready: 0, failed: 0 });
    }

    #[tokio::test]
    async fn test_reject_moves_to_failed() {
        let queue = MemoryQueue::new();
        queue
            .put(Payload::wrap(&AddJob { x: 1, y: 1 }).unwrap())
            .await
            .unwrap();

        let msg = queue.get().await.unwrap();
        queue.reject(msg.as_ref()).await.unwrap();

        let stats = queue.size().await.unwrap();
        assert_eq!(stats, QueueStats { ready: 0, failed: 1 });
    }

    #[tokio::test]
    async fn test_get_pops_newest_first() {
        let queue = MemoryQueue::new();
        queue
            .put(Payload::wrap(&AddJob { x: 1, y: 0 }).unwrap())
            .await
            .unwrap();
        queue
            .put(Payload::wrap(&AddJob { x: 2, y: 0 }).unwrap())
            .await
            .unwrap();

        let msg = queue.get().await.unwrap();
        assert_eq!(msg.args().get("x").must_i64(-1), 2);
    }

    #[tokio::test]
    async fn test_concurrent_gets_never_share_a_message() {
        let queue = Arc::new(MemoryQueue::new());
        queue
            .put(Payload::wrap(&AddJob { x: 1, y: 0 }).unwrap())
            .await
            .unwrap();
        queue
            .put(Payload::wrap(&AddJob { x: 2, y: 0 }).unwrap())
            .await
            .unwrap();

        let a = tokio::spawn({
            let queue = Arc::clone(&queue);
            async move { queue.get().await.unwrap() }
        });
        let b = tokio::spawn({
            let queue = Arc::clone(&queue);
            async move { queue.get().await.unwrap() }
        });
        let (a, b) = (a.await.unwrap(), b.await.unwrap());

        let xs = [
            a.args().get("x").must_i64(-1),
            b.args().get("x").must_i64(-1),
        ];
        assert!(xs.contains(&1) && xs.contains(&2));
    }

    #[derive(Debug)]
    struct ForeignMessage;

    impl Message for ForeignMessage {
        fn kind(&self) -> String {
            String::new()
        }

        fn args(&self) -> Args {
            Args::empty()
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[tokio::test]
    async fn test_foreign_messages_are_refused() {
        let queue = MemoryQueue::new();
        let err = queue.delete(&ForeignMessage).await.unwrap_err();
        assert!(matches!(err, PoolError::Queue(_)));
    }
}

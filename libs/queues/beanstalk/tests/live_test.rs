//! Round-trip tests against a live beanstalkd.
//!
//! Run with a local server:
//!
//! ```sh
//! beanstalkd -l 127.0.0.1 -p 11300 &
//! cargo test -p beanstalk-queue -- --ignored
//! ```

use async_trait::async_trait;
use beanstalk_queue::{BeanstalkConfig, BeanstalkQueue};
use serde::Serialize;
use worker_pool::{Args, Factory, Job, Payload, PoolError, Queue};

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
#[ignore = "requires a local beanstalkd"]
async fn test_round_trip() {
    let config = BeanstalkConfig::from_env()
        .unwrap()
        .with_tube("worker-pool-test");
    let queue = BeanstalkQueue::connect(config).await.unwrap();

    let before = queue.size().await.unwrap();

    queue
        .put(Payload::wrap(&AddJob { x: 1, y: 2 }).unwrap())
        .await
        .unwrap();

    let after = queue.size().await.unwrap();
    assert!(after.ready >= before.ready + 1);

    let msg = queue.get().await.unwrap();
    assert_eq!(msg.kind(), "AddJob");
    assert_eq!(msg.args().get("x").must_i64(-1), 1);
    assert_eq!(msg.args().get("y").must_i64(-1), 2);

    queue.delete(msg.as_ref()).await.unwrap();
}

#[tokio::test]
#[ignore = "requires a local beanstalkd"]
async fn test_reject_buries() {
    let config = BeanstalkConfig::from_env()
        .unwrap()
        .with_tube("worker-pool-test-bury");
    let queue = BeanstalkQueue::connect(config).await.unwrap();

    queue
        .put(Payload::wrap(&AddJob { x: 9, y: 9 }).unwrap())
        .await
        .unwrap();

    let msg = queue.get().await.unwrap();
    queue.reject(msg.as_ref()).await.unwrap();

    let stats = queue.size().await.unwrap();
    assert!(stats.failed >= 1);

    // A buried job is not redelivered.
    assert!(queue.get().await.unwrap_err().is_timeout());
}

#[tokio::test]
#[ignore = "requires a local beanstalkd"]
async fn test_empty_reserve_times_out() {
    let config = BeanstalkConfig::from_env()
        .unwrap()
        .with_tube("worker-pool-test-empty");
    let queue = BeanstalkQueue::connect(config).await.unwrap();

    assert!(queue.get().await.unwrap_err().is_timeout());
}

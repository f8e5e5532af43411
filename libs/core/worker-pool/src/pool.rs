//! The pool master, its workers and their shutdown choreography.

use crate::args::Args;
use crate::error::PoolError;
use crate::metrics::{self, JobStatus};
use crate::middleware::{self, Handler, Next};
use crate::poller;
use crate::queue::{Message, Queue};
use crate::registry::{Factory, Registry};
use crate::signal;
use crate::status::Status;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Default pool concurrency.
pub const DEFAULT_WORKERS: usize = 10;

/// Default time to run: how long one job may execute before its worker
/// stops waiting and rejects the message.
pub const DEFAULT_TTR: Duration = Duration::from_secs(5 * 60);

/// Configuration for the worker pool
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of worker tasks
    pub workers: usize,

    /// Time to run for a single job.
    ///
    /// The TTR the backend is given on put should be at least this
    /// value, otherwise the backend redelivers jobs that are still
    /// running.
    pub ttr: Duration,
}

impl PoolConfig {
    pub fn new() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            ttr: DEFAULT_TTR,
        }
    }

    /// Set the pool concurrency
    pub fn with_workers(mut self, count: usize) -> Self {
        self.workers = count.max(1);
        self
    }

    /// Set the per-job time to run
    pub fn with_ttr(mut self, ttr: Duration) -> Self {
        self.ttr = ttr;
        self
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// What the spawned tasks share once the pool is running.
struct PoolInner {
    queue: Arc<dyn Queue>,
    config: PoolConfig,
    registry: Registry,
    handlers: Vec<Arc<dyn Handler>>,
}

impl PoolInner {
    /// Run one message through the middleware chain.
    async fn dispatch(&self, status: &Status, kind: &str, args: &Args) {
        Next::new(&self.handlers, &self.registry)
            .run(status, kind, args)
            .await;
    }
}

type SharedReceiver = Arc<Mutex<mpsc::Receiver<Box<dyn Message>>>>;

/// A pool of workers connected to a queue.
///
/// Factories and middleware are registered up front; [`Pool::run`]
/// consumes the pool, so both are immutable once message processing
/// starts.
///
/// # Example
///
/// ```rust,ignore
/// use worker_pool::{MemoryQueue, Pool, PoolConfig};
///
/// let queue = Arc::new(MemoryQueue::new());
/// let mut pool = Pool::new(queue, PoolConfig::new().with_workers(4));
/// pool.add(ResizeJob::default())?;
///
/// let (_shutdown, signal_only) = tokio::sync::watch::channel(false);
/// pool.run(signal_only).await?;
/// ```
pub struct Pool {
    queue: Arc<dyn Queue>,
    config: PoolConfig,
    registry: Registry,
    handlers: Vec<Arc<dyn Handler>>,
}

impl Pool {
    /// Create a pool over the given queue with the default middleware
    /// stack (recovery + logging).
    pub fn new(queue: Arc<dyn Queue>, config: PoolConfig) -> Self {
        Self {
            queue,
            config,
            registry: Registry::new(),
            handlers: middleware::common_stack(),
        }
    }

    /// Replace the middleware stack wholesale.
    pub fn with_handlers(mut self, handlers: Vec<Arc<dyn Handler>>) -> Self {
        self.handlers = handlers;
        self
    }

    /// Register a job factory.
    pub fn add<F>(&mut self, factory: F) -> Result<(), PoolError>
    where
        F: Factory + 'static,
    {
        self.registry.add(factory)
    }

    /// Append a middleware to the stack.
    pub fn wrap<H>(&mut self, handler: H)
    where
        H: Handler + 'static,
    {
        self.handlers.push(Arc::new(handler));
    }

    /// Process jobs until a shutdown signal, `shutdown` flipping to
    /// true, or a fatal queue error.
    ///
    /// Returns the master's error when polling stopped fatally and
    /// `Ok(())` on any orderly shutdown. Pass the receiver of a
    /// `watch::channel(false)` and drop the sender to run on OS signals
    /// alone.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<(), PoolError> {
        let Pool {
            queue,
            config,
            registry,
            handlers,
        } = self;
        let inner = Arc::new(PoolInner {
            queue,
            config,
            registry,
            handlers,
        });

        info!(
            workers = inner.config.workers,
            ttr_secs = inner.config.ttr.as_secs(),
            jobs = inner.registry.len(),
            "starting worker pool"
        );

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let watcher = tokio::spawn(watch_shutdown(shutdown, cancel_tx));

        // Fan-out channel between the master and the worker set. The
        // master owns the sender, so the channel closes as soon as it
        // returns and releases any worker still blocked on receive.
        let (fan_out, rx) = mpsc::channel::<Box<dyn Message>>(1);
        let rx: SharedReceiver = Arc::new(Mutex::new(rx));

        let mut tasks: JoinSet<Result<(), PoolError>> = JoinSet::new();
        for id in 0..inner.config.workers {
            let inner = Arc::clone(&inner);
            let rx = Arc::clone(&rx);
            let cancel = cancel_rx.clone();
            tasks.spawn(async move {
                worker_loop(id, inner, rx, cancel).await;
                Ok(())
            });
        }
        tasks.spawn(master_loop(Arc::clone(&inner), fan_out, cancel_rx));

        // The workers own the receiver now. If every worker exits (TTR
        // abandonment can use them up), the channel closes and the
        // master stops instead of stalling on a send nobody serves.
        drop(rx);

        let mut fatal: Option<PoolError> = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    if fatal.is_none() {
                        fatal = Some(e);
                    }
                }
                Err(join_err) => warn!(error = %join_err, "pool task ended abnormally"),
            }
        }
        watcher.abort();

        info!("worker pool stopped");
        match fatal {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Resolve once `cancel` carries `true`, without holding a borrowed
/// reference to the watched value across an `.await` (the borrow guard
/// `watch::Ref` wraps isn't `Send`, which would make callers of this
/// inside `tokio::select!` non-`Send`).
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    while !*cancel.borrow() {
        if cancel.changed().await.is_err() {
            return;
        }
    }
}

/// Merge OS signals and the caller's shutdown handle into the pool's
/// internal cancellation channel.
async fn watch_shutdown(mut external: watch::Receiver<bool>, cancel: watch::Sender<bool>) {
    let external_stop = async move {
        // A dropped handle means the caller runs on signals alone.
        while !*external.borrow() {
            if external.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = signal::shutdown_signal() => info!("shutdown signal received, draining"),
        _ = external_stop => info!("shutdown requested, draining"),
    }

    let _ = cancel.send(true);
}

/// Poll the queue and fan messages out to the workers.
async fn master_loop(
    inner: Arc<PoolInner>,
    fan_out: mpsc::Sender<Box<dyn Message>>,
    mut cancel: watch::Receiver<bool>,
) -> Result<(), PoolError> {
    loop {
        if *cancel.borrow() {
            return Ok(());
        }

        let mut poll = poller::poll(Arc::clone(&inner.queue));
        let outcome = tokio::select! {
            _ = cancelled(&mut cancel) => return Ok(()),
            outcome = &mut poll => outcome,
        };

        let msg = match outcome {
            Err(_) => return Err(PoolError::Queue("poll task died before reporting".to_string())),
            Ok(Err(e)) if e.is_timeout() => continue,
            Ok(Err(e)) => {
                error!(error = %e, "queue polling failed, stopping");
                return Err(e);
            }
            Ok(Ok(msg)) => msg,
        };

        tokio::select! {
            _ = cancelled(&mut cancel) => return Ok(()),
            sent = fan_out.send(msg) => {
                // All workers gone; nothing left to feed.
                if sent.is_err() {
                    return Ok(());
                }
            }
        }
    }
}

/// Consume messages from the fan-out channel until it closes.
async fn worker_loop(
    id: usize,
    inner: Arc<PoolInner>,
    rx: SharedReceiver,
    mut cancel: watch::Receiver<bool>,
) {
    debug!(worker = id, "worker started");

    loop {
        let msg = { rx.lock().await.recv().await };
        let Some(msg) = msg else { break };

        let kind = msg.kind();
        let args = msg.args();
        let status = Arc::new(Status::new());
        let started = Instant::now();

        // The job runs on its own task so the worker can stop waiting
        // when the TTR expires. An abandoned job is not interrupted;
        // the backend's own TTR handles redelivery.
        let mut done = {
            let inner = Arc::clone(&inner);
            let status = Arc::clone(&status);
            let kind = kind.clone();
            tokio::spawn(async move {
                inner.dispatch(&status, &kind, &args).await;
            })
        };

        tokio::select! {
            biased;

            joined = &mut done => {
                if let Err(join_err) = joined {
                    if join_err.is_panic() {
                        // Only possible without a recovery middleware
                        // in the stack; the pool still survives.
                        status.set_panic(join_err.into_panic());
                    } else {
                        status.set(PoolError::Job("job task aborted".to_string()));
                    }
                }

                let ok = status.ok();
                metrics::record_job_processed(
                    &kind,
                    if ok { JobStatus::Success } else { JobStatus::Failed },
                );
                metrics::record_job_duration(&kind, started.elapsed());

                if ok {
                    if let Err(e) = inner.queue.delete(msg.as_ref()).await {
                        error!(worker = id, job = %kind, error = %e, "failed to delete message");
                    }
                } else if let Err(e) = inner.queue.reject(msg.as_ref()).await {
                    error!(worker = id, job = %kind, error = %e, "failed to reject message");
                }
            }

            _ = cancelled(&mut cancel) => {
                warn!(worker = id, job = %kind, "shutdown with job in flight, rejecting");
                if let Err(e) = inner.queue.reject(msg.as_ref()).await {
                    error!(worker = id, job = %kind, error = %e, "failed to reject message");
                }
                return;
            }

            _ = tokio::time::sleep(inner.config.ttr) => {
                warn!(
                    worker = id,
                    job = %kind,
                    ttr_secs = inner.config.ttr.as_secs(),
                    "job exceeded time to run, rejecting and abandoning"
                );
                metrics::record_job_processed(&kind, JobStatus::TimedOut);
                if let Err(e) = inner.queue.reject(msg.as_ref()).await {
                    error!(worker = id, job = %kind, error = %e, "failed to reject message");
                }
                return;
            }
        }
    }

    debug!(worker = id, "worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = PoolConfig::new();
        assert_eq!(config.workers, DEFAULT_WORKERS);
        assert_eq!(config.ttr, DEFAULT_TTR);
    }

    #[test]
    fn test_config_builder() {
        let config = PoolConfig::new()
            .with_workers(3)
            .with_ttr(Duration::from_secs(30));
        assert_eq!(config.workers, 3);
        assert_eq!(config.ttr, Duration::from_secs(30));

        // Zero workers would deadlock the master; clamp to one.
        assert_eq!(PoolConfig::new().with_workers(0).workers, 1);
    }
}

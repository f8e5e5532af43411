//! The middleware chain wrapping every job execution.
//!
//! Handlers run outside-in on the way down and inside-out on the way
//! back; the empty tail of the chain is the terminal step that looks up
//! the factory, builds the job, runs it and writes the outcome into the
//! status cell.

use crate::args::Args;
use crate::logger::Logger;
use crate::recovery::Recovery;
use crate::registry::Registry;
use crate::reporter::CrashReporter;
use crate::status::Status;
use async_trait::async_trait;
use std::sync::Arc;

/// A layer around job execution.
///
/// Implementations observe or transform a run by doing work before and
/// after awaiting `next`; dropping `next` without running it skips the
/// job entirely.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, status: &Status, kind: &str, args: &Args, next: Next<'_>);
}

/// The remainder of the middleware chain.
pub struct Next<'a> {
    handlers: &'a [Arc<dyn Handler>],
    registry: &'a Registry,
}

impl<'a> Next<'a> {
    pub(crate) fn new(handlers: &'a [Arc<dyn Handler>], registry: &'a Registry) -> Self {
        Self { handlers, registry }
    }

    /// Invoke the rest of the chain.
    pub async fn run(self, status: &Status, kind: &str, args: &Args) {
        match self.handlers.split_first() {
            Some((head, rest)) => {
                let next = Next {
                    handlers: rest,
                    registry: self.registry,
                };
                head.call(status, kind, args, next).await;
            }
            None => {
                let result = self.registry.execute(kind, args).await;
                status.set_result(result);
            }
        }
    }
}

/// The default stack: panic recovery around execution logging.
pub fn common_stack() -> Vec<Arc<dyn Handler>> {
    vec![Arc::new(Recovery::new()), Arc::new(Logger::new())]
}

/// A stack that reports panics to an external service instead of only
/// logging them.
pub fn crash_stack(reporter: CrashReporter) -> Vec<Arc<dyn Handler>> {
    vec![Arc::new(reporter), Arc::new(Logger::new())]
}

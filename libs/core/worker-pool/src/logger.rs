//! Execution logging middleware.

use crate::args::Args;
use crate::middleware::{Handler, Next};
use crate::status::Status;
use async_trait::async_trait;
use std::time::Instant;
use tracing::{info, warn};

/// Logs job start, elapsed wall time and the final OK/FAIL outcome.
#[derive(Debug, Default)]
pub struct Logger;

impl Logger {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Handler for Logger {
    async fn call(&self, status: &Status, kind: &str, args: &Args, next: Next<'_>) {
        let start = Instant::now();
        info!(job = %kind, args = %args, "job started");

        next.run(status, kind, args).await;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        match status.message() {
            None => info!(job = %kind, elapsed_ms, "job finished OK"),
            Some(error) => warn!(job = %kind, elapsed_ms, error = %error, "job finished FAIL"),
        }
    }
}

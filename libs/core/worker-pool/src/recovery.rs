//! Panic recovery middleware.

use crate::args::Args;
use crate::middleware::{Handler, Next};
use crate::status::{panic_message, Status};
use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tracing::error;

/// Catches panics escaping the rest of the chain.
///
/// The recovered payload is logged and written into the status cell so
/// the worker rejects the message; the panic is not re-raised, so one
/// broken job never takes the pool down.
#[derive(Debug, Default)]
pub struct Recovery;

impl Recovery {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Handler for Recovery {
    async fn call(&self, status: &Status, kind: &str, args: &Args, next: Next<'_>) {
        let run = AssertUnwindSafe(next.run(status, kind, args));
        if let Err(payload) = run.catch_unwind().await {
            error!(
                job = %kind,
                args = %args,
                panic = %panic_message(payload.as_ref()),
                "recovered panic while running job"
            );
            status.set_panic(payload);
        }
    }
}

//! Crash reporting middleware.
//!
//! Like [`crate::Recovery`] but additionally notifies an external
//! service about the panic. The notice is a JSON document POSTed from a
//! detached task, so a slow or unreachable endpoint never delays the
//! worker's reject decision.

use crate::args::Args;
use crate::middleware::{Handler, Next};
use crate::status::{panic_message, Status};
use async_trait::async_trait;
use futures::FutureExt;
use serde_json::json;
use std::panic::AssertUnwindSafe;
use tracing::{debug, error};

/// Reports recovered panics to a JSON webhook endpoint.
pub struct CrashReporter {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
    environment: String,
}

impl CrashReporter {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            token: None,
            environment: "production".to_string(),
        }
    }

    /// Bearer token sent with every notice.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Environment tag attached to every notice.
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Fire-and-forget delivery of one notice.
    fn notify(&self, kind: &str, args: &Args, message: &str) {
        let notice = json!({
            "job": kind,
            "args": args.as_value(),
            "error": message,
            "environment": self.environment,
        });

        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let token = self.token.clone();

        tokio::spawn(async move {
            let mut request = client.post(&endpoint).json(&notice);
            if let Some(token) = token {
                request = request.bearer_auth(token);
            }
            match request.send().await {
                Ok(response) => debug!(status = %response.status(), "crash notice delivered"),
                Err(e) => error!(error = %e, "failed to deliver crash notice"),
            }
        });
    }
}

#[async_trait]
impl Handler for CrashReporter {
    async fn call(&self, status: &Status, kind: &str, args: &Args, next: Next<'_>) {
        let run = AssertUnwindSafe(next.run(status, kind, args));
        if let Err(payload) = run.catch_unwind().await {
            let message = panic_message(payload.as_ref());
            error!(job = %kind, args = %args, panic = %message, "recovered panic while running job");
            self.notify(kind, args, &message);
            status.set_panic(payload);
        }
    }
}

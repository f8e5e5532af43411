//! The single-slot outcome cell shared by the middleware chain and the
//! worker that dispatched it.

use crate::error::PoolError;
use std::any::Any;
use std::sync::Mutex;

/// Records the outcome of one job execution.
///
/// The worker allocates one `Status` per message, the terminal step of
/// the middleware chain writes the job result into it, and recovery
/// layers overwrite it with the panic payload when the job blew up. The
/// worker reads it once the chain settles to pick between delete and
/// reject.
#[derive(Debug, Default)]
pub struct Status {
    slot: Mutex<Option<PoolError>>,
}

impl Status {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure, overwriting any previous outcome.
    pub fn set(&self, err: PoolError) {
        *self.lock() = Some(err);
    }

    /// Record the outcome of the terminal job execution.
    pub fn set_result(&self, result: Result<(), PoolError>) {
        *self.lock() = result.err();
    }

    /// Record a recovered panic payload.
    ///
    /// Arbitrary payloads are formatted into a reportable error so that
    /// `panic!` with a non-string value still produces a status.
    pub fn set_panic(&self, payload: Box<dyn Any + Send>) {
        self.set(PoolError::Panic(panic_message(payload.as_ref())));
    }

    /// Whether the job completed without an error.
    pub fn ok(&self) -> bool {
        self.lock().is_none()
    }

    /// The recorded failure as a display string, if any.
    pub fn message(&self) -> Option<String> {
        self.lock().as_ref().map(|e| e.to_string())
    }

    /// Consume the recorded failure.
    pub fn take(&self) -> Option<PoolError> {
        self.lock().take()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<PoolError>> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Render a panic payload into something loggable.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "opaque panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_status_is_ok() {
        let status = Status::new();
        assert!(status.ok());
        assert_eq!(status.message(), None);
    }

    #[test]
    fn test_set_overwrites() {
        let status = Status::new();
        status.set(PoolError::Job("first".to_string()));
        status.set(PoolError::Job("second".to_string()));
        assert!(!status.ok());
        assert_eq!(status.message().unwrap(), "run: second");
    }

    #[test]
    fn test_set_result_clears_previous_failure() {
        let status = Status::new();
        status.set(PoolError::Job("boom".to_string()));
        status.set_result(Ok(()));
        assert!(status.ok());
    }

    #[test]
    fn test_panic_payloads_are_formatted() {
        let status = Status::new();
        status.set_panic(Box::new("stack overflow"));
        assert_eq!(status.message().unwrap(), "panic: stack overflow");

        status.set_panic(Box::new(42_u32));
        assert_eq!(status.message().unwrap(), "panic: opaque panic payload");
    }

    #[test]
    fn test_take_consumes() {
        let status = Status::new();
        status.set(PoolError::Dispatch("Nope".to_string()));
        assert!(status.take().is_some());
        assert!(status.ok());
    }
}

//! Error types for the worker pool.
//!
//! This module provides:
//! - `PoolError` - The main error type for queue and job operations
//! - Predicate helpers the pool master uses to decide between retrying
//!   and stopping

use thiserror::Error;

/// Errors that can occur while producing, polling or running jobs.
#[derive(Error, Debug)]
pub enum PoolError {
    /// The backend had no message within its reserve timeout.
    /// The master retries these silently.
    #[error("queue timeout: {0}")]
    Timeout(String),

    /// Backend I/O or protocol error.
    #[error("queue error: {0}")]
    Queue(String),

    /// Low level I/O error from a backend transport.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Payload is not well-formed JSON, or a typed decode failed.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// No factory registered for the message's type name.
    #[error("unknown job type {0:?}")]
    Dispatch(String),

    /// A factory failed to build a job from its arguments.
    #[error("make: {0}")]
    Factory(String),

    /// The job itself returned an error.
    #[error("run: {0}")]
    Job(String),

    /// A panic recovered from a running job.
    #[error("panic: {0}")]
    Panic(String),

    /// Factory registration error.
    #[error("registry error: {0}")]
    Registry(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl PoolError {
    /// The canonical "nothing available" error backends return from an
    /// empty `get`.
    pub fn timeout() -> Self {
        Self::Timeout("no message available".to_string())
    }

    /// Check whether this error means the backend simply had no work.
    ///
    /// The master keeps polling on timeouts and stops on everything else.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            ),
            _ => false,
        }
    }

    /// Alias used by callers thinking in terms of temporary failures.
    pub fn is_temporary(&self) -> bool {
        self.is_timeout()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_predicate() {
        assert!(PoolError::timeout().is_timeout());
        assert!(PoolError::timeout().is_temporary());

        let err = PoolError::Io(std::io::Error::new(std::io::ErrorKind::TimedOut, "read"));
        assert!(err.is_timeout());

        assert!(!PoolError::Queue("connection reset".to_string()).is_timeout());
        assert!(!PoolError::Dispatch("AddJob".to_string()).is_timeout());
    }

    #[test]
    fn test_error_display() {
        let err = PoolError::Dispatch("AddJob".to_string());
        assert_eq!(err.to_string(), "unknown job type \"AddJob\"");

        let err = PoolError::Job("division by zero".to_string());
        assert_eq!(err.to_string(), "run: division by zero");
    }
}

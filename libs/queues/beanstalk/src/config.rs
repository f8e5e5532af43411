//! Beanstalkd connection configuration.

use std::time::Duration;
use worker_pool::PoolError;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 11300;
pub const DEFAULT_TUBE: &str = "default";
pub const DEFAULT_PRIORITY: u32 = 100;

/// How long a reserve waits before the backend reports a timeout.
pub const DEFAULT_RESERVE_TIMEOUT: Duration = Duration::from_secs(1);

/// The TTR written on put: twice the pool default, so the server never
/// redelivers a job the pool is still willing to wait for.
pub const DEFAULT_TTR: Duration = Duration::from_secs(2 * worker_pool::DEFAULT_TTR.as_secs());

/// Beanstalkd backend configuration.
///
/// Construct manually, with the builder methods, or from environment
/// variables.
///
/// # Example
///
/// ```ignore
/// use beanstalk_queue::BeanstalkConfig;
///
/// let config = BeanstalkConfig::new()
///     .with_host("queue.internal")
///     .with_tube("mailers");
/// let queue = BeanstalkQueue::connect(config).await?;
/// ```
#[derive(Debug, Clone)]
pub struct BeanstalkConfig {
    /// Beanstalkd host.
    pub host: String,

    /// Beanstalkd port.
    pub port: u16,

    /// Tube used for both put and reserve.
    pub tube: String,

    /// Priority written on put.
    pub priority: u32,

    /// Priority used when burying a rejected job.
    /// Defaults to `priority + 1` when unset.
    pub bury_priority: Option<u32>,

    /// TTR handed to the server on put.
    pub ttr: Duration,

    /// Reserve timeout.
    pub reserve_timeout: Duration,
}

impl BeanstalkConfig {
    pub fn new() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            tube: DEFAULT_TUBE.to_string(),
            priority: DEFAULT_PRIORITY,
            bury_priority: None,
            ttr: DEFAULT_TTR,
            reserve_timeout: DEFAULT_RESERVE_TIMEOUT,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_tube(mut self, tube: impl Into<String>) -> Self {
        self.tube = tube.into();
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_bury_priority(mut self, priority: u32) -> Self {
        self.bury_priority = Some(priority);
        self
    }

    pub fn with_ttr(mut self, ttr: Duration) -> Self {
        self.ttr = ttr;
        self
    }

    pub fn with_reserve_timeout(mut self, timeout: Duration) -> Self {
        self.reserve_timeout = timeout;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// - `BEANSTALK_HOST` (optional, default `localhost`)
    /// - `BEANSTALK_PORT` (optional, default `11300`)
    /// - `BEANSTALK_TUBE` (optional, default `default`)
    pub fn from_env() -> Result<Self, PoolError> {
        let mut config = Self::new();

        if let Ok(host) = std::env::var("BEANSTALK_HOST") {
            config.host = host;
        }
        if let Ok(port) = std::env::var("BEANSTALK_PORT") {
            config.port = port
                .parse()
                .map_err(|e| PoolError::Config(format!("BEANSTALK_PORT: {e}")))?;
        }
        if let Ok(tube) = std::env::var("BEANSTALK_TUBE") {
            config.tube = tube;
        }

        Ok(config)
    }

    /// The socket address to dial.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The effective bury priority.
    pub fn bury_priority(&self) -> u32 {
        self.bury_priority.unwrap_or(self.priority + 1)
    }
}

impl Default for BeanstalkConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BeanstalkConfig::new();
        assert_eq!(config.address(), "localhost:11300");
        assert_eq!(config.tube, "default");
        assert_eq!(config.priority, 100);
        assert_eq!(config.reserve_timeout, Duration::from_secs(1));
        assert!(config.ttr >= worker_pool::DEFAULT_TTR);
    }

    #[test]
    fn test_builder() {
        let config = BeanstalkConfig::new()
            .with_host("10.0.0.7")
            .with_port(11301)
            .with_tube("mailers")
            .with_priority(50);

        assert_eq!(config.address(), "10.0.0.7:11301");
        assert_eq!(config.tube, "mailers");
        assert_eq!(config.priority, 50);
    }

    #[test]
    fn test_bury_priority_defaults_to_one_worse() {
        let config = BeanstalkConfig::new().with_priority(50);
        assert_eq!(config.bury_priority(), 51);

        let config = config.with_bury_priority(10);
        assert_eq!(config.bury_priority(), 10);
    }
}

//! Beanstalkd backend for the worker pool.
//!
//! Speaks the beanstalkd text protocol over a single TCP connection:
//! put into a tube, `reserve-with-timeout` to fetch, `delete` to
//! acknowledge and `bury` (at a configurable, by default one-worse
//! priority) to reject.
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use beanstalk_queue::{BeanstalkConfig, BeanstalkQueue};
//! use worker_pool::{Pool, PoolConfig};
//!
//! let queue = BeanstalkQueue::connect(BeanstalkConfig::from_env()?).await?;
//! let mut pool = Pool::new(Arc::new(queue), PoolConfig::new());
//! ```

mod config;
mod proto;
mod queue;

pub use config::{
    BeanstalkConfig, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_PRIORITY, DEFAULT_RESERVE_TIMEOUT,
    DEFAULT_TTR, DEFAULT_TUBE,
};
pub use queue::{BeanstalkMessage, BeanstalkQueue};

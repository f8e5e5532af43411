//! The `Queue` implementation over a beanstalkd tube.

use crate::config::BeanstalkConfig;
use crate::proto::Conn;
use async_trait::async_trait;
use std::any::Any;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;
use worker_pool::{Args, Envelope, Message, Payload, PoolError, Queue, QueueStats};

const READY_KEY: &str = "current-jobs-ready";
const BURIED_KEY: &str = "current-jobs-buried";

/// A job reserved from beanstalkd.
#[derive(Debug)]
pub struct BeanstalkMessage {
    id: u64,
    envelope: Envelope,
}

impl BeanstalkMessage {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Message for BeanstalkMessage {
    fn kind(&self) -> String {
        self.envelope.kind()
    }

    fn args(&self) -> Args {
        self.envelope.args()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A beanstalkd tube as a worker pool queue.
///
/// One TCP connection serves puts, reserves and acknowledgements; the
/// protocol is sequential, so the connection sits behind an async
/// mutex. Failed jobs are buried at a worse priority so the server
/// stops handing them out.
pub struct BeanstalkQueue {
    config: BeanstalkConfig,
    conn: Mutex<Conn>,
}

impl BeanstalkQueue {
    /// Dial the server and select the configured tube for both
    /// directions.
    pub async fn connect(config: BeanstalkConfig) -> Result<Self, PoolError> {
        let mut conn = Conn::connect(&config.address()).await?;

        let reply = conn.command(&format!("use {}", config.tube), None).await?;
        if reply.word != "USING" {
            return Err(reply.unexpected("use"));
        }

        let reply = conn.command(&format!("watch {}", config.tube), None).await?;
        if reply.word != "WATCHING" {
            return Err(reply.unexpected("watch"));
        }

        if config.tube != crate::config::DEFAULT_TUBE {
            let reply = conn.command("ignore default", None).await?;
            if reply.word != "WATCHING" && reply.word != "NOT_IGNORED" {
                return Err(reply.unexpected("ignore"));
            }
        }

        debug!(address = %config.address(), tube = %config.tube, "connected to beanstalkd");

        Ok(Self {
            config,
            conn: Mutex::new(conn),
        })
    }

    fn own<'a>(&self, msg: &'a dyn Message) -> Result<&'a BeanstalkMessage, PoolError> {
        msg.as_any()
            .downcast_ref::<BeanstalkMessage>()
            .ok_or_else(|| {
                PoolError::Queue("bad envelope: message does not belong to this queue".to_string())
            })
    }
}

#[async_trait]
impl Queue for BeanstalkQueue {
    async fn put(&self, payload: Payload) -> Result<(), PoolError> {
        let body = payload.to_bytes()?;
        let line = format!(
            "put {} 0 {} {}",
            self.config.priority,
            self.config.ttr.as_secs(),
            body.len()
        );

        let mut conn = self.conn.lock().await;
        let reply = conn.command(&line, Some(&body)).await?;
        match reply.word.as_str() {
            "INSERTED" => Ok(()),
            "BURIED" => Err(PoolError::Queue(
                "server buried the job on put (out of memory)".to_string(),
            )),
            _ => Err(reply.unexpected("put")),
        }
    }

    async fn get(&self) -> Result<Box<dyn Message>, PoolError> {
        let mut conn = self.conn.lock().await;
        let reply = conn
            .command(
                &format!(
                    "reserve-with-timeout {}",
                    self.config.reserve_timeout.as_secs()
                ),
                None,
            )
            .await?;

        match reply.word.as_str() {
            "RESERVED" => {
                let id = reply.int_arg(0)?;
                let len = reply.int_arg(1)? as usize;
                let body = conn.read_body(len).await?;
                let envelope = Envelope::parse(&body)?;
                Ok(Box::new(BeanstalkMessage { id, envelope }))
            }
            "TIMED_OUT" | "DEADLINE_SOON" => Err(PoolError::timeout()),
            _ => Err(reply.unexpected("reserve")),
        }
    }

    async fn delete(&self, msg: &dyn Message) -> Result<(), PoolError> {
        let id = self.own(msg)?.id;

        let mut conn = self.conn.lock().await;
        let reply = conn.command(&format!("delete {id}"), None).await?;
        match reply.word.as_str() {
            "DELETED" => Ok(()),
            "NOT_FOUND" => Err(PoolError::Queue(format!("delete: job {id} not found"))),
            _ => Err(reply.unexpected("delete")),
        }
    }

    async fn reject(&self, msg: &dyn Message) -> Result<(), PoolError> {
        let id = self.own(msg)?.id;
        let priority = self.config.bury_priority();

        let mut conn = self.conn.lock().await;
        let reply = conn.command(&format!("bury {id} {priority}"), None).await?;
        match reply.word.as_str() {
            "BURIED" => Ok(()),
            "NOT_FOUND" => Err(PoolError::Queue(format!("bury: job {id} not found"))),
            _ => Err(reply.unexpected("bury")),
        }
    }

    async fn size(&self) -> Result<QueueStats, PoolError> {
        let mut conn = self.conn.lock().await;
        let reply = conn
            .command(&format!("stats-tube {}", self.config.tube), None)
            .await?;
        if reply.word != "OK" {
            return Err(reply.unexpected("stats-tube"));
        }

        let len = reply.int_arg(0)? as usize;
        let body = conn.read_body(len).await?;
        drop(conn);

        let stats: HashMap<String, serde_yaml::Value> = serde_yaml::from_slice(&body)
            .map_err(|e| PoolError::Queue(format!("bad tube stats: {e}")))?;

        let read = |key: &str| -> Result<u64, PoolError> {
            stats
                .get(key)
                .and_then(serde_yaml::Value::as_u64)
                .ok_or_else(|| PoolError::Queue(format!("missing {key} in tube stats")))
        };

        Ok(QueueStats {
            ready: read(READY_KEY)?,
            failed: read(BURIED_KEY)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tube_stats_yaml_shape() {
        let body = b"---\ncurrent-jobs-ready: 3\ncurrent-jobs-buried: 1\ntotal-jobs: 9\n";
        let stats: HashMap<String, serde_yaml::Value> = serde_yaml::from_slice(body).unwrap();

        assert_eq!(stats.get(READY_KEY).and_then(|v| v.as_u64()), Some(3));
        assert_eq!(stats.get(BURIED_KEY).and_then(|v| v.as_u64()), Some(1));
    }
}

//! Minimal beanstalkd protocol plumbing.
//!
//! The protocol is line-oriented ASCII over a single TCP connection:
//! one command line, an optional data block, one reply line, an
//! optional data block. Commands on one connection are strictly
//! sequential, which is why [`crate::BeanstalkQueue`] serializes access
//! behind an async mutex.

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use worker_pool::PoolError;

/// One beanstalkd connection.
pub(crate) struct Conn {
    stream: BufStream<TcpStream>,
}

impl Conn {
    pub async fn connect(addr: &str) -> Result<Self, PoolError> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self {
            stream: BufStream::new(stream),
        })
    }

    /// Send a command (plus optional data block) and read the reply
    /// line.
    pub async fn command(&mut self, line: &str, body: Option<&[u8]>) -> Result<Reply, PoolError> {
        self.stream.write_all(line.as_bytes()).await?;
        self.stream.write_all(b"\r\n").await?;
        if let Some(body) = body {
            self.stream.write_all(body).await?;
            self.stream.write_all(b"\r\n").await?;
        }
        self.stream.flush().await?;

        let mut reply = String::new();
        self.stream.read_line(&mut reply).await?;
        if reply.is_empty() {
            return Err(PoolError::Queue(
                "connection closed by beanstalkd".to_string(),
            ));
        }

        Ok(Reply::parse(reply.trim_end()))
    }

    /// Read a `<bytes>`-sized data block followed by its CRLF.
    pub async fn read_body(&mut self, len: usize) -> Result<Vec<u8>, PoolError> {
        let mut buf = vec![0u8; len + 2];
        self.stream.read_exact(&mut buf).await?;
        buf.truncate(len);
        Ok(buf)
    }
}

/// A parsed reply line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Reply {
    pub word: String,
    pub args: Vec<String>,
}

impl Reply {
    pub fn parse(line: &str) -> Self {
        let mut parts = line.split_whitespace().map(str::to_owned);
        Self {
            word: parts.next().unwrap_or_default(),
            args: parts.collect(),
        }
    }

    /// The n-th argument parsed as an integer.
    pub fn int_arg(&self, index: usize) -> Result<u64, PoolError> {
        self.args
            .get(index)
            .and_then(|a| a.parse().ok())
            .ok_or_else(|| PoolError::Queue(format!("bad reply: {} {:?}", self.word, self.args)))
    }

    /// A protocol error for an unexpected reply.
    pub fn unexpected(&self, command: &str) -> PoolError {
        PoolError::Queue(format!(
            "unexpected reply to {command}: {} {}",
            self.word,
            self.args.join(" ")
        ))
    }
}

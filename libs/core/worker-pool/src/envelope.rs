//! The wire form of a queued work item.
//!
//! Every backend stores the same canonical JSON object:
//!
//! ```json
//! {"type": "<job-type-name>", "args": { ... }}
//! ```
//!
//! Producers build a [`Payload`] from a job value; consumers parse the
//! raw bytes into an [`Envelope`] and read the type name and arguments
//! lazily.

use crate::args::Args;
use crate::error::PoolError;
use crate::registry::Factory;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A queue message payload under construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payload {
    #[serde(rename = "type")]
    pub kind: String,
    pub args: Value,
}

impl Payload {
    /// Build the payload for a job value.
    ///
    /// The type name comes from the job's [`Factory::kind`], which is
    /// also the registry key on the consumer side, so a put/get round
    /// trip always dispatches back to the same factory.
    pub fn wrap<J>(job: &J) -> Result<Self, PoolError>
    where
        J: Factory + Serialize,
    {
        Ok(Self {
            kind: job.kind().to_string(),
            args: serde_json::to_value(job)?,
        })
    }

    /// Serialize to the canonical wire bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, PoolError> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// A parsed queue payload.
///
/// Parsing is deferred and tolerant: any well-formed JSON is accepted,
/// and the accessors fall back to defaults instead of failing.
#[derive(Debug, Clone)]
pub struct Envelope {
    body: Value,
}

impl Envelope {
    /// Parse raw payload bytes.
    pub fn parse(payload: &[u8]) -> Result<Self, PoolError> {
        Ok(Self {
            body: serde_json::from_slice(payload)?,
        })
    }

    /// The registered type name, or the empty string when absent.
    pub fn kind(&self) -> String {
        self.body
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    /// The `args` subtree, or arguments over the empty array when the
    /// field is missing.
    pub fn args(&self) -> Args {
        match self.body.get("args") {
            Some(args) => Args::new(args.clone()),
            None => Args::empty(),
        }
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_read() {
        let env = Envelope::parse(br#"{"type": "AddJob", "args": {"x": 1, "y": 2}}"#).unwrap();
        assert_eq!(env.kind(), "AddJob");
        assert_eq!(env.args().get("x").must_i64(-1), 1);
        assert_eq!(env.args().get("y").must_i64(-1), 2);
    }

    #[test]
    fn test_missing_fields_have_defaults() {
        let env = Envelope::parse(br#"{"foo": "bar"}"#).unwrap();
        assert_eq!(env.kind(), "");
        assert_eq!(env.args().get("x").must_i64(-1), -1);
        assert_eq!(env.args().to_string(), "[]");
    }

    #[test]
    fn test_non_object_json_is_accepted() {
        let env = Envelope::parse(b"[1, 2, 3]").unwrap();
        assert_eq!(env.kind(), "");
    }

    #[test]
    fn test_malformed_payload_is_a_decode_error() {
        let err = Envelope::parse(b"{not json").unwrap_err();
        assert!(matches!(err, PoolError::Decode(_)));
        assert!(!err.is_timeout());
    }
}

//! Lazy accessors over a message's `args` subtree.
//!
//! Jobs are decoded by factories that know their own schema, so the
//! getters here never fail: a missing, null or wrong-typed field yields
//! the supplied default. Factories that prefer a typed struct can use
//! [`Args::decode`] instead and surface violations as factory errors.

use crate::error::PoolError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;

/// A lazy view over the arguments of a queued job.
#[derive(Debug, Clone)]
pub struct Args {
    root: Value,
}

impl Args {
    /// Wrap a parsed JSON subtree.
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    /// Arguments over the empty JSON array, used when the envelope
    /// carries no `args` field.
    pub fn empty() -> Self {
        Self {
            root: Value::Array(Vec::new()),
        }
    }

    /// Look up a named field.
    pub fn get(&self, name: &str) -> ArgValue<'_> {
        ArgValue {
            node: self.root.get(name),
        }
    }

    /// Deserialize the whole subtree into a typed struct.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, PoolError> {
        Ok(serde_json::from_value(self.root.clone())?)
    }

    /// The raw JSON tree.
    pub fn as_value(&self) -> &Value {
        &self.root
    }
}

impl fmt::Display for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)
    }
}

/// A single node of the argument tree, possibly absent.
#[derive(Debug, Clone, Copy)]
pub struct ArgValue<'a> {
    node: Option<&'a Value>,
}

impl<'a> ArgValue<'a> {
    /// Descend into a nested object.
    pub fn get(&self, name: &str) -> ArgValue<'a> {
        ArgValue {
            node: self.node.and_then(|v| v.get(name)),
        }
    }

    pub fn must_i64(&self, default: i64) -> i64 {
        self.node.and_then(Value::as_i64).unwrap_or(default)
    }

    pub fn must_u64(&self, default: u64) -> u64 {
        self.node.and_then(Value::as_u64).unwrap_or(default)
    }

    pub fn must_f64(&self, default: f64) -> f64 {
        self.node.and_then(Value::as_f64).unwrap_or(default)
    }

    pub fn must_bool(&self, default: bool) -> bool {
        self.node.and_then(Value::as_bool).unwrap_or(default)
    }

    pub fn must_str(&self, default: &str) -> String {
        self.node
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| default.to_owned())
    }

    /// Whether the field is present at all.
    pub fn exists(&self) -> bool {
        self.node.is_some()
    }
}

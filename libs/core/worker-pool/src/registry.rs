//! Job factories and the name-keyed registry the pool dispatches with.

use crate::args::Args;
use crate::error::PoolError;
use async_trait::async_trait;
use std::collections::HashMap;

/// A runnable unit of work reconstructed from queue arguments.
#[async_trait]
pub trait Job: Send {
    async fn run(&mut self) -> Result<(), PoolError>;
}

/// Builds jobs from queue arguments.
///
/// The usual shape is one struct implementing both `Factory` and
/// [`Job`]: a default value is registered at startup, and `make`
/// returns a fully populated copy for each message.
pub trait Factory: Send + Sync {
    /// The unique registration name of this job kind.
    ///
    /// The default is the bare struct name, which is also what the
    /// producer writes into the payload's `type` field, so the round
    /// trip needs no coordination. Override it only when two job types
    /// would otherwise collide.
    fn kind(&self) -> &'static str
    where
        Self: Sized,
    {
        struct_name::<Self>()
    }

    /// Build a job from the message arguments.
    ///
    /// Schema violations belong here: the argument getters never fail,
    /// so a factory that needs stricter decoding should return an error
    /// from `make`.
    fn make(&self, args: &Args) -> Result<Box<dyn Job>, PoolError>;
}

/// The bare name of a type: last path segment, generics stripped.
pub fn struct_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Maps job type names to their factories.
///
/// Populated before the pool runs; never mutated afterwards.
#[derive(Default)]
pub struct Registry {
    factories: HashMap<&'static str, Box<dyn Factory>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under its type name.
    ///
    /// Registering the same name twice is an error.
    pub fn add<F>(&mut self, factory: F) -> Result<(), PoolError>
    where
        F: Factory + 'static,
    {
        let kind = factory.kind();
        if kind.is_empty() {
            return Err(PoolError::Registry("empty job type name".to_string()));
        }
        if self.factories.contains_key(kind) {
            return Err(PoolError::Registry(format!(
                "factory {kind:?} exists already"
            )));
        }
        self.factories.insert(kind, Box::new(factory));
        Ok(())
    }

    /// Look up the factory for `kind`, build the job and run it.
    pub(crate) async fn execute(&self, kind: &str, args: &Args) -> Result<(), PoolError> {
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| PoolError::Dispatch(kind.to_string()))?;

        let mut job = factory
            .make(args)
            .map_err(|e| PoolError::Factory(e.to_string()))?;

        job.run().await.map_err(|e| PoolError::Job(e.to_string()))
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default)]
    struct EchoJob {
        text: String,
    }

    impl Factory for EchoJob {
        fn make(&self, args: &Args) -> Result<Box<dyn Job>, PoolError> {
            Ok(Box::new(EchoJob {
                text: args.get("text").must_str(""),
            }))
        }
    }

    #[async_trait]
    impl Job for EchoJob {
        async fn run(&mut self) -> Result<(), PoolError> {
            if self.text.is_empty() {
                return Err(PoolError::Job("nothing to echo".to_string()));
            }
            Ok(())
        }
    }

    #[test]
    fn test_struct_name() {
        assert_eq!(struct_name::<EchoJob>(), "EchoJob");
        assert_eq!(struct_name::<Vec<u8>>(), "Vec");
        assert_eq!(struct_name::<Option<EchoJob>>(), "Option");
    }

    #[test]
    fn test_default_kind_is_struct_name() {
        assert_eq!(EchoJob::default().kind(), "EchoJob");
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = Registry::new();
        registry.add(EchoJob::default()).unwrap();
        let err = registry.add(EchoJob::default()).unwrap_err();
        assert!(matches!(err, PoolError::Registry(_)));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_execute_dispatches_by_kind() {
        let mut registry = Registry::new();
        registry.add(EchoJob::default()).unwrap();

        let args = Args::new(json!({"text": "hello"}));
        registry.execute("EchoJob", &args).await.unwrap();

        let err = registry.execute("Missing", &args).await.unwrap_err();
        assert!(matches!(err, PoolError::Dispatch(_)));
    }

    #[tokio::test]
    async fn test_execute_wraps_job_failures() {
        let mut registry = Registry::new();
        registry.add(EchoJob::default()).unwrap();

        let err = registry
            .execute("EchoJob", &Args::empty())
            .await
            .unwrap_err();
        assert!(matches!(err, PoolError::Job(_)));
    }
}

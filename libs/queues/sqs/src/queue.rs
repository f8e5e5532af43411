//! The `Queue` implementation over a pair of SQS queues.

use async_trait::async_trait;
use aws_sdk_sqs::types::QueueAttributeName;
use aws_sdk_sqs::Client;
use std::any::Any;
use tracing::debug;
use worker_pool::{Args, Envelope, Message, Payload, PoolError, Queue, QueueStats};

/// A message received from SQS.
///
/// The receipt handle is the acknowledgement token `delete` needs;
/// it is only valid while the message's visibility timeout runs.
#[derive(Debug)]
pub struct SqsMessage {
    receipt: String,
    envelope: Envelope,
}

impl Message for SqsMessage {
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

/// An AWS SQS queue with its `<name>_dead` redrive companion.
///
/// Rejection is a no-op: redelivery is driven by the visibility
/// timeout, and the queue's redrive policy moves repeat offenders to
/// the dead letter queue without the pool's help.
pub struct SqsQueue {
    client: Client,
    ready_url: String,
    failed_url: String,
}

impl SqsQueue {
    /// Resolve both queue URLs using credentials and region from the
    /// environment.
    pub async fn connect(name: impl Into<String>) -> Result<Self, PoolError> {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::with_config(name, &config).await
    }

    /// Resolve both queue URLs with a caller-provided SDK config.
    pub async fn with_config(
        name: impl Into<String>,
        config: &aws_config::SdkConfig,
    ) -> Result<Self, PoolError> {
        let name = name.into();
        let dead = format!("{name}_dead");
        let client = Client::new(config);

        let ready_url = queue_url(&client, &name).await?;
        let failed_url = queue_url(&client, &dead).await?;

        debug!(queue = %name, dead_letter = %dead, "resolved sqs queues");

        Ok(Self {
            client,
            ready_url,
            failed_url,
        })
    }

    fn own<'a>(&self, msg: &'a dyn Message) -> Result<&'a SqsMessage, PoolError> {
        msg.as_any().downcast_ref::<SqsMessage>().ok_or_else(|| {
            PoolError::Queue("bad envelope: message does not belong to this queue".to_string())
        })
    }

    async fn queue_size(&self, url: &str) -> Result<u64, PoolError> {
        let out = self
            .client
            .get_queue_attributes()
            .queue_url(url)
            .attribute_names(QueueAttributeName::ApproximateNumberOfMessages)
            .send()
            .await
            .map_err(|e| PoolError::Queue(format!("sqs get-queue-attributes: {e}")))?;

        out.attributes()
            .and_then(|attrs| attrs.get(&QueueAttributeName::ApproximateNumberOfMessages))
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| {
                PoolError::Queue("missing ApproximateNumberOfMessages attribute".to_string())
            })
    }
}

async fn queue_url(client: &Client, name: &str) -> Result<String, PoolError> {
    let out = client
        .get_queue_url()
        .queue_name(name)
        .send()
        .await
        .map_err(|e| PoolError::Queue(format!("sqs get-queue-url {name:?}: {e}")))?;

    out.queue_url()
        .map(str::to_owned)
        .ok_or_else(|| PoolError::Queue(format!("queue {name:?} has no url")))
}

#[async_trait]
impl Queue for SqsQueue {
    async fn put(&self, payload: Payload) -> Result<(), PoolError> {
        let body = serde_json::to_string(&payload)?;

        self.client
            .send_message()
            .queue_url(&self.ready_url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| PoolError::Queue(format!("sqs send-message: {e}")))?;

        Ok(())
    }

    async fn get(&self) -> Result<Box<dyn Message>, PoolError> {
        let out = self
            .client
            .receive_message()
            .queue_url(&self.ready_url)
            .max_number_of_messages(1)
            .send()
            .await
            .map_err(|e| PoolError::Queue(format!("sqs receive-message: {e}")))?;

        let Some(msg) = out.messages().first() else {
            return Err(PoolError::timeout());
        };

        let receipt = msg
            .receipt_handle()
            .ok_or_else(|| PoolError::Queue("sqs message without receipt handle".to_string()))?
            .to_string();
        let body = msg
            .body()
            .ok_or_else(|| PoolError::Queue("sqs message without body".to_string()))?;

        let envelope = Envelope::parse(body.as_bytes())?;
        Ok(Box::new(SqsMessage { receipt, envelope }))
    }

    async fn delete(&self, msg: &dyn Message) -> Result<(), PoolError> {
        let msg = self.own(msg)?;

        self.client
            .delete_message()
            .queue_url(&self.ready_url)
            .receipt_handle(&msg.receipt)
            .send()
            .await
            .map_err(|e| PoolError::Queue(format!("sqs delete-message: {e}")))?;

        Ok(())
    }

    async fn reject(&self, msg: &dyn Message) -> Result<(), PoolError> {
        // Visibility timeout expiry redelivers the message; the
        // redrive policy dead-letters it after enough failures.
        self.own(msg)?;
        Ok(())
    }

    async fn size(&self) -> Result<QueueStats, PoolError> {
        Ok(QueueStats {
            ready: self.queue_size(&self.ready_url).await?,
            failed: self.queue_size(&self.failed_url).await?,
        })
    }
}

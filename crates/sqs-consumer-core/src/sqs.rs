//! SQS implementation of [`QueueClient`] and queue bootstrap helpers.

use crate::{Message, QueueClient};
use anyhow::Context;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sqs as sqs;
use bytes::Bytes;

/// Receives messages from an SQS queue.
///
/// # Arguments
///
/// * `client` - The SQS client to use for the request
/// * `queue_url` - The URL of the queue to receive messages from
/// * `max_messages` - Upper bound on the batch size (SQS allows 1 to 10)
/// * `wait_time_seconds` - Long-poll wait, `0` returns immediately
/// * `visibility_timeout` - Seconds the received messages stay hidden
///
/// # Errors
///
/// Returns an error if the SQS API call fails.
pub async fn receive(
    client: &sqs::Client,
    queue_url: &str,
    max_messages: i32,
    wait_time_seconds: i32,
    visibility_timeout: i32,
) -> anyhow::Result<sqs::operation::receive_message::ReceiveMessageOutput> {
    let result = client
        .receive_message()
        .queue_url(queue_url)
        .max_number_of_messages(max_messages)
        .wait_time_seconds(wait_time_seconds)
        .visibility_timeout(visibility_timeout)
        .send()
        .await;

    result.context("failed to receive messages")
}

#[async_trait]
impl QueueClient for sqs::Client {
    async fn receive_batch(
        &self,
        queue: &str,
        max_messages: i32,
        wait_time_seconds: i32,
        visibility_timeout: i32,
    ) -> anyhow::Result<Vec<Message>> {
        let output = receive(
            self,
            queue,
            max_messages,
            wait_time_seconds,
            visibility_timeout,
        )
        .await?;

        // `None` means the long poll elapsed with nothing to deliver
        let messages = output.messages.unwrap_or_default();
        Ok(messages
            .into_iter()
            .filter_map(Message::from_aws_message)
            .collect())
    }

    async fn delete_message(&self, queue: &str, receipt_handle: &str) -> anyhow::Result<()> {
        sqs::Client::delete_message(self)
            .queue_url(queue)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .context("failed to delete message")?;

        Ok(())
    }
}

impl Message {
    /// Converts an AWS SDK message.
    ///
    /// Returns `None` when the message has no receipt handle, since it could
    /// never be acknowledged. A missing body is treated as empty.
    ///
    /// # See Also
    ///
    /// - [AWS SQS Message API Reference](https://docs.aws.amazon.com/AWSSimpleQueueService/latest/APIReference/API_Message.html)
    pub fn from_aws_message(message: sqs::types::Message) -> Option<Self> {
        let Some(receipt_handle) = message.receipt_handle else {
            log::warn!(
                "skipping message {:?} without a receipt handle",
                message.message_id
            );
            return None;
        };

        Some(Self {
            message_id: message.message_id.unwrap_or_default(),
            receipt_handle,
            body: message.body.map(Bytes::from).unwrap_or_default(),
        })
    }
}

/// Handle on an SQS endpoint for the operations around consuming: listing
/// and creating queues, and seeding them with messages.
///
/// # Example
///
/// ```no_run
/// use sqs_consumer::SqsQueue;
///
/// # async fn example() -> anyhow::Result<()> {
/// let sqs = SqsQueue::local(Some("http://localhost:4566"), None).await;
/// let queue_url = sqs.create_queue("orders").await?;
/// sqs.send_batch(&queue_url, &["msg1", "msg2", "msg3"]).await?;
///
/// for url in sqs.list().await? {
///     println!("Queue: {}", url);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SqsQueue {
    /// The AWS SDK configuration used for SQS operations
    pub config: SdkConfig,
    /// The SQS client instance
    pub client: sqs::Client,
}

impl SqsQueue {
    /// Creates an SqsQueue from a pre-built AWS SDK config.
    pub fn from_config(config: SdkConfig) -> Self {
        let client = sqs::Client::new(&config);
        Self { config, client }
    }

    /// Loads the configuration from the environment.
    pub async fn from_env() -> Self {
        Self::from_config(aws_config::from_env().load().await)
    }

    /// Connects to LocalStack with its static test credentials.
    ///
    /// `region` wins when given. Otherwise the region comes from the usual
    /// environment variables and falls back to `us-east-1`.
    pub async fn local(endpoint: Option<&str>, region: Option<&str>) -> Self {
        let region = aws_config::meta::region::RegionProviderChain::first_try(
            region.map(|r| aws_config::Region::new(r.to_owned())),
        )
        .or_default_provider()
        .or_else(aws_config::Region::from_static("us-east-1"));

        let config = aws_config::from_env()
            .region(region)
            .credentials_provider(sqs::config::Credentials::new(
                "test", "test", None, None, "static",
            ))
            .endpoint_url(endpoint.unwrap_or("http://localhost:4566"))
            .load()
            .await;

        Self::from_config(config)
    }

    /// Lists all SQS queue URLs in the account, following pagination.
    pub async fn list(&self) -> anyhow::Result<Vec<String>> {
        let mut queues = Vec::new();

        let mut output = self
            .client
            .list_queues()
            .send()
            .await
            .context("failed to list queues")?;
        loop {
            if let Some(mut list) = output.queue_urls {
                queues.append(&mut list);
            }

            let Some(token) = output.next_token else {
                break;
            };

            output = self
                .client
                .list_queues()
                .set_next_token(Some(token))
                .send()
                .await
                .context("failed to list queues")?;
        }

        Ok(queues)
    }

    /// Creates a queue, or returns the URL of the existing one with that name.
    pub async fn create_queue(&self, name: &str) -> anyhow::Result<String> {
        let output = self
            .client
            .create_queue()
            .queue_name(name)
            .send()
            .await
            .with_context(|| format!("failed to create queue {name}"))?;

        output
            .queue_url
            .with_context(|| format!("no url returned for queue {name}"))
    }

    /// Number of messages SQS reports as available for immediate delivery.
    ///
    /// The value is approximate, as documented for the
    /// `ApproximateNumberOfMessages` attribute.
    pub async fn approximate_len(&self, queue_url: &str) -> anyhow::Result<usize> {
        let output = self
            .client
            .get_queue_attributes()
            .queue_url(queue_url)
            .attribute_names(sqs::types::QueueAttributeName::ApproximateNumberOfMessages)
            .send()
            .await
            .context("failed to get queue attributes")?;

        let count = output
            .attributes
            .as_ref()
            .and_then(|a| a.get(&sqs::types::QueueAttributeName::ApproximateNumberOfMessages))
            .context("ApproximateNumberOfMessages missing from response")?;

        count
            .parse()
            .with_context(|| format!("invalid message count {count}"))
    }
}

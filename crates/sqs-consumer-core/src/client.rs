//! The narrow queue contract the consumer depends on.

use async_trait::async_trait;
use bytes::Bytes;

/// A message handed out by a [`QueueClient`] for one processing attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Identifier assigned by the queue, unique within a batch
    pub message_id: String,
    /// Token used to acknowledge (delete) the message
    pub receipt_handle: String,
    /// Raw message payload
    pub body: Bytes,
}

impl Message {
    pub fn new(
        message_id: impl Into<String>,
        receipt_handle: impl Into<String>,
        body: impl Into<Bytes>,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            receipt_handle: receipt_handle.into(),
            body: body.into(),
        }
    }
}

/// Receive and acknowledge operations of a remote queue.
///
/// Implementations must be safe to call from several workers at once. The
/// queue's own visibility timeout is what keeps two workers from processing
/// the same message.
#[async_trait]
pub trait QueueClient: Send + Sync + 'static {
    /// Receives up to `max_messages` messages, waiting at most
    /// `wait_time_seconds` for the first one to arrive.
    ///
    /// Received messages stay hidden from other receivers for
    /// `visibility_timeout` seconds. An empty vector means nothing arrived
    /// before the wait elapsed.
    async fn receive_batch(
        &self,
        queue: &str,
        max_messages: i32,
        wait_time_seconds: i32,
        visibility_timeout: i32,
    ) -> anyhow::Result<Vec<Message>>;

    /// Deletes a received message so it is never redelivered.
    async fn delete_message(&self, queue: &str, receipt_handle: &str) -> anyhow::Result<()>;
}

#[async_trait]
impl<C: QueueClient> QueueClient for std::sync::Arc<C> {
    async fn receive_batch(
        &self,
        queue: &str,
        max_messages: i32,
        wait_time_seconds: i32,
        visibility_timeout: i32,
    ) -> anyhow::Result<Vec<Message>> {
        (**self)
            .receive_batch(queue, max_messages, wait_time_seconds, visibility_timeout)
            .await
    }

    async fn delete_message(&self, queue: &str, receipt_handle: &str) -> anyhow::Result<()> {
        (**self).delete_message(queue, receipt_handle).await
    }
}

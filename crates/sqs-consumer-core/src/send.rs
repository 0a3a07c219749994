use crate::sqs::SqsQueue;
use std::fmt;

/// SQS accepts at most 10 entries per `SendMessageBatch` call.
const MAX_BATCH_ENTRIES: usize = 10;

#[derive(Debug)]
pub enum SendError {
    BuildEntryFailed(String),
    /// Entries SQS refused, as `(entry id, reason)`
    Rejected(Vec<(String, String)>),
    AwsSdkError(
        aws_sdk_sqs::error::SdkError<
            aws_sdk_sqs::operation::send_message_batch::SendMessageBatchError,
        >,
    ),
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::BuildEntryFailed(msg) => write!(f, "failed to build message entry: {}", msg),
            SendError::Rejected(entries) => {
                write!(f, "{} messages were rejected", entries.len())?;
                for (id, reason) in entries {
                    write!(f, "\n  {id}: {reason}")?;
                }
                Ok(())
            }
            SendError::AwsSdkError(e) => write!(f, "AWS SDK error: {}", e),
        }
    }
}

impl std::error::Error for SendError {}

impl SqsQueue {
    /// Sends every message to `queue_url`, in batches of up to 10.
    ///
    /// Returns the number of messages sent. Batches that were sent before a
    /// failure are not rolled back.
    pub async fn send_batch(
        &self,
        queue_url: &str,
        messages: &[impl AsRef<str>],
    ) -> Result<usize, SendError> {
        // SQS doesn't allow empty batch requests
        if messages.is_empty() {
            return Ok(0);
        }

        let mut sent = 0;
        for chunk in messages.chunks(MAX_BATCH_ENTRIES) {
            let entries = chunk
                .iter()
                .map(|message| {
                    let id = uuid::Uuid::new_v4().to_string();
                    let body = message.as_ref().to_string();
                    aws_sdk_sqs::types::SendMessageBatchRequestEntry::builder()
                        .id(id)
                        .message_body(body)
                        .build()
                        .map_err(|e| SendError::BuildEntryFailed(e.to_string()))
                })
                .collect::<Result<Vec<_>, SendError>>()?;

            let output = self
                .client
                .send_message_batch()
                .queue_url(queue_url)
                .set_entries(Some(entries))
                .send()
                .await
                .map_err(SendError::AwsSdkError)?;

            if !output.failed.is_empty() {
                return Err(SendError::Rejected(
                    output
                        .failed
                        .into_iter()
                        .map(|entry| (entry.id, entry.message.unwrap_or(entry.code)))
                        .collect(),
                ));
            }

            sent += output.successful.len();
            log::debug!("sent {} messages to {queue_url}", output.successful.len());
        }

        Ok(sent)
    }
}

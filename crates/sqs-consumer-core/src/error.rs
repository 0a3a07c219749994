//! Error types surfaced by the consumer.

use thiserror::Error;

/// Boxed error returned by message handlers and queue transports.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced while constructing or running a [`Consumer`](crate::Consumer).
#[derive(Debug, Error)]
pub enum ConsumerError {
    /// The configuration was rejected at construction time.
    #[error("invalid consumer configuration: {0}")]
    Validation(String),

    /// A receive or delete call against the queue failed.
    #[error("failed to {operation} on queue {queue}: {source}")]
    Transport {
        operation: &'static str,
        queue: String,
        #[source]
        source: BoxError,
    },

    /// At least one message in a batch could not be processed.
    ///
    /// Messages that were processed successfully have already been deleted,
    /// the failed ones are left for redelivery.
    #[error("{failed} of {received} messages in the batch failed processing")]
    Processing { received: usize, failed: usize },

    #[error("worker {worker} stopped unexpectedly: {reason}")]
    WorkerPanicked { worker: usize, reason: String },
}

impl ConsumerError {
    pub(crate) fn transport(operation: &'static str, queue: &str, source: anyhow::Error) -> Self {
        ConsumerError::Transport {
            operation,
            queue: queue.to_string(),
            source: source.into(),
        }
    }

    /// Whether the error ends a worker loop.
    ///
    /// Processing failures are contained in the cycle that produced them.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ConsumerError::Processing { .. })
    }
}

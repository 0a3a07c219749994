//! Worker pool that polls a queue, processes messages and acknowledges them.

use crate::{ConsumerConfig, ConsumerError, Message, MessageHandler, QueueClient, ResolvedConfig};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Outcome of a receive/process/acknowledge cycle in which every message
/// was processed successfully.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Messages returned by the receive call
    pub received: usize,
    /// Messages deleted from the queue
    pub deleted: usize,
}

/// Consumes a single queue with a fixed number of workers.
///
/// # Example
///
/// ```no_run
/// use bytes::Bytes;
/// use sqs_consumer::{BoxError, Consumer, ConsumerConfig};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = aws_config::from_env().load().await;
/// let client = aws_sdk_sqs::Client::new(&config);
///
/// let consumer = Consumer::new(
///     ConsumerConfig::new("https://sqs.us-east-1.amazonaws.com/123456789/orders").concurrency(4),
///     client,
/// )?;
///
/// let token = CancellationToken::new();
/// consumer
///     .run(&token, |body: Bytes| async move {
///         println!("{}", String::from_utf8_lossy(&body));
///         Ok::<(), BoxError>(())
///     })
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct Consumer<C> {
    config: Arc<ResolvedConfig>,
    client: Arc<C>,
}

impl<C> Clone for Consumer<C> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            client: self.client.clone(),
        }
    }
}

impl<C: QueueClient> Consumer<C> {
    /// Resolves `config` and binds it to `client`. No requests are made.
    ///
    /// # Errors
    ///
    /// Returns [`ConsumerError::Validation`] when the queue is empty.
    pub fn new(config: ConsumerConfig, client: C) -> Result<Self, ConsumerError> {
        Ok(Self {
            config: Arc::new(config.resolve()?),
            client: Arc::new(client),
        })
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// Runs the worker pool until `cancel` fires or a worker hits a
    /// transport error.
    ///
    /// A worker checks for cancellation before each poll. Messages that were
    /// already received are processed and acknowledged before the worker
    /// exits. A transport error in one worker stops the others.
    ///
    /// Processing failures do not stop the pool, but each worker remembers
    /// its first one. Once every worker has exited the first transport error
    /// is returned, otherwise the first processing failure. `Ok(())` means the
    /// pool was cancelled and every batch succeeded.
    pub async fn run<H: MessageHandler>(
        &self,
        cancel: &CancellationToken,
        handler: H,
    ) -> Result<(), ConsumerError> {
        let handler = Arc::new(handler);
        let shutdown = cancel.child_token();

        log::info!(
            "starting {} workers on {}",
            self.config.concurrency,
            self.config.queue
        );

        let mut handles = Vec::with_capacity(self.config.concurrency);
        for id in 0..self.config.concurrency {
            let worker = Worker {
                id,
                config: self.config.clone(),
                client: self.client.clone(),
                handler: handler.clone(),
            };
            let shutdown = shutdown.clone();

            handles.push(tokio::spawn(async move {
                // however the worker exits, the rest of the pool follows
                let _guard = shutdown.clone().drop_guard();
                worker.run(&shutdown).await
            }));
        }

        let mut first_error: Option<ConsumerError> = None;
        for (worker, handle) in handles.into_iter().enumerate() {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(ConsumerError::WorkerPanicked {
                    worker,
                    reason: e.to_string(),
                }),
            };

            if let Err(e) = result {
                log::error!("worker {worker} failed: {e}");
                first_error = Some(match first_error {
                    Some(current) if current.is_fatal() || !e.is_fatal() => current,
                    _ => e,
                });
            }
        }

        log::info!("all workers on {} stopped", self.config.queue);

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Runs exactly one receive/process/acknowledge cycle.
    ///
    /// # Errors
    ///
    /// - [`ConsumerError::Transport`] if the receive or any delete failed
    /// - [`ConsumerError::Processing`] if at least one message failed, after
    ///   the successful ones have been deleted
    pub async fn poll_once<H: MessageHandler>(
        &self,
        handler: &H,
    ) -> Result<CycleReport, ConsumerError> {
        let messages = receive(self.client.as_ref(), &self.config).await?;
        process_batch(self.client.as_ref(), &self.config, handler, messages).await
    }
}

struct Worker<C, H> {
    id: usize,
    config: Arc<ResolvedConfig>,
    client: Arc<C>,
    handler: Arc<H>,
}

impl<C: QueueClient, H: MessageHandler> Worker<C, H> {
    async fn run(&self, shutdown: &CancellationToken) -> Result<(), ConsumerError> {
        log::debug!("worker {} started", self.id);
        let mut first_failure = None;

        while !shutdown.is_cancelled() {
            // nothing has been handed out yet, so an abandoned poll loses nothing
            let messages = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                received = receive(self.client.as_ref(), &self.config) => received?,
            };

            match process_batch(
                self.client.as_ref(),
                &self.config,
                self.handler.as_ref(),
                messages,
            )
            .await
            {
                Ok(report) if report.received > 0 => {
                    log::debug!("worker {} processed {} messages", self.id, report.received)
                }
                Ok(_) => {}
                Err(e) if !e.is_fatal() => {
                    log::warn!("worker {}: {e}", self.id);
                    first_failure.get_or_insert(e);
                }
                Err(e) => return Err(e),
            }
        }

        log::debug!("worker {} stopped", self.id);
        match first_failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

async fn receive<C: QueueClient + ?Sized>(
    client: &C,
    config: &ResolvedConfig,
) -> Result<Vec<Message>, ConsumerError> {
    client
        .receive_batch(
            &config.queue,
            config.max_number_of_messages,
            config.wait_time_seconds,
            config.visibility_timeout,
        )
        .await
        .map_err(|e| ConsumerError::transport("receive messages", &config.queue, e))
}

async fn process_batch<C: QueueClient + ?Sized, H: MessageHandler + ?Sized>(
    client: &C,
    config: &ResolvedConfig,
    handler: &H,
    messages: Vec<Message>,
) -> Result<CycleReport, ConsumerError> {
    let received = messages.len();
    if received == 0 {
        return Ok(CycleReport::default());
    }
    log::debug!("received {received} messages from {}", config.queue);

    let mut processed = Vec::with_capacity(received);
    for message in messages {
        match handler.handle(message.body.clone()).await {
            Ok(()) => processed.push(message),
            Err(e) => log::warn!("failed to process message {}: {e}", message.message_id),
        }
    }
    let failed = received - processed.len();

    let mut deleted = 0;
    let mut delete_error = None;
    for message in &processed {
        match client
            .delete_message(&config.queue, &message.receipt_handle)
            .await
        {
            Ok(()) => deleted += 1,
            Err(e) => {
                log::error!("failed to delete message {}: {e:#}", message.message_id);
                if delete_error.is_none() {
                    delete_error =
                        Some(ConsumerError::transport("delete message", &config.queue, e));
                }
            }
        }
    }

    if let Some(e) = delete_error {
        return Err(e);
    }
    if failed > 0 {
        return Err(ConsumerError::Processing { received, failed });
    }

    Ok(CycleReport { received, deleted })
}

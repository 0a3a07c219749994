use crate::BoxError;
use async_trait::async_trait;
use bytes::Bytes;
use std::future::Future;

/// Processes the body of a single message.
///
/// Returning `Ok(())` acknowledges the message. An error leaves it in the
/// queue, where it becomes visible again once its visibility timeout expires.
///
/// Any async closure taking the message body implements this trait:
///
/// ```
/// use bytes::Bytes;
/// use sqs_consumer::{BoxError, MessageHandler};
///
/// fn assert_handler(_: impl MessageHandler) {}
///
/// assert_handler(|body: Bytes| async move {
///     println!("{}", String::from_utf8_lossy(&body));
///     Ok::<(), BoxError>(())
/// });
/// ```
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    async fn handle(&self, body: Bytes) -> Result<(), BoxError>;
}

#[async_trait]
impl<F, Fut> MessageHandler for F
where
    F: Fn(Bytes) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    async fn handle(&self, body: Bytes) -> Result<(), BoxError> {
        (self)(body).await
    }
}

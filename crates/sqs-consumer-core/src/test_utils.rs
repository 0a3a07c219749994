use crate::{Message, QueueClient};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// In-process stand-in for an SQS queue.
///
/// Received messages are hidden until their visibility timeout expires, a
/// fresh receipt handle is issued on every delivery, and deleting with a
/// stale handle fails the way SQS does.
#[derive(Default)]
pub struct InMemoryQueue {
    state: Mutex<State>,
    receive_calls: AtomicUsize,
    fail_receives: AtomicBool,
    fail_deletes: AtomicBool,
}

#[derive(Default)]
struct State {
    next_id: usize,
    deliveries: usize,
    messages: Vec<StoredMessage>,
    deleted: Vec<String>,
}

struct StoredMessage {
    message_id: String,
    body: Bytes,
    receipt_handle: Option<String>,
    visible_at: Instant,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_messages<I, S>(bodies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let queue = Self::new();
        for body in bodies {
            queue.push(body.as_ref());
        }
        queue
    }

    pub fn push(&self, body: &str) {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let message_id = format!("msg-{}", state.next_id);
        state.messages.push(StoredMessage {
            message_id,
            body: Bytes::copy_from_slice(body.as_bytes()),
            receipt_handle: None,
            visible_at: Instant::now(),
        });
    }

    /// Messages still stored, visible or not.
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().messages.len()
    }

    pub fn visible_bodies(&self) -> Vec<String> {
        let now = Instant::now();
        self.state
            .lock()
            .unwrap()
            .messages
            .iter()
            .filter(|m| m.visible_at <= now)
            .map(|m| String::from_utf8_lossy(&m.body).into_owned())
            .collect()
    }

    /// Ids of the messages that have been deleted, in deletion order.
    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }

    pub fn receive_calls(&self) -> usize {
        self.receive_calls.load(Ordering::SeqCst)
    }

    pub fn fail_receives(&self, fail: bool) {
        self.fail_receives.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    fn claim(&self, max_messages: i32, visibility_timeout: i32) -> Vec<Message> {
        let now = Instant::now();
        let hidden_until = now + Duration::from_secs(visibility_timeout.max(0) as u64);
        let max_messages = max_messages.max(1) as usize;

        let mut state = self.state.lock().unwrap();
        let State {
            deliveries,
            messages,
            ..
        } = &mut *state;

        let mut claimed = Vec::new();
        for stored in messages.iter_mut().filter(|m| m.visible_at <= now) {
            if claimed.len() == max_messages {
                break;
            }
            *deliveries += 1;
            let receipt_handle = format!("{}-receipt-{}", stored.message_id, deliveries);
            stored.receipt_handle = Some(receipt_handle.clone());
            stored.visible_at = hidden_until;
            claimed.push(Message::new(
                stored.message_id.clone(),
                receipt_handle,
                stored.body.clone(),
            ));
        }
        claimed
    }
}

#[async_trait]
impl QueueClient for InMemoryQueue {
    async fn receive_batch(
        &self,
        _queue: &str,
        max_messages: i32,
        wait_time_seconds: i32,
        visibility_timeout: i32,
    ) -> anyhow::Result<Vec<Message>> {
        self.receive_calls.fetch_add(1, Ordering::SeqCst);
        // a real receive always suspends on the network
        tokio::task::yield_now().await;

        if self.fail_receives.load(Ordering::SeqCst) {
            anyhow::bail!("simulated receive failure");
        }

        let deadline = Instant::now() + Duration::from_secs(wait_time_seconds.max(0) as u64);
        loop {
            let claimed = self.claim(max_messages, visibility_timeout);
            if !claimed.is_empty() || Instant::now() >= deadline {
                return Ok(claimed);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    async fn delete_message(&self, _queue: &str, receipt_handle: &str) -> anyhow::Result<()> {
        tokio::task::yield_now().await;

        if self.fail_deletes.load(Ordering::SeqCst) {
            anyhow::bail!("simulated delete failure");
        }

        let mut state = self.state.lock().unwrap();
        let Some(index) = state
            .messages
            .iter()
            .position(|m| m.receipt_handle.as_deref() == Some(receipt_handle))
        else {
            anyhow::bail!("receipt handle {receipt_handle} is invalid");
        };

        let message = state.messages.remove(index);
        state.deleted.push(message.message_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn claimed_messages_are_hidden() {
        let queue = InMemoryQueue::with_messages(["a", "b"]);

        let first = queue.receive_batch("q", 10, 0, 30).await.unwrap();
        let second = queue.receive_batch("q", 10, 0, 30).await.unwrap();

        assert_eq!(first.len(), 2);
        assert!(second.is_empty());
        assert_eq!(queue.len(), 2);
    }

    #[tokio::test]
    async fn zero_visibility_redelivers_with_a_new_handle() {
        let queue = InMemoryQueue::with_messages(["a"]);

        let first = queue.receive_batch("q", 1, 0, 0).await.unwrap();
        let second = queue.receive_batch("q", 1, 0, 0).await.unwrap();

        assert_eq!(first[0].message_id, second[0].message_id);
        assert_ne!(first[0].receipt_handle, second[0].receipt_handle);

        assert!(queue
            .delete_message("q", &first[0].receipt_handle)
            .await
            .is_err());
        queue
            .delete_message("q", &second[0].receipt_handle)
            .await
            .unwrap();
        assert_eq!(queue.len(), 0);
    }

    #[tokio::test]
    async fn receive_honours_max_messages() {
        let queue = InMemoryQueue::with_messages(["a", "b", "c"]);
        let batch = queue.receive_batch("q", 2, 0, 30).await.unwrap();
        assert_eq!(batch.len(), 2);
    }
}

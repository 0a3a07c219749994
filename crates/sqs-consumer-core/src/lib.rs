//! # sqs-consumer-core
//!
//! Bounded-concurrency consumer for AWS SQS queues.
//!
//! A [`Consumer`] runs a fixed number of workers. Each worker repeatedly
//! receives a batch of messages, hands every message body to a
//! [`MessageHandler`], and deletes the messages that were handled
//! successfully. Failed messages are left alone: SQS makes them visible again
//! once their visibility timeout expires.
//!
//! ## Features
//!
//! - **Configuration**: [`ConsumerConfig`] with defaults for every optional setting
//! - **Worker Pool**: independent long-polling workers stopped by a shared
//!   [`CancellationToken`](tokio_util::sync::CancellationToken)
//! - **Queue Operations**: listing, creating and seeding queues through [`SqsQueue`]
//!
//! ## Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use sqs_consumer::{BoxError, Consumer, ConsumerConfig, SqsQueue};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let sqs = SqsQueue::from_env().await;
//! let config = ConsumerConfig::new("https://sqs.us-east-1.amazonaws.com/123456789/orders")
//!     .concurrency(4)
//!     .visibility_timeout(60);
//!
//! let consumer = Consumer::new(config, sqs.client)?;
//! let token = CancellationToken::new();
//!
//! consumer
//!     .run(&token, |body: Bytes| async move {
//!         println!("{}", String::from_utf8_lossy(&body));
//!         Ok::<(), BoxError>(())
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod consumer;
mod error;
mod handler;
mod send;
mod sqs;

#[cfg(test)]
mod test_utils;

pub use client::{Message, QueueClient};
pub use config::*;
pub use consumer::{Consumer, CycleReport};
pub use error::{BoxError, ConsumerError};
pub use handler::MessageHandler;
pub use send::SendError;
pub use sqs::*;

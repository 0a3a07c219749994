//! Consumer settings and their defaults.

use crate::ConsumerError;

/// Number of workers polling the queue when none is configured.
pub const DEFAULT_CONCURRENCY: usize = 1;
/// SQS returns at most 10 messages per receive call.
pub const DEFAULT_MAX_NUMBER_OF_MESSAGES: i32 = 10;
pub const DEFAULT_VISIBILITY_TIMEOUT: i32 = 30;
/// The longest long-poll SQS allows.
pub const DEFAULT_WAIT_TIME_SECONDS: i32 = 20;

const MAX_NUMBER_OF_MESSAGES_RANGE: (i32, i32) = (1, 10);
const WAIT_TIME_SECONDS_RANGE: (i32, i32) = (0, 20);

/// Consumer configuration as supplied by the caller.
///
/// Unset fields are filled in by [`ConsumerConfig::resolve`]. The serialized
/// form uses the option names accepted on the command line and in config
/// files:
///
/// ```json
/// {
///   "queue": "https://sqs.us-east-1.amazonaws.com/123456789/orders",
///   "concurrency": 4,
///   "maxNumberOfMessages": 10,
///   "visibilityTimeout": 60,
///   "waitTimeSeconds": 20
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerConfig {
    /// Queue URL the workers poll.
    pub queue: String,
    /// Number of independent workers, `0` means the default.
    #[serde(default)]
    pub concurrency: usize,
    /// Messages requested per receive call, `0` means the default.
    #[serde(default)]
    pub max_number_of_messages: i32,
    /// Seconds a received message stays hidden from other receivers.
    ///
    /// `Some(0)` is kept as is: failed messages become visible again at once.
    #[serde(default)]
    pub visibility_timeout: Option<i32>,
    /// Long-poll wait for each receive call, `Some(0)` is a short poll.
    #[serde(default)]
    pub wait_time_seconds: Option<i32>,
}

/// Settings after defaulting, frozen for the lifetime of a consumer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub queue: String,
    pub concurrency: usize,
    pub max_number_of_messages: i32,
    pub visibility_timeout: i32,
    pub wait_time_seconds: i32,
}

impl ConsumerConfig {
    pub fn new(queue: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            ..Default::default()
        }
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn max_number_of_messages(mut self, max: i32) -> Self {
        self.max_number_of_messages = max;
        self
    }

    pub fn visibility_timeout(mut self, seconds: i32) -> Self {
        self.visibility_timeout = Some(seconds);
        self
    }

    pub fn wait_time_seconds(mut self, seconds: i32) -> Self {
        self.wait_time_seconds = Some(seconds);
        self
    }

    /// Loads a configuration from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConsumerError> {
        serde_json::from_str(json).map_err(|e| ConsumerError::Validation(e.to_string()))
    }

    /// Applies defaults and range limits.
    ///
    /// # Errors
    ///
    /// Returns [`ConsumerError::Validation`] when the queue is empty. Every
    /// other field is defaulted or clamped rather than rejected.
    pub fn resolve(self) -> Result<ResolvedConfig, ConsumerError> {
        let queue = self.queue.trim();
        if queue.is_empty() {
            return Err(ConsumerError::Validation(
                "queue must not be empty".to_string(),
            ));
        }

        let concurrency = match self.concurrency {
            0 => DEFAULT_CONCURRENCY,
            n => n,
        };

        let max_number_of_messages = match self.max_number_of_messages {
            0 => DEFAULT_MAX_NUMBER_OF_MESSAGES,
            n => clamp(n, MAX_NUMBER_OF_MESSAGES_RANGE),
        };

        let visibility_timeout = self
            .visibility_timeout
            .map(|s| s.max(0))
            .unwrap_or(DEFAULT_VISIBILITY_TIMEOUT);

        let wait_time_seconds = self
            .wait_time_seconds
            .map(|s| clamp(s, WAIT_TIME_SECONDS_RANGE))
            .unwrap_or(DEFAULT_WAIT_TIME_SECONDS);

        Ok(ResolvedConfig {
            queue: queue.to_string(),
            concurrency,
            max_number_of_messages,
            visibility_timeout,
            wait_time_seconds,
        })
    }
}

fn clamp(value: i32, (min, max): (i32, i32)) -> i32 {
    if value < min || value > max {
        log::warn!("value {value} is outside of [{min}, {max}], clamping");
    }
    value.clamp(min, max)
}

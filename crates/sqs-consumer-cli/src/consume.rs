use anyhow::Context;
use bytes::Bytes;
use sqs_consumer::{BoxError, Consumer, ConsumerConfig, SqsQueue};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

#[derive(Debug, clap::Args)]
pub struct ConsumeArgs {
    /// Queue url to consume
    #[arg(long)]
    queue: Option<String>,

    /// JSON file with consumer settings, flags take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of workers polling the queue
    #[arg(long)]
    concurrency: Option<usize>,

    /// Messages requested per receive call (1-10)
    #[arg(long)]
    max_number_of_messages: Option<i32>,

    /// Seconds a received message stays hidden from other consumers
    #[arg(long)]
    visibility_timeout: Option<i32>,

    /// Long-poll wait for each receive call (0-20)
    #[arg(long)]
    wait_time_seconds: Option<i32>,

    /// Program that receives each message body on stdin and whose exit
    /// status decides whether the message is deleted
    #[arg(last = true, value_name = "PROGRAM")]
    pub exec: Vec<String>,
}

impl ConsumeArgs {
    /// Merges the config file with the flags and validates the result.
    pub fn config(&self) -> anyhow::Result<ConsumerConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                ConsumerConfig::from_json(&json)
                    .with_context(|| format!("failed to parse {}", path.display()))?
            }
            None => ConsumerConfig::default(),
        };

        if let Some(queue) = &self.queue {
            config.queue = queue.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(max) = self.max_number_of_messages {
            config.max_number_of_messages = max;
        }
        if self.visibility_timeout.is_some() {
            config.visibility_timeout = self.visibility_timeout;
        }
        if self.wait_time_seconds.is_some() {
            config.wait_time_seconds = self.wait_time_seconds;
        }

        config.clone().resolve()?;
        Ok(config)
    }
}

pub async fn run(sqs: SqsQueue, config: ConsumerConfig, exec: &[String]) -> anyhow::Result<()> {
    let consumer = Consumer::new(config, sqs.client)?;

    let token = CancellationToken::new();
    tokio::spawn(cancel_on_interrupt(tokio::signal::ctrl_c(), token.clone()));

    match exec.split_first() {
        Some((program, args)) => {
            let program = program.clone();
            let args = args.to_vec();
            consumer
                .run(&token, move |body: Bytes| {
                    execute(program.clone(), args.clone(), body)
                })
                .await?
        }
        None => consumer.run(&token, print).await?,
    }

    Ok(())
}

/// Cancels `token` once `signal` fires. If the signal cannot be installed the
/// consumer keeps running and has to be stopped some other way.
async fn cancel_on_interrupt<F>(signal: F, token: CancellationToken)
where
    F: std::future::Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            log::info!("interrupted, finishing in-flight messages");
            token.cancel();
        }
        Err(e) => log::error!("failed to listen for ctrl-c: {e}"),
    }
}

async fn print(body: Bytes) -> Result<(), BoxError> {
    let line = serde_json::json!({ "body": String::from_utf8_lossy(&body) });
    println!("{}", line);
    Ok(())
}

async fn execute(program: String, args: Vec<String>, body: Bytes) -> Result<(), BoxError> {
    let mut child = tokio::process::Command::new(&program)
        .args(&args)
        .stdin(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to start {program}"))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(&body).await?;
    }

    let status = child.wait().await?;
    if !status.success() {
        return Err(format!("{program} exited with {status}").into());
    }

    Ok(())
}

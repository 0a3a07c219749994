use anyhow::Context;
use sqs_consumer::SqsQueue;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

const BATCH_SIZE: usize = 10;

/// Sends every non-blank stdin line to `queue_url`.
pub async fn run(sqs: &SqsQueue, queue_url: &str) -> anyhow::Result<usize> {
    send_lines(sqs, queue_url, tokio::io::stdin()).await
}

/// Reads `input` line by line and sends the trimmed, non-blank lines in
/// batches of ten. A read error stops sending; batches already sent stay sent.
async fn send_lines<R: AsyncRead + Unpin>(
    sqs: &SqsQueue,
    queue_url: &str,
    input: R,
) -> anyhow::Result<usize> {
    let mut lines = BufReader::new(input).lines();
    let mut sent = 0;
    let mut batch = Vec::with_capacity(BATCH_SIZE);

    while let Some(line) = lines
        .next_line()
        .await
        .with_context(|| format!("failed to read line after {sent} sent messages"))?
    {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        batch.push(line.to_owned());
        if batch.len() == BATCH_SIZE {
            sent += sqs.send_batch(queue_url, &batch).await?;
            log::debug!("sent {sent} messages to {queue_url}");
            batch.clear();
        }
    }

    sent += sqs.send_batch(queue_url, &batch).await?;
    Ok(sent)
}

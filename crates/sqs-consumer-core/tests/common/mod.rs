use aws_sdk_sqs::config::Credentials;
use sqs_consumer::SqsQueue;
use testcontainers::ContainerAsync;
use testcontainers_modules::{
    localstack::LocalStack,
    testcontainers::{runners::AsyncRunner, ImageExt, TestcontainersError},
};

pub fn local_config(endpoint_url: &str, region: Option<&'static str>) -> aws_config::ConfigLoader {
    aws_config::defaults(aws_config::BehaviorVersion::latest())
        .endpoint_url(endpoint_url)
        .region(region.unwrap_or("us-east-1"))
        .credentials_provider(Credentials::new("test", "test", None, None, "static"))
}

pub async fn localstack() -> Result<(String, ContainerAsync<LocalStack>), TestcontainersError> {
    let request = LocalStack::default()
        .with_tag("latest")
        .with_env_var("SERVICES", "sqs")
        .with_env_var("SKIP_SSL_CERT_DOWNLOAD", "1");
    let container = request.start().await?;

    let host_ip = container.get_host().await?;
    let host_port = container.get_host_port_ipv4(4566).await?;
    let endpoint_url = format!("http://{host_ip}:{host_port}");

    Ok((endpoint_url, container))
}

/// Generate a unique queue name for testing, using a UUID suffix.
pub fn unique_queue_name(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
}

/// Starts LocalStack and creates an empty queue in it.
///
/// The container must be kept alive for as long as the queue is used.
pub async fn setup(name: &str) -> (SqsQueue, String, ContainerAsync<LocalStack>) {
    let (endpoint_url, container) = localstack().await.unwrap();
    let sqs = SqsQueue::from_config(local_config(&endpoint_url, None).load().await);

    // LocalStack may need a moment before it accepts requests
    let queue_name = unique_queue_name(name);
    let queue_url = tokio::time::timeout(std::time::Duration::from_secs(10), async {
        loop {
            match sqs.create_queue(&queue_name).await {
                Ok(url) => return url,
                Err(_) => tokio::time::sleep(std::time::Duration::from_millis(100)).await,
            }
        }
    })
    .await
    .expect("Timeout waiting for queue to be available");

    (sqs, queue_url, container)
}

/// Receives whatever is currently visible, without hiding it from consumers.
pub async fn peek(sqs: &SqsQueue, queue_url: &str) -> Vec<String> {
    let output = sqs
        .client
        .receive_message()
        .queue_url(queue_url)
        .max_number_of_messages(10)
        .visibility_timeout(0)
        .wait_time_seconds(1)
        .send()
        .await
        .unwrap();

    output
        .messages
        .unwrap_or_default()
        .into_iter()
        .filter_map(|m| m.body)
        .collect()
}

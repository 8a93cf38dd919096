use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::{Result, TextractError};
use crate::services::{MessageQueue, NotificationTopic};

pub const TOPIC_NAME_PREFIX: &str = "AmazonTextractTopic";
pub const QUEUE_NAME_PREFIX: &str = "AmazonTextractQueue";

/// Topic/queue pair the analysis service publishes job notifications into.
/// Nothing deletes these automatically; call [`teardown`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationResources {
    pub topic_arn: String,
    pub queue_url: String,
    pub queue_arn: String,
}

/// Policy letting the topic, and only the topic, send into the queue.
pub fn queue_policy(queue_arn: &str, topic_arn: &str) -> String {
    serde_json::json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Sid": "AllowTextractTopic",
            "Effect": "Allow",
            "Principal": { "AWS": "*" },
            "Action": "SQS:SendMessage",
            "Resource": queue_arn,
            "Condition": {
                "ArnEquals": { "aws:SourceArn": topic_arn }
            }
        }]
    })
    .to_string()
}

fn step<T>(
    step: &'static str,
    r: std::result::Result<T, crate::errors::ServiceError>,
) -> Result<T> {
    r.map_err(|source| TextractError::Provisioning { step, source })
}

/// Creates a topic and queue named with the current millisecond timestamp,
/// subscribes the queue and authorizes the topic to publish into it.
pub async fn provision<T, Q>(topic: &T, queue: &Q) -> Result<NotificationResources>
where
    T: NotificationTopic + ?Sized,
    Q: MessageQueue + ?Sized,
{
    let millis = chrono::Utc::now().timestamp_millis();
    provision_with_suffix(topic, queue, &millis.to_string()).await
}

/// A failure part way leaves whatever was already created in place.
pub async fn provision_with_suffix<T, Q>(
    topic: &T,
    queue: &Q,
    suffix: &str,
) -> Result<NotificationResources>
where
    T: NotificationTopic + ?Sized,
    Q: MessageQueue + ?Sized,
{
    let topic_name = format!("{}{}", TOPIC_NAME_PREFIX, suffix);
    let queue_name = format!("{}{}", QUEUE_NAME_PREFIX, suffix);

    let topic_arn = step("create topic", topic.create_topic(&topic_name).await)?;
    step("create queue", queue.create_queue(&queue_name).await)?;
    let queue_url = step("get queue url", queue.get_queue_url(&queue_name).await)?;
    let queue_arn = step("get queue arn", queue.get_queue_arn(&queue_url).await)?;

    step(
        "subscribe queue",
        topic.subscribe_queue(&topic_arn, &queue_arn).await,
    )?;
    step(
        "set queue policy",
        queue
            .set_queue_policy(&queue_url, &queue_policy(&queue_arn, &topic_arn))
            .await,
    )?;

    info!(%topic_arn, %queue_url, "provisioned notification topic and queue");
    Ok(NotificationResources {
        topic_arn,
        queue_url,
        queue_arn,
    })
}

pub async fn teardown<T, Q>(topic: &T, queue: &Q, topic_arn: &str, queue_url: &str) -> Result<()>
where
    T: NotificationTopic + ?Sized,
    Q: MessageQueue + ?Sized,
{
    step("delete queue", queue.delete_queue(queue_url).await)?;
    step("delete topic", topic.delete_topic(topic_arn).await)?;
    info!(%topic_arn, %queue_url, "deleted notification topic and queue");
    Ok(())
}

use broccoli_queue::queue::BroccoliQueue;
use common::mq::Message;
use common::worker::Task;
use tracing::debug;

use crate::error::MqError;

pub type MqQueue = BroccoliQueue;

pub struct MqConfig {
    pub url: String,
    pub pool_size: u8,
}

pub async fn init_mq(config: MqConfig) -> Result<MqQueue, MqError> {
    BroccoliQueue::builder(&config.url)
        .pool_connections(config.pool_size)
        .build()
        .await
        .map_err(MqError::from)
}

/// Wrap `message` in a [`Task`] envelope and publish it to `queue_name`.
///
/// Returns the task id the consumer will see.
pub async fn publish_message<M: Message>(
    mq: &MqQueue,
    queue_name: &str,
    message: &M,
) -> Result<String, MqError> {
    let task = Task::wrap(message)?;
    mq.publish(queue_name, None, &task, None).await?;
    debug!(task_id = %task.id, task_type = %task.task_type, queue = queue_name, "Published task");
    Ok(task.id)
}

use async_trait::async_trait;
use common::judge_job::PipelineJudgeJob;
use mq::{MqError, MqQueue, publish_message};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("queue error: {0}")]
    Queue(#[from] MqError),
    #[error("{0}")]
    Rejected(String),
}

/// Hands validated judge jobs to the judge.
///
/// Fire-and-forget: returning `Ok` means the job was accepted for delivery,
/// not that it was judged.
#[async_trait]
pub trait JudgeDispatcher: Send + Sync {
    /// Returns the delivery id assigned to the job.
    async fn dispatch(&self, job: &PipelineJudgeJob) -> Result<String, DispatchError>;
}

/// Publishes judge jobs to a broccoli queue.
pub struct MqDispatcher {
    mq: MqQueue,
    queue_name: String,
}

impl MqDispatcher {
    pub fn new(mq: MqQueue, queue_name: impl Into<String>) -> Self {
        Self {
            mq,
            queue_name: queue_name.into(),
        }
    }
}

#[async_trait]
impl JudgeDispatcher for MqDispatcher {
    async fn dispatch(&self, job: &PipelineJudgeJob) -> Result<String, DispatchError> {
        let task_id = publish_message(&self.mq, &self.queue_name, job).await?;
        info!(
            job_id = %job.job_id,
            submission_id = job.submission_id,
            queue = %self.queue_name,
            "Dispatched judge job"
        );
        Ok(task_id)
    }
}

use serde::{Deserialize, Serialize};

use crate::mq::{Message, MessageError};

/// Envelope the judge queue carries; `task_type` selects the consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub task_type: String,
    pub payload: serde_json::Value,
}

impl Task {
    /// Wrap a typed message, keeping its id as the task id.
    pub fn wrap<M: Message>(message: &M) -> Result<Self, MessageError> {
        Ok(Self {
            id: message.message_id().to_string(),
            task_type: M::message_type().to_string(),
            payload: serde_json::to_value(message)?,
        })
    }

    /// Recover the typed message, checking the declared type first.
    pub fn unwrap_as<M: Message>(self) -> Result<M, MessageError> {
        if self.task_type != M::message_type() {
            return Err(MessageError::TypeMismatch {
                expected: M::message_type().to_string(),
                actual: self.task_type,
            });
        }
        Ok(serde_json::from_value(self.payload)?)
    }
}

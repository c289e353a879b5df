//! In-process result channel backed by a `tokio::sync::mpsc` channel.
//!
//! Each completed task is published once and consumed once by the
//! [`ResultDispatcher`](crate::ResultDispatcher). The bus is cheap to clone
//! into request handlers.

use chrono::Utc;
use mapcalc_core::measurement::TaskResult;
use mapcalc_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// TaskCompletion
// ---------------------------------------------------------------------------

/// A finished computation waiting to be delivered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCompletion {
    /// Executor-assigned id of the task that produced the result.
    pub task_id: Uuid,
    pub result: TaskResult,
    pub completed_at: Timestamp,
}

impl TaskCompletion {
    pub fn new(task_id: Uuid, result: TaskResult) -> Self {
        Self {
            task_id,
            result,
            completed_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// ResultBus
// ---------------------------------------------------------------------------

/// Sending half of the result channel.
#[derive(Clone)]
pub struct ResultBus {
    sender: mpsc::UnboundedSender<TaskCompletion>,
}

impl ResultBus {
    /// Create the bus and the receiver the dispatcher will drain.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TaskCompletion>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Queue a completion for delivery.
    ///
    /// If the dispatcher has stopped the completion is dropped.
    pub fn publish(&self, completion: TaskCompletion) {
        if let Err(mpsc::error::SendError(dropped)) = self.sender.send(completion) {
            tracing::warn!(
                task_id = %dropped.task_id,
                record_id = dropped.result.id,
                "Result dispatcher is gone, dropping completion"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

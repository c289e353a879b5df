//! Background consumer for the result channel.
//!
//! A single long-lived Tokio task that drains [`TaskCompletion`]s and hands
//! each deliverable result to a [`ResultSink`]. Runs detached from any
//! request, so it never returns errors; the sink logs its own failures.

use std::sync::Arc;

use async_trait::async_trait;
use mapcalc_core::measurement::TaskResult;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::bus::TaskCompletion;

/// Destination for computed results.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Deliver one result. Implementations swallow their own failures.
    async fn deliver(&self, result: &TaskResult);

    /// Whether deliveries can reach anything at all.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Pushes completed results to a [`ResultSink`], one at a time.
pub struct ResultDispatcher {
    sink: Arc<dyn ResultSink>,
}

impl ResultDispatcher {
    pub fn new(sink: Arc<dyn ResultSink>) -> Self {
        Self { sink }
    }

    /// Run until the channel closes or `cancel` is triggered.
    pub async fn run(
        self,
        mut completions: mpsc::UnboundedReceiver<TaskCompletion>,
        cancel: CancellationToken,
    ) {
        tracing::info!(push_enabled = self.sink.is_enabled(), "Result dispatcher started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Result dispatcher shutting down");
                    break;
                }
                next = completions.recv() => match next {
                    Some(completion) => self.dispatch(completion).await,
                    None => {
                        tracing::info!("Result channel closed, dispatcher stopping");
                        break;
                    }
                },
            }
        }
    }

    /// Deliver a single completion, skipping results without an id or stage.
    pub async fn dispatch(&self, completion: TaskCompletion) {
        let result = &completion.result;
        if !result.is_deliverable() {
            tracing::debug!(
                task_id = %completion.task_id,
                record_id = result.id,
                "Result lacks id or stage, not delivering"
            );
            return;
        }

        tracing::debug!(
            task_id = %completion.task_id,
            record_id = result.id,
            stage = %result.result_stage,
            "Delivering result"
        );
        self.sink.deliver(result).await;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

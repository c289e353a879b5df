//! Single-worker background task executor.
//!
//! [`TaskExecutor`] owns one long-lived Tokio task that pulls jobs off an
//! unbounded queue and runs them strictly one at a time, in submission
//! order. Submitting never blocks the caller; the returned [`TaskHandle`]
//! resolves to a [`TaskOutcome`] exactly once.

use std::future::Future;

use futures::future::BoxFuture;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// TaskOutcome
// ---------------------------------------------------------------------------

/// How a submitted task ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome<T> {
    Completed(T),
    /// Cancelled before or while running, or abandoned at shutdown.
    Cancelled,
}

impl<T> TaskOutcome<T> {
    pub fn completed(self) -> Option<T> {
        match self {
            TaskOutcome::Completed(value) => Some(value),
            TaskOutcome::Cancelled => None,
        }
    }
}

// ---------------------------------------------------------------------------
// TaskHandle
// ---------------------------------------------------------------------------

/// Caller-side handle for one submitted task.
pub struct TaskHandle<T> {
    id: Uuid,
    cancel: CancellationToken,
    done: oneshot::Receiver<TaskOutcome<T>>,
}

impl<T: Send + 'static> TaskHandle<T> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Request cancellation. A queued task never starts; a running one is
    /// dropped at its next await point.
    ///
    /// A queued task's handle resolves to [`TaskOutcome::Cancelled`] only
    /// when the worker reaches it in the queue, after the tasks ahead of it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the task to finish.
    pub async fn outcome(self) -> TaskOutcome<T> {
        // A dropped sender means the job was discarded without running.
        self.done.await.unwrap_or(TaskOutcome::Cancelled)
    }

    /// Run `callback` once the task finishes, on a separate Tokio task.
    ///
    /// Fires exactly once with the task id and outcome, even if the task
    /// had already finished when this was called.
    pub fn on_complete<C>(self, callback: C) -> JoinHandle<()>
    where
        C: FnOnce(Uuid, TaskOutcome<T>) + Send + 'static,
    {
        let id = self.id;
        tokio::spawn(async move {
            let outcome = self.outcome().await;
            callback(id, outcome);
        })
    }
}

// ---------------------------------------------------------------------------
// TaskExecutor
// ---------------------------------------------------------------------------

type Job = Box<dyn FnOnce(CancellationToken) -> BoxFuture<'static, ()> + Send>;

struct QueuedTask {
    id: Uuid,
    cancel: CancellationToken,
    job: Job,
}

/// Background executor with a concurrency of one.
pub struct TaskExecutor {
    queue: mpsc::UnboundedSender<QueuedTask>,
    /// Parent of every task's token; cancelled on shutdown.
    shutdown: CancellationToken,
}

impl TaskExecutor {
    /// Spawn the worker task. Must be called from within a Tokio runtime.
    pub fn start() -> Self {
        let (queue, receiver) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();

        tokio::spawn(run_worker(receiver, shutdown.clone()));
        tracing::info!("Task executor started (1 worker)");

        Self { queue, shutdown }
    }

    /// Queue `work` for execution and return immediately.
    ///
    /// After [`shutdown`](Self::shutdown) the work is discarded and the
    /// handle resolves to [`TaskOutcome::Cancelled`].
    pub fn submit<F, Fut, T>(&self, work: F) -> TaskHandle<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let id = Uuid::now_v7();
        let cancel = self.shutdown.child_token();
        let (done_tx, done_rx) = oneshot::channel();

        let job: Job = Box::new(move |cancel: CancellationToken| -> BoxFuture<'static, ()> {
            Box::pin(async move {
                let outcome = if cancel.is_cancelled() {
                    TaskOutcome::Cancelled
                } else {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => TaskOutcome::Cancelled,
                        value = work() => TaskOutcome::Completed(value),
                    }
                };
                // The handle may have been dropped; nobody is waiting then.
                let _ = done_tx.send(outcome);
            })
        });

        let queued = QueuedTask {
            id,
            cancel: cancel.clone(),
            job,
        };
        if self.queue.send(queued).is_err() {
            tracing::warn!(task_id = %id, "Executor is shut down, task discarded");
        } else {
            tracing::debug!(task_id = %id, "Task queued");
        }

        TaskHandle {
            id,
            cancel,
            done: done_rx,
        }
    }

    /// Stop the worker. Queued and in-flight tasks are cancelled, not drained.
    ///
    /// Dropping the executor without calling this lets the worker finish
    /// whatever is already queued.
    pub fn shutdown(&self) {
        tracing::info!("Shutting down task executor");
        self.shutdown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

/// Worker loop: one task at a time, FIFO, until shutdown or the queue closes.
async fn run_worker(mut queue: mpsc::UnboundedReceiver<QueuedTask>, shutdown: CancellationToken) {
    loop {
        let task = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            next = queue.recv() => match next {
                Some(task) => task,
                None => break,
            },
        };

        tracing::debug!(task_id = %task.id, "Task started");
        (task.job)(task.cancel).await;
        tracing::debug!(task_id = %task.id, "Task finished");
    }

    // Remaining jobs are dropped with the receiver; their handles resolve
    // to `Cancelled`.
    tracing::info!("Task worker stopped");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

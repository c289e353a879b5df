//! Background execution of pressure computations.
//!
//! - [`TaskExecutor`]: single-worker FIFO executor.
//! - [`jobs`]: the delayed computation submitted for each measurement.

pub mod executor;
pub mod jobs;

pub use executor::{TaskExecutor, TaskHandle, TaskOutcome};
pub use jobs::{long_task, TaskDelay};

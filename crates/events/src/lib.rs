//! Result delivery for completed computations.
//!
//! - [`ResultBus`]: in-process channel carrying [`TaskCompletion`]s from
//!   the worker to the dispatcher.
//! - [`ResultDispatcher`]: background consumer that pushes each result to a
//!   [`ResultSink`].
//! - [`delivery`]: the upstream HTTP client and its credential cache.

pub mod bus;
pub mod delivery;
pub mod dispatcher;

pub use bus::{ResultBus, TaskCompletion};
pub use delivery::config::UpstreamConfig;
pub use delivery::credentials::CredentialCache;
pub use delivery::upstream::UpstreamClient;
pub use dispatcher::{ResultDispatcher, ResultSink};

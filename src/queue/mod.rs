// src/queue/mod.rs
// =============================================================================
// The only two objects shared between the supervisor and the workers.
//
// Submodules:
// - task: a joinable work queue (hand out assignments, wait until all of them
//   are acknowledged)
// - results: an unbounded channel workers push outcomes into
//
// Both do their own locking; callers never wrap them in a Mutex.
// =============================================================================

mod results;
mod task;

#[cfg(test)]
pub use results::ResultReceiver;
pub use results::{ResultChannel, ResultSender};
pub use task::TaskQueue;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    /// acknowledge() was called with no dequeued item outstanding
    #[error("acknowledge called more times than items were dequeued")]
    AcknowledgedTooOften,

    /// The supervisor dropped its receiver before the worker pushed
    #[error("result channel is closed")]
    ResultsClosed,

    /// Every worker dropped its sender before enough outcomes arrived
    #[error("result channel closed after {received} of {expected} outcomes")]
    MissingResults { received: usize, expected: usize },
}

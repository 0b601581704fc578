// src/pool/mod.rs
// =============================================================================
// The worker pool: who does the work and who waits for it.
//
// Submodules:
// - worker: one OS thread per worker, each running either a plain blocking
//   loop or its own single-threaded async runtime
// - supervisor: splits the pages up, starts the workers, waits for the task
//   queue to drain and counts the outcomes
// =============================================================================

mod supervisor;
mod worker;

#[cfg(test)]
mod fake;

pub use supervisor::{resolve_worker_count, Supervisor, SupervisorConfig, SupervisorState};
pub use worker::ExecutionMode;

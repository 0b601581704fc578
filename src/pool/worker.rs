// src/pool/worker.rs
// =============================================================================
// A worker is one OS thread that turns assignments into outcomes.
//
// For every assignment it takes from the task queue, a worker:
// 1. fetches the page (through the PageFetcher)
// 2. pushes exactly one Outcome to the result channel
// 3. acknowledges the task queue
//
// Step 2 always happens before step 3, and both always happen, even when the
// fetch fails or panics. Skipping either would leave the supervisor waiting
// forever.
//
// How many assignments: each worker is told its quota (the size of its share
// of the pages) and dequeues exactly that many. The quotas add up to the number
// of enqueued pages, so nobody waits on an empty queue and no stop marker is
// needed. A worker with a quota of 0 returns without touching the queue.
//
// Two execution modes, fixed when the worker is built:
// - Sync: fetch one page completely, then take the next
// - Concurrent: take the whole quota, then run the fetches on a private
//   current-thread tokio runtime, up to `concurrency` at a time. They only
//   yield to each other while waiting on I/O.
// =============================================================================

use futures::{future, stream, FutureExt, StreamExt};
use std::any::Any;
use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::fetch::{FetchError, PageFetcher};
use crate::job::{Assignment, Outcome, OutcomeStatus};
use crate::queue::{ResultSender, TaskQueue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExecutionMode {
    /// One page at a time, blocking I/O
    Sync,
    /// Many pages interleaved on a single-threaded async runtime
    #[value(name = "async")]
    Concurrent,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Sync => write!(f, "sync"),
            ExecutionMode::Concurrent => write!(f, "async"),
        }
    }
}

/// Something that can run on its own thread until its work is done.
pub trait Worker: Send + 'static {
    fn name(&self) -> &str;
    fn run(self);
}

/// Start `worker` on a new OS thread named after it.
pub fn spawn_worker<W: Worker>(worker: W) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(worker.name().to_string())
        .spawn(move || worker.run())
}

/// Everything one worker owns. Nothing here is shared except the two queues.
pub struct WorkerConfig<F> {
    pub name: String,
    pub mode: ExecutionMode,
    /// How many assignments to take from the queue
    pub quota: usize,
    pub out_dir: PathBuf,
    /// In-flight fetch limit in concurrent mode
    pub concurrency: usize,
    pub fetcher: F,
    pub tasks: Arc<TaskQueue<Assignment>>,
    pub results: ResultSender,
}

pub struct ImageWorker<F> {
    config: WorkerConfig<F>,
}

impl<F: PageFetcher> ImageWorker<F> {
    pub fn new(config: WorkerConfig<F>) -> Self {
        Self { config }
    }

    fn run_sync(&self) {
        let config = &self.config;
        for _ in 0..config.quota {
            let assignment = config.tasks.dequeue();
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                config.fetcher.fetch_blocking(&assignment, &config.out_dir)
            }))
            .unwrap_or_else(|payload| Err(FetchError::Panicked(panic_message(payload))));
            self.finish(assignment, result);
        }
    }

    fn run_concurrent(&self) {
        let config = &self.config;
        let assignments: Vec<Assignment> =
            (0..config.quota).map(|_| config.tasks.dequeue()).collect();

        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                error!("could not start async runtime: {}", e);
                // Still owe one outcome and one acknowledgement per assignment
                for assignment in assignments {
                    self.finish(
                        assignment,
                        Err(format!("async runtime unavailable: {e}")),
                    );
                }
                return;
            }
        };

        runtime.block_on(
            stream::iter(assignments)
                .map(|assignment| async move {
                    let result = AssertUnwindSafe(
                        config.fetcher.fetch(&assignment, &config.out_dir),
                    )
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|payload| {
                        Err(FetchError::Panicked(panic_message(payload)))
                    });
                    (assignment, result)
                })
                .buffer_unordered(config.concurrency.max(1))
                .for_each(|(assignment, result)| {
                    self.finish(assignment, result);
                    future::ready(())
                }),
        );
    }

    // Report one assignment: push its outcome, then acknowledge it
    fn finish<E: fmt::Display>(&self, assignment: Assignment, result: Result<usize, E>) {
        let outcome = Outcome::from_result(assignment.page, result);
        match &outcome.status {
            OutcomeStatus::Success { images } => {
                debug!("{} done, {} image(s) saved", assignment, images)
            }
            OutcomeStatus::Failed { reason } => warn!("{} failed: {}", assignment, reason),
        }

        if let Err(e) = self.config.results.push(outcome) {
            error!("could not report {}: {}", assignment, e);
        }
        if let Err(e) = self.config.tasks.acknowledge() {
            error!("could not acknowledge {}: {}", assignment, e);
        }
    }
}

impl<F: PageFetcher> Worker for ImageWorker<F> {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn run(self) {
        if self.config.quota == 0 {
            debug!("no pages assigned, exiting");
            return;
        }

        info!(
            "downloading {} {} page(s)",
            self.config.mode, self.config.quota
        );
        match self.config.mode {
            ExecutionMode::Sync => self.run_sync(),
            ExecutionMode::Concurrent => self.run_concurrent(),
        }
        debug!("all assigned pages finished");
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why a trait with `fn run(self)`?
//    - Taking `self` by value moves the worker into its thread
//    - spawn_worker works for any Worker, which is how the tests plug in
//      workers that misbehave on purpose
//
// 2. What is catch_unwind?
//    - It stops a panic at a boundary and hands back the panic payload
//    - AssertUnwindSafe promises the compiler we won't look at half-updated
//      state afterwards; here we only build an error message from it
//
// 3. Why a current-thread runtime per worker?
//    - Every worker is already its own OS thread
//    - Inside it, one thread is enough to interleave many network waits
//    - block_on() runs the runtime until the whole stream is done, so a
//      worker never exits with fetches still in flight
//
// 4. What does buffer_unordered(n) do?
//    - Polls up to n futures at once and yields results as they finish
//    - "unordered" means page 5 may be reported before page 4
// -----------------------------------------------------------------------------

// src/pool/supervisor.rs
// =============================================================================
// The supervisor runs on the main thread and owns one whole run:
//
//   Init -> Partitioned -> Spawned -> AwaitingDrain -> DrainingResults -> Reported
//
// 1. Split pages 1..=T into one contiguous share per worker
// 2. Enqueue one assignment per page
// 3. Start one worker per share, its quota being the share's size
// 4. Block until the task queue is drained (the only place it waits)
// 5. Pop exactly T outcomes and count the failures
// 6. Report the totals
//
// The queue does not keep pages in their share: a worker with a quota of 2
// takes whichever 2 assignments come out next. The shares decide how much
// work each worker does, not which pages.
// =============================================================================

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;
use std::ops::Range;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

use super::worker::{spawn_worker, ExecutionMode, ImageWorker, WorkerConfig};
use crate::fetch::PageFetcher;
use crate::job::Assignment;
use crate::queue::{ResultChannel, TaskQueue};

// At least as many workers as CPUs, and never zero
pub fn resolve_worker_count(requested: usize, cpus: usize) -> usize {
    requested.max(cpus).max(1)
}

// Splits pages 1..=total_pages into `workers` contiguous shares
//
// Share sizes differ by at most one, larger shares first. When there are
// fewer pages than workers the trailing shares are empty.
//
// Example: 5 pages, 4 workers -> [1, 2], [3], [4], [5]
pub fn partition(total_pages: u32, workers: usize) -> Vec<Vec<Assignment>> {
    share_bounds(total_pages, workers)
        .into_iter()
        .map(|range| {
            range
                .filter_map(|page| u32::try_from(page).ok())
                .map(Assignment::new)
                .collect()
        })
        .collect()
}

// Half-open page ranges, one per share. Counted in u64 so the last share can
// end at u32::MAX.
fn share_bounds(total_pages: u32, workers: usize) -> Vec<Range<u64>> {
    let workers = workers.max(1) as u64;
    let total = u64::from(total_pages);
    let base = total / workers;
    let extra = total % workers;

    let mut start = 1u64;
    (0..workers)
        .map(|index| {
            let end = start + base + u64::from(index < extra);
            let range = start..end;
            start = end;
            range
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Init,
    Partitioned,
    Spawned,
    AwaitingDrain,
    DrainingResults,
    Reported,
}

impl SupervisorState {
    fn successor(self) -> Self {
        match self {
            SupervisorState::Init => SupervisorState::Partitioned,
            SupervisorState::Partitioned => SupervisorState::Spawned,
            SupervisorState::Spawned => SupervisorState::AwaitingDrain,
            SupervisorState::AwaitingDrain => SupervisorState::DrainingResults,
            SupervisorState::DrainingResults | SupervisorState::Reported => {
                SupervisorState::Reported
            }
        }
    }
}

/// Final counts for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl Summary {
    pub fn new(total: usize, failed: usize) -> Self {
        Self {
            total,
            succeeded: total - failed,
            failed,
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Done, success: {}/{}, failure: {}/{}",
            self.succeeded, self.total, self.failed, self.total
        )
    }
}

#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub total_pages: u32,
    /// Already resolved; see resolve_worker_count
    pub workers: usize,
    pub mode: ExecutionMode,
    pub concurrency: usize,
    pub out_dir: PathBuf,
}

pub struct Supervisor<F> {
    config: SupervisorConfig,
    fetcher: F,
    state: SupervisorState,
}

impl<F: PageFetcher> Supervisor<F> {
    /// `fetcher` is a prototype; every worker gets its own clone.
    pub fn new(config: SupervisorConfig, fetcher: F) -> Self {
        Self {
            config,
            fetcher,
            state: SupervisorState::Init,
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    fn advance(&mut self) {
        let next = self.state.successor();
        debug!("supervisor {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Run every page to completion and return the totals.
    ///
    /// Blocks the calling thread. Must not be called from inside an async
    /// runtime. If a worker thread dies between taking a page and
    /// acknowledging it, this never returns.
    pub fn run(&mut self) -> Result<Summary> {
        let started = Instant::now();
        let total = self.config.total_pages as usize;

        let shares = partition(self.config.total_pages, self.config.workers);
        self.advance();

        let tasks = Arc::new(TaskQueue::new());
        let (results_tx, mut results_rx) = ResultChannel::new();
        for assignment in shares.iter().flatten() {
            tasks.enqueue(*assignment);
        }

        info!("Spawning {} gatherers...", shares.len());
        let mut handles = Vec::with_capacity(shares.len());
        for (index, share) in shares.iter().enumerate() {
            let name = format!("worker-{}", index + 1);
            let worker = ImageWorker::new(WorkerConfig {
                name: name.clone(),
                mode: self.config.mode,
                quota: share.len(),
                out_dir: self.config.out_dir.clone(),
                concurrency: self.config.concurrency,
                fetcher: self.fetcher.clone(),
                tasks: Arc::clone(&tasks),
                results: results_tx.clone(),
            });
            let handle = spawn_worker(worker).with_context(|| format!("spawning {name}"))?;
            handles.push(handle);
        }
        // Only the workers hold senders from here on
        drop(results_tx);
        self.advance();

        self.advance();
        tasks.await_drained();

        self.advance();
        let outcomes = results_rx
            .drain(total)
            .context("collecting page outcomes")?;
        let failed = outcomes.iter().filter(|o| !o.is_success()).count();

        for handle in handles {
            if handle.join().is_err() {
                error!("a worker thread panicked after reporting its pages");
            }
        }

        let summary = Summary::new(total, failed);
        self.advance();
        debug!("run took {:?}", started.elapsed());
        Ok(summary)
    }
}

// src/job.rs
// =============================================================================
// The two values that travel between the supervisor and its workers.
//
// - Assignment: one page to fetch, created by the supervisor
// - Outcome: what happened to one assignment, created by a worker
//
// Every assignment produces exactly one outcome. The supervisor relies on that
// when it drains the result channel.
// =============================================================================

use std::fmt;

/// One page the supervisor hands out.
///
/// Pages are 1-based, matching the `p1/`, `p2/`, ... paths on the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Assignment {
    pub page: u32,
}

impl Assignment {
    pub fn new(page: u32) -> Self {
        Self { page }
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {}", self.page)
    }
}

/// How one assignment ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// The page and all of its images were saved
    Success { images: usize },
    /// Something went wrong; the reason is only used for local logging
    Failed { reason: String },
}

/// The result a worker pushes for one assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub page: u32,
    pub status: OutcomeStatus,
}

impl Outcome {
    pub fn success(page: u32, images: usize) -> Self {
        Self {
            page,
            status: OutcomeStatus::Success { images },
        }
    }

    pub fn failed(page: u32, reason: impl Into<String>) -> Self {
        Self {
            page,
            status: OutcomeStatus::Failed {
                reason: reason.into(),
            },
        }
    }

    /// Turns a fetch result into data, so no error leaves the worker.
    pub fn from_result<E: fmt::Display>(page: u32, result: Result<usize, E>) -> Self {
        match result {
            Ok(images) => Self::success(page, images),
            Err(e) => Self::failed(page, e.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Success { .. })
    }
}

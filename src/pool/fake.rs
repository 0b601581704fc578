// src/pool/fake.rs
// A PageFetcher that never touches the network, for pool tests.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::fetch::{FetchError, PageFetcher};
use crate::job::Assignment;

#[derive(Debug, Clone, Default)]
pub struct FakeFetcher {
    failing: Arc<HashSet<u32>>,
    panicking: Arc<HashSet<u32>>,
    delay: Duration,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, pages: &[u32]) -> Self {
        self.failing = Arc::new(pages.iter().copied().collect());
        self
    }

    pub fn panicking(mut self, pages: &[u32]) -> Self {
        self.panicking = Arc::new(pages.iter().copied().collect());
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Highest number of fetches seen running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self, assignment: &Assignment) -> Result<usize, FetchError> {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.panicking.contains(&assignment.page) {
            panic!("fake fetch panicked on {assignment}");
        }
        if self.failing.contains(&assignment.page) {
            return Err(FetchError::Status {
                url: format!("fake://{}", assignment.page),
                status: 500,
            });
        }
        Ok(1)
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    fn fetch_blocking(
        &self,
        assignment: &Assignment,
        _out_dir: &Path,
    ) -> Result<usize, FetchError> {
        self.enter();
        std::thread::sleep(self.delay);
        self.leave(assignment)
    }

    async fn fetch(&self, assignment: &Assignment, _out_dir: &Path) -> Result<usize, FetchError> {
        self.enter();
        tokio::time::sleep(self.delay).await;
        self.leave(assignment)
    }
}

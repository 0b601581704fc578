// src/queue/results.rs
// =============================================================================
// The channel workers report outcomes through.
//
// Built on tokio's unbounded mpsc channel:
// - push() never blocks, so a worker never waits on the supervisor
// - pop_blocking() is called from the supervisor's plain thread, outside of
//   any runtime, and parks it until an outcome arrives
//
// No ordering is promised; outcomes show up in whatever order workers finish.
// =============================================================================

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::QueueError;
use crate::job::Outcome;

pub struct ResultChannel;

impl ResultChannel {
    /// Create a connected sender/receiver pair.
    pub fn new() -> (ResultSender, ResultReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ResultSender { tx }, ResultReceiver { rx })
    }
}

/// Worker side. Cheap to clone; one clone per worker.
#[derive(Debug, Clone)]
pub struct ResultSender {
    tx: UnboundedSender<Outcome>,
}

impl ResultSender {
    pub fn push(&self, outcome: Outcome) -> Result<(), QueueError> {
        self.tx.send(outcome).map_err(|_| QueueError::ResultsClosed)
    }
}

/// Supervisor side.
#[derive(Debug)]
pub struct ResultReceiver {
    rx: UnboundedReceiver<Outcome>,
}

impl ResultReceiver {
    /// Block until an outcome arrives.
    ///
    /// Returns None only when every sender is gone and nothing is left.
    /// Must not be called from inside an async runtime.
    pub fn pop_blocking(&mut self) -> Option<Outcome> {
        self.rx.blocking_recv()
    }

    /// Pop exactly `expected` outcomes.
    pub fn drain(&mut self, expected: usize) -> Result<Vec<Outcome>, QueueError> {
        let mut outcomes = Vec::with_capacity(expected);
        while outcomes.len() < expected {
            match self.pop_blocking() {
                Some(outcome) => outcomes.push(outcome),
                None => {
                    return Err(QueueError::MissingResults {
                        received: outcomes.len(),
                        expected,
                    })
                }
            }
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn test_many_producers_one_consumer() {
        let (tx, mut rx) = ResultChannel::new();

        let handles: Vec<_> = (0..4u32)
            .map(|worker| {
                let tx = tx.clone();
                thread::spawn(move || {
                    for i in 0..25u32 {
                        tx.push(Outcome::success(worker * 25 + i + 1, 0))
                            .expect("push");
                    }
                })
            })
            .collect();
        drop(tx);

        for handle in handles {
            handle.join().expect("producer thread panicked");
        }

        let outcomes = rx.drain(100).expect("drain");
        let pages: HashSet<u32> = outcomes.iter().map(|o| o.page).collect();
        assert_eq!(pages.len(), 100);
    }

    #[test]
    fn test_pop_returns_none_once_senders_are_gone() {
        let (tx, mut rx) = ResultChannel::new();
        tx.push(Outcome::failed(1, "boom")).expect("push");
        drop(tx);

        assert_eq!(rx.pop_blocking(), Some(Outcome::failed(1, "boom")));
        assert_eq!(rx.pop_blocking(), None);
    }

    #[test]
    fn test_drain_reports_missing_outcomes() {
        let (tx, mut rx) = ResultChannel::new();
        tx.push(Outcome::success(1, 2)).expect("push");
        drop(tx);

        assert_eq!(
            rx.drain(3),
            Err(QueueError::MissingResults {
                received: 1,
                expected: 3
            })
        );
    }

    #[test]
    fn test_drain_zero_does_not_block() {
        // A live sender would block any pop; drain(0) must not pop at all
        let (_tx, mut rx) = ResultChannel::new();
        assert_eq!(rx.drain(0), Ok(Vec::new()));
    }

    #[test]
    fn test_push_after_receiver_dropped() {
        let (tx, rx) = ResultChannel::new();
        drop(rx);
        assert_eq!(
            tx.push(Outcome::success(1, 0)),
            Err(QueueError::ResultsClosed)
        );
    }
}

// src/queue/task.rs
// =============================================================================
// A joinable FIFO queue for assignments.
//
// The queue tracks two numbers:
// - pending: items enqueued but not yet handed out
// - in_flight: items handed out but not yet acknowledged
//
// The queue is "drained" only when both are zero. Waiting for pending == 0
// alone is not enough: a worker may still be fetching the last page it took.
//
// Known limitation: if a worker dies after dequeue() and before acknowledge(),
// in_flight never reaches zero and await_drained() blocks forever. Nothing
// re-delivers the lost item.
//
// Rust concepts:
// - Mutex + Condvar: block a thread until another thread changes shared state
// - Generics: the queue works for any item type
// =============================================================================

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::QueueError;

pub struct TaskQueue<T> {
    inner: Mutex<QueueState<T>>,
    // Signalled on every enqueue
    available: Condvar,
    // Signalled when pending and in_flight both reach zero
    drained: Condvar,
}

struct QueueState<T> {
    pending: VecDeque<T>,
    in_flight: usize,
}

impl<T> QueueState<T> {
    fn is_drained(&self) -> bool {
        self.pending.is_empty() && self.in_flight == 0
    }
}

impl<T> TaskQueue<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueState {
                pending: VecDeque::new(),
                in_flight: 0,
            }),
            available: Condvar::new(),
            drained: Condvar::new(),
        }
    }

    // A panicking holder cannot leave the counters half-updated, so a
    // poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add one item. Never blocks; the queue is unbounded.
    pub fn enqueue(&self, item: T) {
        let mut guard = self.lock();
        guard.pending.push_back(item);
        self.available.notify_one();
    }

    /// Block until an item is available, then take it.
    ///
    /// The item counts as in flight until the caller acknowledges it.
    pub fn dequeue(&self) -> T {
        let mut guard = self.lock();
        loop {
            if let Some(item) = guard.pending.pop_front() {
                guard.in_flight += 1;
                return item;
            }
            guard = self
                .available
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Mark one previously dequeued item as finished.
    pub fn acknowledge(&self) -> Result<(), QueueError> {
        let mut guard = self.lock();
        if guard.in_flight == 0 {
            return Err(QueueError::AcknowledgedTooOften);
        }
        guard.in_flight -= 1;
        if guard.is_drained() {
            self.drained.notify_all();
        }
        Ok(())
    }

    /// Block until every enqueued item has been dequeued and acknowledged.
    pub fn await_drained(&self) {
        let guard = self.lock();
        let _guard = self
            .drained
            .wait_while(guard, |state| !state.is_drained())
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Like await_drained, but gives up after `timeout`.
    ///
    /// Returns true if the queue drained in time.
    #[cfg(test)]
    pub fn await_drained_timeout(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let (guard, _) = self
            .drained
            .wait_timeout_while(guard, timeout, |state| !state.is_drained())
            .unwrap_or_else(PoisonError::into_inner);
        guard.is_drained()
    }

    /// Items not yet handed out.
    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    /// Items handed out but not yet acknowledged.
    #[cfg(test)]
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What is a Condvar?
//    - A place where threads sleep until someone calls notify_one/notify_all
//    - wait() releases the Mutex while sleeping and re-locks it on wake-up
//    - Wake-ups can be spurious, which is why dequeue() loops and the drain
//      waits use wait_while()
//
// 2. Why two Condvars?
//    - Workers sleep on `available`, the supervisor on `drained`
//    - Separate Condvars mean an enqueue never wakes the supervisor for nothing
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::mpsc;
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn test_fifo_and_counters() {
        let queue = TaskQueue::new();
        queue.enqueue(1);
        queue.enqueue(2);
        assert_eq!(queue.pending(), 2);

        assert_eq!(queue.dequeue(), 1);
        assert_eq!(queue.pending(), 1);
        assert_eq!(queue.in_flight(), 1);

        queue.acknowledge().expect("ack");
        assert_eq!(queue.in_flight(), 0);
        assert_eq!(queue.dequeue(), 2);
    }

    #[test]
    fn test_empty_queue_is_drained() {
        let queue: TaskQueue<u32> = TaskQueue::new();
        // Must return immediately
        queue.await_drained();
        assert!(queue.await_drained_timeout(Duration::from_millis(1)));
    }

    #[test]
    fn test_acknowledge_without_dequeue_fails() {
        let queue: TaskQueue<u32> = TaskQueue::new();
        assert_eq!(queue.acknowledge(), Err(QueueError::AcknowledgedTooOften));

        queue.enqueue(1);
        // Enqueued but not dequeued is still nothing to acknowledge
        assert_eq!(queue.acknowledge(), Err(QueueError::AcknowledgedTooOften));
    }

    #[test]
    fn test_not_drained_until_acknowledged() {
        let queue = TaskQueue::new();
        queue.enqueue(1);
        let _ = queue.dequeue();

        // Nothing pending, but the item is still in flight
        assert_eq!(queue.pending(), 0);
        assert!(!queue.await_drained_timeout(Duration::from_millis(50)));

        queue.acknowledge().expect("ack");
        assert!(queue.await_drained_timeout(Duration::from_millis(50)));
    }

    #[test]
    fn test_await_drained_wakes_on_last_acknowledge() {
        let queue = Arc::new(TaskQueue::new());
        for id in 0..3 {
            queue.enqueue(id);
        }
        let (done_tx, done_rx) = mpsc::channel();

        let waiter = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                queue.await_drained();
                done_tx.send(()).expect("send done");
            })
        };

        for _ in 0..3 {
            let _ = queue.dequeue();
        }
        queue.acknowledge().expect("ack");
        queue.acknowledge().expect("ack");
        // Two of three acknowledged; the waiter must still be blocked
        assert!(done_rx.recv_timeout(Duration::from_millis(50)).is_err());

        queue.acknowledge().expect("ack");
        done_rx
            .recv_timeout(Duration::from_secs(1))
            .expect("waiter woke up");
        waiter.join().expect("waiter thread panicked");
    }

    #[test]
    fn test_dequeue_wakes_on_enqueue() {
        let queue = Arc::new(TaskQueue::new());
        let (ready_tx, ready_rx) = mpsc::channel();
        let (item_tx, item_rx) = mpsc::channel();

        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                ready_tx.send(()).expect("send ready");
                item_tx.send(queue.dequeue()).expect("send item");
            })
        };

        ready_rx
            .recv_timeout(Duration::from_secs(1))
            .expect("ready");
        queue.enqueue(99);

        let item = item_rx
            .recv_timeout(Duration::from_secs(1))
            .expect("receive item");
        assert_eq!(item, 99);
        consumer.join().expect("consumer thread panicked");
    }

    #[test]
    fn test_items_are_consumed_once() {
        let queue = Arc::new(TaskQueue::new());
        let total = 100u32;
        for id in 0..total {
            queue.enqueue(id);
        }

        let consumers = 4;
        let per_consumer = total as usize / consumers;
        let barrier = Arc::new(Barrier::new(consumers));

        let handles: Vec<_> = (0..consumers)
            .map(|_| {
                let queue = Arc::clone(&queue);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let mut seen = Vec::new();
                    for _ in 0..per_consumer {
                        seen.push(queue.dequeue());
                        queue.acknowledge().expect("ack");
                    }
                    seen
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().expect("consumer thread panicked") {
                assert!(seen.insert(id), "item {id} handed out twice");
            }
        }

        assert_eq!(seen.len(), total as usize);
        assert!(queue.await_drained_timeout(Duration::from_millis(50)));
    }
}

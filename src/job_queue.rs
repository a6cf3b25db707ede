//! Thread-safe FIFO job queue shared by every producer and consumer.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

use tracing::debug;

use crate::types::Job;

/// Unbounded, synchronized FIFO of jobs with a blocking pop.
///
/// All state lives behind one mutex. Consumers waiting on an empty queue sleep
/// on `available` and are woken by `push` (one waiter) or `close` (all waiters).
pub struct JobQueue {
    inner: Mutex<JobQueueState>,
    available: Condvar,
}

struct JobQueueState {
    queue: VecDeque<Job>,
    closed: bool,
}

impl JobQueue {
    /// Create an empty, open queue.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(JobQueueState {
                queue: VecDeque::new(),
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Append a job to the tail and wake one waiting consumer.
    ///
    /// Jobs pushed after `close` are still accepted; consumers drain them
    /// before observing the closed state.
    pub fn push(&self, job: Job) {
        let mut guard = self.inner.lock().expect("job queue mutex poisoned");
        guard.queue.push_back(job);
        self.available.notify_one();
        debug!(job, "produced");
    }

    /// Try to pop immediately without blocking.
    #[cfg(test)]
    pub fn try_pop(&self) -> Option<Job> {
        let mut guard = self.inner.lock().expect("job queue mutex poisoned");
        guard.queue.pop_front()
    }

    /// Block until a job is available; `None` once the queue is closed and empty.
    pub fn pop_blocking(&self) -> Option<Job> {
        let mut guard = self.inner.lock().expect("job queue mutex poisoned");
        loop {
            if let Some(job) = guard.queue.pop_front() {
                debug!(job, "consumed");
                return Some(job);
            }
            if guard.closed {
                return None;
            }
            // Wait releases the lock and re-acquires it before returning.
            guard = self.available.wait(guard).expect("condvar wait failed");
        }
    }

    /// Close the queue and wake all blocked consumers.
    pub fn close(&self) {
        let mut guard = self.inner.lock().expect("job queue mutex poisoned");
        guard.closed = true;
        self.available.notify_all();
    }

    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.inner.lock().expect("job queue mutex poisoned").closed
    }

    /// Current number of queued jobs.
    pub fn len(&self) -> usize {
        let guard = self.inner.lock().expect("job queue mutex poisoned");
        guard.queue.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::mpsc;
    use std::sync::{Arc, Barrier, Mutex};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn pops_follow_push_order() {
        let queue = JobQueue::new();
        for job in [7, 3, 99, 0, 3] {
            queue.push(job);
        }
        let drained: Vec<Job> = std::iter::from_fn(|| queue.try_pop()).collect();
        assert_eq!(drained, vec![7, 3, 99, 0, 3]);
        assert!(queue.is_empty());
    }

    #[test]
    fn jobs_are_consumed_once() {
        let queue = Arc::new(JobQueue::new());
        let total_jobs = 400u32;
        for n in 0..total_jobs {
            queue.push(n % 100);
        }

        let consumers = 4;
        let barrier = Arc::new(Barrier::new(consumers));
        let seen: Arc<Mutex<HashMap<Job, usize>>> = Arc::new(Mutex::new(HashMap::new()));

        let mut handles = Vec::new();
        for _ in 0..consumers {
            let queue = Arc::clone(&queue);
            let barrier = Arc::clone(&barrier);
            let seen = Arc::clone(&seen);
            handles.push(thread::spawn(move || {
                barrier.wait();
                while let Some(job) = queue.try_pop() {
                    let mut guard = seen.lock().expect("seen mutex poisoned");
                    *guard.entry(job).or_default() += 1;
                }
            }));
        }

        for handle in handles {
            handle.join().expect("consumer thread panicked");
        }

        // Each value was pushed exactly four times, so the multiset must match.
        let guard = seen.lock().expect("seen mutex poisoned");
        assert_eq!(guard.len(), 100);
        assert!(guard.values().all(|&count| count == 4));
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn live_producers_and_blocking_consumers_agree_on_multiset() {
        let queue = Arc::new(JobQueue::new());
        let producers = 3;
        let consumers = 3;
        let per_producer = 2_000u32;
        let start = Arc::new(Barrier::new(producers + consumers));

        let mut consumer_handles = Vec::new();
        for _ in 0..consumers {
            let queue = Arc::clone(&queue);
            let start = Arc::clone(&start);
            consumer_handles.push(thread::spawn(move || {
                start.wait();
                let mut received = Vec::new();
                while let Some(job) = queue.pop_blocking() {
                    received.push(job);
                }
                received
            }));
        }

        let mut producer_handles = Vec::new();
        for p in 0..producers as u32 {
            let queue = Arc::clone(&queue);
            let start = Arc::clone(&start);
            producer_handles.push(thread::spawn(move || {
                start.wait();
                for n in 0..per_producer {
                    queue.push((p * 7 + n) % 100);
                }
            }));
        }
        for handle in producer_handles {
            handle.join().expect("producer thread panicked");
        }
        queue.close();

        let mut popped: HashMap<Job, usize> = HashMap::new();
        for handle in consumer_handles {
            for job in handle.join().expect("consumer thread panicked") {
                *popped.entry(job).or_default() += 1;
            }
        }
        let mut pushed: HashMap<Job, usize> = HashMap::new();
        for p in 0..producers as u32 {
            for n in 0..per_producer {
                *pushed.entry((p * 7 + n) % 100).or_default() += 1;
            }
        }
        assert_eq!(popped, pushed);
        assert!(queue.is_empty());
    }

    #[test]
    fn pop_blocking_wakes_on_push() {
        let queue = Arc::new(JobQueue::new());
        let (tx, rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        let queue_clone = Arc::clone(&queue);
        let handle = thread::spawn(move || {
            ready_tx.send(()).expect("send ready");
            let job = queue_clone.pop_blocking().expect("job queue closed");
            tx.send(job).expect("send job");
        });

        ready_rx
            .recv_timeout(Duration::from_secs(1))
            .expect("ready");
        // Pushing after the consumer blocks should wake it.
        queue.push(42);

        let received = rx
            .recv_timeout(Duration::from_secs(1))
            .expect("receive job");
        assert_eq!(received, 42);
        handle.join().expect("blocking pop thread panicked");
    }

    #[test]
    fn blocking_consumers_each_get_unique_job() {
        let queue = Arc::new(JobQueue::new());
        let consumers = 4;
        let barrier = Arc::new(Barrier::new(consumers));
        let (ready_tx, ready_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel();

        let mut handles = Vec::new();
        for _ in 0..consumers {
            let queue = Arc::clone(&queue);
            let barrier = Arc::clone(&barrier);
            let ready_tx = ready_tx.clone();
            let done_tx = done_tx.clone();
            handles.push(thread::spawn(move || {
                barrier.wait();
                ready_tx.send(()).expect("ready");
                let job = queue.pop_blocking().expect("job queue closed");
                done_tx.send(job).expect("done");
            }));
        }

        for _ in 0..consumers {
            ready_rx
                .recv_timeout(Duration::from_secs(1))
                .expect("ready recv");
        }

        // Provide exactly one job per consumer.
        for job in 0..consumers as Job {
            queue.push(job);
        }

        let mut seen = Vec::new();
        for _ in 0..consumers {
            let job = done_rx
                .recv_timeout(Duration::from_secs(1))
                .expect("done recv");
            seen.push(job);
        }
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3]);

        for handle in handles {
            handle.join().expect("consumer thread panicked");
        }
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn close_unblocks_every_waiting_consumer() {
        let queue = Arc::new(JobQueue::new());
        let consumers = 3;
        let (ready_tx, ready_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel();

        let mut handles = Vec::new();
        for _ in 0..consumers {
            let queue = Arc::clone(&queue);
            let ready_tx = ready_tx.clone();
            let done_tx = done_tx.clone();
            handles.push(thread::spawn(move || {
                ready_tx.send(()).expect("ready");
                let job = queue.pop_blocking();
                done_tx.send(job.is_none()).expect("done");
            }));
        }
        for _ in 0..consumers {
            ready_rx
                .recv_timeout(Duration::from_secs(1))
                .expect("ready recv");
        }
        queue.close();

        for _ in 0..consumers {
            let closed = done_rx
                .recv_timeout(Duration::from_secs(1))
                .expect("done recv");
            assert!(closed);
        }
        for handle in handles {
            handle.join().expect("consumer thread panicked");
        }
    }

    #[test]
    fn closed_queue_still_drains_remaining_jobs() {
        let queue = JobQueue::new();
        queue.push(5);
        queue.close();
        // Late pushes are accepted and drained too.
        queue.push(6);
        assert!(queue.is_closed());
        assert_eq!(queue.pop_blocking(), Some(5));
        assert_eq!(queue.pop_blocking(), Some(6));
        assert_eq!(queue.pop_blocking(), None);
    }
}

//! Producer and consumer loops run on their own threads.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::info;

use crate::job_queue::JobQueue;
use crate::job_source::JobSource;
use crate::stop_signal::StopSignal;
use crate::types::{Job, TaskId};

/// What a producer did before it observed the stop signal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProducerReport {
    pub id: TaskId,
    pub pushed: u64,
    /// Wrapping sum of every pushed job value.
    pub checksum: u64,
}

/// What a consumer received before the queue was closed and drained.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConsumerReport {
    pub id: TaskId,
    pub popped: u64,
    /// Wrapping sum of every popped job value.
    pub checksum: u64,
}

/// Handles shared by all tasks of one run.
#[derive(Clone)]
pub struct WorkerContext {
    pub queue: Arc<JobQueue>,
    pub stop: Arc<StopSignal>,
}

/// Generate and enqueue jobs until the stop signal is raised.
///
/// The flag is checked before each push, so one job may still land after
/// the signal fires.
pub fn run_producer(
    id: TaskId,
    ctx: WorkerContext,
    mut source: impl JobSource,
    interval: Duration,
) -> ProducerReport {
    info!(producer = id, "producer starting");
    let mut report = ProducerReport {
        id,
        ..ProducerReport::default()
    };
    while !ctx.stop.is_set() {
        let job = source.next_job();
        ctx.queue.push(job);
        report.pushed += 1;
        report.checksum = report.checksum.wrapping_add(u64::from(job));
        if !interval.is_zero() {
            thread::sleep(interval);
        }
    }
    info!(producer = id, pushed = report.pushed, "producer finished");
    report
}

/// Dequeue and process jobs until the queue is closed and drained.
///
/// The queue is closed once after the stop signal fires, which wakes every
/// consumer still blocked on an empty queue.
pub fn run_consumer(id: TaskId, ctx: WorkerContext, work: Duration) -> ConsumerReport {
    info!(consumer = id, "consumer starting");
    let mut report = ConsumerReport {
        id,
        ..ConsumerReport::default()
    };
    let mut stop_seen = false;
    while let Some(job) = ctx.queue.pop_blocking() {
        process(job, work);
        report.popped += 1;
        report.checksum = report.checksum.wrapping_add(u64::from(job));
        if !stop_seen && ctx.stop.is_set() {
            stop_seen = true;
            info!(consumer = id, backlog = ctx.queue.len(), "stop observed, draining");
        }
    }
    info!(consumer = id, popped = report.popped, "consumer finished");
    report
}

fn process(_job: Job, work: Duration) {
    if !work.is_zero() {
        thread::sleep(work);
    }
}

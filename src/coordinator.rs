//! Lifecycle of one run: spawn, timed run, stop, join.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::config::RunConfig;
use crate::error::{RelayError, Result};
use crate::job_queue::JobQueue;
use crate::job_source::{JobSource, RandomJobSource, time_seed};
use crate::stop_signal::StopSignal;
use crate::summary::{RunSummary, cpu_times_seconds};
use crate::types::{TaskId, TaskRole};
use crate::worker::{self, ConsumerReport, ProducerReport, WorkerContext};

struct TaskHandle<T> {
    name: String,
    handle: thread::JoinHandle<T>,
}

impl<T> TaskHandle<T> {
    fn join(self) -> Result<T> {
        self.handle
            .join()
            .map_err(|_| RelayError::TaskPanicked { name: self.name })
    }
}

/// Owns every task handle of a run until they are joined.
pub struct Coordinator {
    queue: Arc<JobQueue>,
    stop: Arc<StopSignal>,
    producers: Vec<TaskHandle<ProducerReport>>,
    consumers: Vec<TaskHandle<ConsumerReport>>,
    started_at: Instant,
    cpu_start: Option<(f64, f64)>,
}

impl Coordinator {
    /// Spawn the configured producers (random jobs) and consumers.
    pub fn start(config: &RunConfig) -> Result<Self> {
        let seed = time_seed();
        Self::start_with_sources(config, |id| {
            RandomJobSource::from_seed(seed.wrapping_add(id as u64))
        })
    }

    /// Spawn tasks with a caller-chosen job source per producer.
    ///
    /// If any spawn fails, the tasks already running are stopped and joined
    /// before the error is returned.
    pub fn start_with_sources<S, F>(config: &RunConfig, mut make_source: F) -> Result<Self>
    where
        S: JobSource + 'static,
        F: FnMut(TaskId) -> S,
    {
        config.validate()?;
        info!(
            producers = config.producers,
            consumers = config.consumers,
            "run starting"
        );
        let mut coordinator = Self {
            queue: Arc::new(JobQueue::new()),
            stop: Arc::new(StopSignal::new()),
            producers: Vec::with_capacity(config.producers),
            consumers: Vec::with_capacity(config.consumers),
            started_at: Instant::now(),
            cpu_start: cpu_times_seconds(),
        };

        // Consumers first so early pushes find a waiter.
        for id in 0..config.consumers {
            let ctx = coordinator.context();
            let work = config.consume_work;
            match spawn_task(TaskRole::Consumer, id, move || {
                worker::run_consumer(id, ctx, work)
            }) {
                Ok(task) => coordinator.consumers.push(task),
                Err(err) => return Err(coordinator.abort(err)),
            }
        }
        for id in 0..config.producers {
            let ctx = coordinator.context();
            let source = make_source(id);
            let interval = config.produce_interval;
            match spawn_task(TaskRole::Producer, id, move || {
                worker::run_producer(id, ctx, source, interval)
            }) {
                Ok(task) => coordinator.producers.push(task),
                Err(err) => return Err(coordinator.abort(err)),
            }
        }
        Ok(coordinator)
    }

    fn context(&self) -> WorkerContext {
        WorkerContext {
            queue: Arc::clone(&self.queue),
            stop: Arc::clone(&self.stop),
        }
    }

    /// Shared stop flag, for raising the signal from another thread.
    #[cfg(test)]
    pub fn stop_signal(&self) -> Arc<StopSignal> {
        Arc::clone(&self.stop)
    }

    /// Sleep the calling thread for `duration`, then raise the stop signal.
    pub fn run_for(&self, duration: Duration) {
        thread::sleep(duration);
        self.signal_stop();
    }

    /// Raise the stop signal. Returns `true` if this call performed the transition.
    pub fn signal_stop(&self) -> bool {
        let transitioned = self.stop.set();
        if transitioned {
            info!(
                elapsed_ms = self.started_at.elapsed().as_millis() as u64,
                queued = self.queue.len(),
                "stop signalled"
            );
        }
        transitioned
    }

    /// Join every task and summarize the run.
    ///
    /// Blocks until the stop signal has been raised and all tasks have
    /// unwound. Producers are joined first; the queue is then closed so
    /// consumers drain what is left and wake even if they sit on an empty
    /// queue. Every task is joined even when one of them panicked; the first
    /// failure is returned after that.
    pub fn await_all(mut self) -> Result<RunSummary> {
        let (producers, consumers, first_error) = self.join_all();
        if let Some(err) = first_error {
            return Err(err);
        }

        let cpu = match (self.cpu_start, cpu_times_seconds()) {
            (Some((user_start, sys_start)), Some((user_end, sys_end))) => {
                Some((user_end - user_start, sys_end - sys_start))
            }
            _ => None,
        };
        let summary = RunSummary::new(
            producers,
            consumers,
            self.queue.len(),
            self.started_at.elapsed(),
            cpu,
        );
        info!(
            pushed = summary.pushed,
            popped = summary.popped,
            leftover = summary.leftover,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "run finished"
        );
        Ok(summary)
    }

    /// Join producers, close the queue, join consumers. Leaves both handle lists empty.
    fn join_all(
        &mut self,
    ) -> (
        Vec<ProducerReport>,
        Vec<ConsumerReport>,
        Option<RelayError>,
    ) {
        let mut first_error = None;

        let mut producers = Vec::with_capacity(self.producers.len());
        for task in std::mem::take(&mut self.producers) {
            match task.join() {
                Ok(report) => producers.push(report),
                Err(err) => {
                    warn!(error = %err, "producer failed");
                    first_error.get_or_insert(err);
                }
            }
        }

        self.queue.close();

        let mut consumers = Vec::with_capacity(self.consumers.len());
        for task in std::mem::take(&mut self.consumers) {
            match task.join() {
                Ok(report) => consumers.push(report),
                Err(err) => {
                    warn!(error = %err, "consumer failed");
                    first_error.get_or_insert(err);
                }
            }
        }

        (producers, consumers, first_error)
    }

    /// Stop and join whatever was spawned, then hand back the original error.
    fn abort(mut self, err: RelayError) -> RelayError {
        warn!(error = %err, "aborting run");
        self.signal_stop();
        if let (_, _, Some(join_err)) = self.join_all() {
            warn!(error = %join_err, "task failed during abort");
        }
        err
    }
}

impl Drop for Coordinator {
    /// A coordinator dropped before `await_all` still stops and joins its tasks.
    fn drop(&mut self) {
        if self.producers.is_empty() && self.consumers.is_empty() {
            return;
        }
        self.signal_stop();
        let _ = self.join_all();
    }
}

fn spawn_task<T, F>(role: TaskRole, id: TaskId, body: F) -> Result<TaskHandle<T>>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let name = role.thread_name(id);
    let handle = thread::Builder::new()
        .name(name.clone())
        .spawn(body)
        .map_err(|source| RelayError::Spawn {
            name: name.clone(),
            source,
        })?;
    Ok(TaskHandle { name, handle })
}

/// Run `config` end to end: spawn, wait for the duration, stop, join.
pub fn run(config: &RunConfig) -> Result<RunSummary> {
    let coordinator = Coordinator::start(config)?;
    coordinator.run_for(config.duration);
    coordinator.await_all()
}

//! Job value generators used by producers.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::{JOB_BOUND, Job};

/// Source of job values for a single producer.
pub trait JobSource: Send {
    /// Next job value in `0..JOB_BOUND`.
    fn next_job(&mut self) -> Job;
}

/// Pseudo-random jobs from a seeded `StdRng`.
pub struct RandomJobSource {
    rng: StdRng,
}

impl RandomJobSource {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl JobSource for RandomJobSource {
    fn next_job(&mut self) -> Job {
        self.rng.gen_range(0..JOB_BOUND)
    }
}

/// Seed taken once per run from the wall clock; producers derive their own from it.
pub fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Deterministic source cycling `start, start+1, ...` modulo `JOB_BOUND`.
#[cfg(test)]
pub struct SequenceJobSource {
    next: Job,
}

#[cfg(test)]
impl SequenceJobSource {
    pub fn starting_at(start: Job) -> Self {
        Self {
            next: start % JOB_BOUND,
        }
    }
}

#[cfg(test)]
impl JobSource for SequenceJobSource {
    fn next_job(&mut self) -> Job {
        let job = self.next;
        self.next = (self.next + 1) % JOB_BOUND;
        job
    }
}

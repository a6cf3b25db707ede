//! Aggregated results of a finished run.

use std::time::Duration;

use crate::worker::{ConsumerReport, ProducerReport};

/// Best-effort CPU user/system time snapshot (seconds) on Unix platforms.
#[cfg(unix)]
pub fn cpu_times_seconds() -> Option<(f64, f64)> {
    use libc::{RUSAGE_SELF, getrusage, rusage};
    // SAFETY: rusage is plain old data; all-zero is a valid value.
    let mut usage: rusage = unsafe { std::mem::zeroed() };
    // SAFETY: `usage` is a valid, exclusively borrowed rusage for the call.
    let rc = unsafe { getrusage(RUSAGE_SELF, &mut usage) };
    if rc != 0 {
        return None;
    }
    let user = usage.ru_utime.tv_sec as f64 + (usage.ru_utime.tv_usec as f64 / 1_000_000.0);
    let sys = usage.ru_stime.tv_sec as f64 + (usage.ru_stime.tv_usec as f64 / 1_000_000.0);
    Some((user, sys))
}

/// Stub on non-Unix platforms.
#[cfg(not(unix))]
pub fn cpu_times_seconds() -> Option<(f64, f64)> {
    None
}

/// Totals across every producer and consumer of one run.
#[derive(Clone, Debug)]
pub struct RunSummary {
    pub producers: Vec<ProducerReport>,
    pub consumers: Vec<ConsumerReport>,
    pub pushed: u64,
    pub popped: u64,
    /// Jobs still queued after every task joined.
    pub leftover: usize,
    pub push_checksum: u64,
    pub pop_checksum: u64,
    pub elapsed: Duration,
    pub cpu_user_s: Option<f64>,
    pub cpu_sys_s: Option<f64>,
}

impl RunSummary {
    pub fn new(
        mut producers: Vec<ProducerReport>,
        mut consumers: Vec<ConsumerReport>,
        leftover: usize,
        elapsed: Duration,
        cpu: Option<(f64, f64)>,
    ) -> Self {
        producers.sort_by_key(|r| r.id);
        consumers.sort_by_key(|r| r.id);
        let pushed = producers.iter().map(|r| r.pushed).sum();
        let popped = consumers.iter().map(|r| r.popped).sum();
        let push_checksum = producers
            .iter()
            .fold(0u64, |acc, r| acc.wrapping_add(r.checksum));
        let pop_checksum = consumers
            .iter()
            .fold(0u64, |acc, r| acc.wrapping_add(r.checksum));
        Self {
            producers,
            consumers,
            pushed,
            popped,
            leftover,
            push_checksum,
            pop_checksum,
            elapsed,
            cpu_user_s: cpu.map(|(user, _)| user),
            cpu_sys_s: cpu.map(|(_, sys)| sys),
        }
    }

    /// Every pushed job was popped exactly once.
    pub fn is_lossless(&self) -> bool {
        self.pushed == self.popped && self.leftover == 0 && self.push_checksum == self.pop_checksum
    }

    /// `key=value` lines for the CLI summary block.
    pub fn render(&self) -> String {
        let cpu_user = self
            .cpu_user_s
            .map(|v| format!("{v:.4}"))
            .unwrap_or_else(|| "NA".to_string());
        let cpu_sys = self
            .cpu_sys_s
            .map(|v| format!("{v:.4}"))
            .unwrap_or_else(|| "NA".to_string());
        let per_producer: Vec<u64> = self.producers.iter().map(|r| r.pushed).collect();
        let per_consumer: Vec<u64> = self.consumers.iter().map(|r| r.popped).collect();
        let mut out = String::new();
        out.push_str("RUN SUMMARY\n");
        out.push_str(&format!(
            "producers={} consumers={}\n",
            self.producers.len(),
            self.consumers.len()
        ));
        out.push_str(&format!("pushed={} popped={}\n", self.pushed, self.popped));
        out.push_str(&format!("pushed_per_producer={per_producer:?}\n"));
        out.push_str(&format!("popped_per_consumer={per_consumer:?}\n"));
        out.push_str(&format!("leftover={}\n", self.leftover));
        out.push_str(&format!("lossless={}\n", self.is_lossless()));
        out.push_str(&format!("elapsed_ms={}\n", self.elapsed.as_millis()));
        out.push_str(&format!("cpu_user_s={cpu_user} cpu_sys_s={cpu_sys}\n"));
        out
    }
}

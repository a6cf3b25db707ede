//! Run configuration and its positional command-line overrides.

use std::time::Duration;

use crate::error::{RelayError, Result};

// Defaults for a plain `job_relay` invocation.
pub const DEFAULT_PRODUCERS: usize = 2;
pub const DEFAULT_CONSUMERS: usize = 2;
pub const DEFAULT_DURATION_MS: u64 = 5_000;

/// Shape and timing of one run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunConfig {
    pub producers: usize,
    pub consumers: usize,
    /// How long tasks run before the stop signal is raised.
    pub duration: Duration,
    /// Pause after each push; zero produces as fast as possible.
    pub produce_interval: Duration,
    /// Simulated processing time per consumed job.
    pub consume_work: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            producers: DEFAULT_PRODUCERS,
            consumers: DEFAULT_CONSUMERS,
            duration: Duration::from_millis(DEFAULT_DURATION_MS),
            produce_interval: Duration::ZERO,
            consume_work: Duration::ZERO,
        }
    }
}

impl RunConfig {
    /// Reject shapes that could never finish cleanly.
    pub fn validate(&self) -> Result<()> {
        if self.producers > 0 && self.consumers == 0 {
            return Err(RelayError::InvalidConfig(
                "consumers must be > 0 when producers are running".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply `[producers] [consumers] [duration_ms] [produce_interval_us]`.
    ///
    /// `-` keeps the default for that position.
    pub fn from_args<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut config = Self::default();
        let mut args = args.into_iter();
        if let Some(value) = parse_slot::<usize>(args.next(), "producers")? {
            config.producers = value;
        }
        if let Some(value) = parse_slot::<usize>(args.next(), "consumers")? {
            config.consumers = value;
        }
        if let Some(value) = parse_slot::<u64>(args.next(), "duration_ms")? {
            config.duration = Duration::from_millis(value);
        }
        if let Some(value) = parse_slot::<u64>(args.next(), "produce_interval_us")? {
            config.produce_interval = Duration::from_micros(value);
        }
        if let Some(extra) = args.next() {
            return Err(RelayError::InvalidConfig(format!(
                "unexpected argument: {}",
                extra.as_ref()
            )));
        }
        config.validate()?;
        Ok(config)
    }
}

fn parse_slot<T: std::str::FromStr>(
    arg: Option<impl AsRef<str>>,
    name: &str,
) -> Result<Option<T>> {
    let Some(arg) = arg else {
        return Ok(None);
    };
    let arg = arg.as_ref().trim();
    if arg == "-" {
        return Ok(None);
    }
    arg.parse::<T>()
        .map(Some)
        .map_err(|_| RelayError::InvalidConfig(format!("invalid {name} value: {arg}")))
}

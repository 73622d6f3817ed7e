use std::fmt;
use std::time::Duration;

use tracing::debug;

use crate::clock::Clock;
use crate::environment::ProcessEnvironment;
use crate::tables::ProbeTables;

/// `TracerPid` of the current process, or `None` if the status source is
/// unreadable or malformed.
pub fn tracer_pid(env: &dyn ProcessEnvironment, tables: &ProbeTables) -> Option<u32> {
    match env.read_to_string(tables.status_path) {
        Ok(status) => parse_tracer_pid(&status),
        Err(err) => {
            debug!(
                path = tables.status_path,
                error = %err,
                "process status unavailable; treating as not traced"
            );
            None
        }
    }
}

pub fn detect_traced(env: &dyn ProcessEnvironment, tables: &ProbeTables) -> bool {
    matches!(tracer_pid(env, tables), Some(pid) if pid > 0)
}

pub fn parse_tracer_pid(status: &str) -> Option<u32> {
    for line in status.lines() {
        let Some(raw) = line.strip_prefix("TracerPid:") else {
            continue;
        };
        let value = raw.trim();
        if value.is_empty() {
            return None;
        }
        return value.parse::<u32>().ok();
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingSample {
    pub elapsed: Duration,
    pub threshold: Duration,
}

impl TimingSample {
    pub fn anomalous(&self) -> bool {
        self.elapsed > self.threshold
    }
}

impl fmt::Display for TimingSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "timing probe took {}us (threshold={}us)",
            self.elapsed.as_micros(),
            self.threshold.as_micros()
        )
    }
}

/// Times a fixed arithmetic workload between two clock reads.
pub fn sample_timing(clock: &dyn Clock, iterations: u32, threshold: Duration) -> TimingSample {
    let start = clock.now();
    std::hint::black_box(run_timing_workload(iterations));
    let end = clock.now();
    TimingSample {
        elapsed: end.saturating_duration_since(start),
        threshold,
    }
}

pub fn run_timing_workload(iterations: u32) -> u64 {
    let mut sum = 0u64;
    for i in 0..iterations as u64 {
        sum = sum.wrapping_add(i.wrapping_mul(i));
        std::hint::black_box(sum);
    }
    sum
}

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Estimate {
    pub elapsed: Duration,
    pub average: Duration,
    pub remaining: Duration,
}

/// Average time per item so far and the time left for the rest.
pub fn estimate(done: usize, total: usize, elapsed: Duration) -> Estimate {
    let average = if done == 0 {
        Duration::ZERO
    } else {
        elapsed.div_f64(done as f64)
    };
    let left = total.saturating_sub(done);
    Estimate {
        elapsed,
        average,
        remaining: average.mul_f64(left as f64),
    }
}

/// Tracks throughput of the enrichment phase. Purely observational.
#[derive(Debug, Clone)]
pub struct Progress {
    total: usize,
    started: Instant,
}

impl Progress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            started: Instant::now(),
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn estimate(&self, done: usize) -> Estimate {
        estimate(done, self.total, self.started.elapsed())
    }
}

/// `m:ss`, or `h:mm:ss` past the hour.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

//! Run-relative timing.

/// Duration of one acquisition clock tick in nanoseconds.
pub const DEFAULT_TICK_NS: f64 = 4.0;

const NS_PER_MS: f64 = 1_000_000.0;

/// Converts raw timestamps to milliseconds since the first event of the run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunClock {
    start: Option<u64>,
    tick_ns: f64,
}

impl Default for RunClock {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_NS)
    }
}

impl RunClock {
    /// Creates a clock with the given tick length.
    #[must_use]
    pub fn new(tick_ns: f64) -> Self {
        Self {
            start: None,
            tick_ns,
        }
    }

    /// Timestamp that defines the start of the run, once seen.
    #[must_use]
    pub fn start(&self) -> Option<u64> {
        self.start
    }

    /// Milliseconds between `timestamp` and the run start, truncated.
    ///
    /// The first timestamp passed in becomes the run start. Timestamps earlier
    /// than the start clamp to zero.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn elapsed_ms(&mut self, timestamp: u64) -> u64 {
        let start = *self.start.get_or_insert(timestamp);
        let ticks = timestamp.saturating_sub(start);
        (ticks as f64 * self.tick_ns / NS_PER_MS) as u64
    }
}

//! Time-sliced pacing shared by every rate limited stream
//!
//! Time is cut into slices of length `tau`. If `d_t` bytes cross during slice `t` and the rate is
//! capped at `L`, then `d_t / tau <= L` must hold for every slice. A paced call therefore sleeps
//! one slice, moves at most `L * tau` bytes with a single call to the underlying stream, and
//! repeats until the buffer is done. Unused budget is never carried into the next slice.

use std::ops::Range;
use std::time::Duration;

use crate::config::FirstChunkDelay;
use crate::config::PacingConfig;
use crate::error::Result;
use crate::rate::Rate;

/// Immutable pacing plan derived once per stream wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacer {
    rate: Rate,
    interval: Duration,
    slice_budget: usize,
    first_chunk_delay: FirstChunkDelay,
}

impl Pacer {
    /// Validate `config` and derive its per-slice byte budget
    pub fn new(config: &PacingConfig) -> Result<Self> {
        let slice_budget = config.slice_budget()?;

        Ok(Self { rate: config.rate, interval: config.interval, slice_budget, first_chunk_delay: config.first_chunk_delay })
    }

    pub fn rate(&self) -> Rate {
        self.rate
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Maximum bytes handed to the underlying stream per slice
    pub fn slice_budget(&self) -> usize {
        self.slice_budget
    }

    /// Bounds of the next chunk of a `total` byte call that has moved `pos` bytes so far
    #[inline]
    pub fn chunk(&self, pos: usize, total: usize) -> Range<usize> {
        let chunk_size = total.min(self.slice_budget);
        pos..pos.saturating_add(chunk_size).min(total)
    }

    /// Delay owed before the chunk starting at `pos`
    #[inline]
    pub fn delay_before(&self, pos: usize, total: usize) -> Option<Duration> {
        match self.first_chunk_delay {
            FirstChunkDelay::SkipWhenSingleChunk if pos == 0 && total <= self.slice_budget => None,
            _ => Some(self.interval),
        }
    }

    /// Lower bound on the wall-clock time of a `total` byte call
    pub fn min_duration(&self, total: usize) -> Duration {
        let chunks = total.div_ceil(self.slice_budget);
        let slept = match self.delay_before(0, total) {
            Some(_) => chunks,
            None => chunks.saturating_sub(1),
        };

        self.interval.saturating_mul(u32::try_from(slept).unwrap_or(u32::MAX))
    }
}

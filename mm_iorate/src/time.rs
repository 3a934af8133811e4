use std::time::Duration;
use std::time::Instant;

/// Blocking delay primitive used by the synchronous wrappers
///
/// Implementations must block the calling thread for at least `duration` without spinning.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the current thread with [`std::thread::sleep`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    #[inline]
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<S: Sleeper + ?Sized> Sleeper for &S {
    #[inline]
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

impl<S: Sleeper + ?Sized> Sleeper for std::sync::Arc<S> {
    #[inline]
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Monotonic stopwatch for a single paced call
///
/// Only feeds the completion logs; pacing itself never reads the clock.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TransferClock {
    started: Instant,
}

impl TransferClock {
    #[inline(always)]
    pub fn start() -> Self {
        Self { started: Instant::now() }
    }

    #[inline(always)]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Achieved throughput in bytes per second, zero when no time has passed
    pub fn bytes_per_second(&self, bytes: usize) -> u64 {
        let nanos = self.elapsed().as_nanos();
        if nanos == 0 {
            return 0;
        }
        u64::try_from(bytes as u128 * 1_000_000_000 / nanos).unwrap_or(u64::MAX)
    }
}

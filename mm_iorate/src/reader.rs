use std::io;
use std::io::Read;

use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::cancel;
use crate::cancel::CancelHandle;
use crate::config::PacingConfig;
use crate::error::Result;
use crate::error::TransferError;
use crate::pacer::Pacer;
use crate::rate::Rate;
use crate::time::Sleeper;
use crate::time::ThreadSleeper;
use crate::time::TransferClock;

/// Blocking reader that never pulls more than its rate from the wrapped source
///
/// Mirror image of [`RateLimitedWriter`](crate::RateLimitedWriter): each paced read sleeps one
/// interval, then asks the source for at most one slice budget of bytes, until the caller's
/// buffer is full or the source stops.
#[derive(Debug)]
pub struct RateLimitedReader<R, S = ThreadSleeper> {
    inner: R,
    pacer: Pacer,
    sleeper: S,
}

impl<R: Read> RateLimitedReader<R> {
    /// Wrap `inner`, capped at `rate` over the default 100ms interval
    pub fn new(inner: R, rate: Rate) -> Result<Self> {
        Self::with_config(inner, PacingConfig::new(rate))
    }

    pub fn with_config(inner: R, config: PacingConfig) -> Result<Self> {
        Self::with_sleeper(inner, config, ThreadSleeper)
    }
}

impl<R: Read, S: Sleeper> RateLimitedReader<R, S> {
    pub fn with_sleeper(inner: R, config: PacingConfig, sleeper: S) -> Result<Self> {
        let pacer = Pacer::new(&config)?;
        debug!("Rate limited reader: {} in {}-byte slices every {:?}", pacer.rate(), pacer.slice_budget(), pacer.interval());

        Ok(Self { inner, pacer, sleeper })
    }

    /// Fill `buf` from the source, pacing it to the configured rate
    ///
    /// End of stream is reported as [`TransferError::EndOfStream`] together with the bytes read
    /// so far.
    pub fn read_paced(&mut self, buf: &mut [u8]) -> std::result::Result<usize, TransferError> {
        self.transfer(buf, None)
    }

    pub fn read_paced_with_cancel(&mut self, buf: &mut [u8], cancel: &CancelHandle) -> std::result::Result<usize, TransferError> {
        self.transfer(buf, Some(cancel))
    }

    fn transfer(&mut self, buf: &mut [u8], cancel: Option<&CancelHandle>) -> std::result::Result<usize, TransferError> {
        let total = buf.len();
        let clock = TransferClock::start();
        let mut pos = 0;

        while pos < total {
            if let Some(delay) = self.pacer.delay_before(pos, total) {
                cancel::check(cancel, pos)?;
                self.sleeper.sleep(delay);
            }
            cancel::check(cancel, pos)?;

            let chunk = self.pacer.chunk(pos, total);
            trace!("Reading bytes {}..{} of {}", chunk.start, chunk.end, total);

            match self.inner.read(&mut buf[chunk]) {
                Ok(0) => {
                    debug!("Source ended after {pos} of {total} bytes");
                    return Err(TransferError::EndOfStream { transferred: pos });
                }
                Ok(read) => pos += read,
                Err(source) => {
                    warn!("Source failed after {pos} of {total} bytes: {source}");
                    return Err(TransferError::Io { transferred: pos, source });
                }
            }
        }

        if total > 0 {
            debug!("Paced read of {} bytes took {:?} ({} B/s)", pos, clock.elapsed(), clock.bytes_per_second(pos));
        }

        Ok(pos)
    }

    pub fn rate(&self) -> Rate {
        self.pacer.rate()
    }

    pub fn slice_budget(&self) -> usize {
        self.pacer.slice_budget()
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read, S: Sleeper> Read for RateLimitedReader<R, S> {
    /// Returns whatever arrived before the source stopped; `Ok(0)` only once it is exhausted
    ///
    /// A source error after partial progress is dropped in favour of `Ok(n)`. It only reappears if
    /// the source fails again on the next call. [`read_paced`](Self::read_paced) keeps the error.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.read_paced(buf) {
            Ok(read) => Ok(read),
            Err(TransferError::EndOfStream { transferred }) => Ok(transferred),
            Err(err) if err.transferred() > 0 => Ok(err.transferred()),
            Err(err) => Err(err.into()),
        }
    }
}

use std::io;
use std::io::Write;

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

/// Blocking writer that never forwards more than its rate to the wrapped sink
///
/// Every call to [`write_paced`](Self::write_paced) sleeps one interval, hands at most one slice
/// budget of bytes to a single `write` of the sink, and repeats until the buffer is consumed.
/// The sink is owned but never closed; take it back with [`into_inner`](Self::into_inner).
///
/// Intended for one caller at a time, which `&mut self` already enforces.
#[derive(Debug)]
pub struct RateLimitedWriter<W, S = ThreadSleeper> {
    inner: W,
    pacer: Pacer,
    sleeper: S,
}

impl<W: Write> RateLimitedWriter<W> {
    /// Wrap `inner`, capped at `rate` over the default 100ms interval
    pub fn new(inner: W, rate: Rate) -> Result<Self> {
        Self::with_config(inner, PacingConfig::new(rate))
    }

    pub fn with_config(inner: W, config: PacingConfig) -> Result<Self> {
        Self::with_sleeper(inner, config, ThreadSleeper)
    }
}

impl<W: Write, S: Sleeper> RateLimitedWriter<W, S> {
    /// Wrap `inner` using a custom delay primitive
    pub fn with_sleeper(inner: W, config: PacingConfig, sleeper: S) -> Result<Self> {
        let pacer = Pacer::new(&config)?;
        debug!("Rate limited writer: {} in {}-byte slices every {:?}", pacer.rate(), pacer.slice_budget(), pacer.interval());

        Ok(Self { inner, pacer, sleeper })
    }

    /// Write all of `buf`, pacing it to the configured rate
    ///
    /// On failure the error carries the exact number of bytes the sink accepted before it
    /// failed. Nothing is retried.
    pub fn write_paced(&mut self, buf: &[u8]) -> std::result::Result<usize, TransferError> {
        self.transfer(buf, None)
    }

    /// Like [`write_paced`](Self::write_paced), stopping at the next sleep boundary once `cancel`
    /// fires
    pub fn write_paced_with_cancel(&mut self, buf: &[u8], cancel: &CancelHandle) -> std::result::Result<usize, TransferError> {
        self.transfer(buf, Some(cancel))
    }

    fn transfer(&mut self, buf: &[u8], cancel: Option<&CancelHandle>) -> std::result::Result<usize, TransferError> {
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
            trace!("Writing bytes {}..{} of {}", chunk.start, chunk.end, total);

            match self.inner.write(&buf[chunk]) {
                Ok(0) => {
                    warn!("Sink accepted no bytes after {pos} of {total}");
                    return Err(TransferError::Io { transferred: pos, source: io::ErrorKind::WriteZero.into() });
                }
                Ok(sent) => pos += sent,
                Err(source) => {
                    warn!("Sink failed after {pos} of {total} bytes: {source}");
                    return Err(TransferError::Io { transferred: pos, source });
                }
            }
        }

        if total > 0 {
            debug!("Paced write of {} bytes took {:?} ({} B/s)", pos, clock.elapsed(), clock.bytes_per_second(pos));
        }

        Ok(pos)
    }

    pub fn rate(&self) -> Rate {
        self.pacer.rate()
    }

    pub fn slice_budget(&self) -> usize {
        self.pacer.slice_budget()
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write, S: Sleeper> Write for RateLimitedWriter<W, S> {
    /// Reports partial progress as `Ok(n)`, as [`Write::write`] expects
    ///
    /// The sink error behind a short write is dropped. The next call only sees it again if the sink
    /// keeps failing. Use [`write_paced`](Self::write_paced) to get the error with its count.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.write_paced(buf) {
            Ok(sent) => Ok(sent),
            Err(err) if err.transferred() > 0 => Ok(err.transferred()),
            Err(err) => Err(err.into()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

use std::io;

use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
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
use crate::time::TransferClock;

/// Tokio counterpart of [`RateLimitedWriter`](crate::RateLimitedWriter)
///
/// The interval sleep is a task suspension point rather than a blocked thread. With a
/// [`CancelHandle`] the sleep is raced against the handle, so cancelling wakes the call at once.
#[derive(Debug)]
pub struct AsyncRateLimitedWriter<W> {
    inner: W,
    pacer: Pacer,
}

impl<W: AsyncWrite + Unpin> AsyncRateLimitedWriter<W> {
    pub fn new(inner: W, rate: Rate) -> Result<Self> {
        Self::with_config(inner, PacingConfig::new(rate))
    }

    pub fn with_config(inner: W, config: PacingConfig) -> Result<Self> {
        let pacer = Pacer::new(&config)?;
        debug!("Async rate limited writer: {} in {}-byte slices every {:?}", pacer.rate(), pacer.slice_budget(), pacer.interval());

        Ok(Self { inner, pacer })
    }

    /// Write all of `buf`, pacing it to the configured rate
    pub async fn write_paced(&mut self, buf: &[u8]) -> std::result::Result<usize, TransferError> {
        self.transfer(buf, None).await
    }

    pub async fn write_paced_with_cancel(&mut self, buf: &[u8], cancel: &CancelHandle) -> std::result::Result<usize, TransferError> {
        self.transfer(buf, Some(cancel)).await
    }

    async fn transfer(&mut self, buf: &[u8], cancel: Option<&CancelHandle>) -> std::result::Result<usize, TransferError> {
        let total = buf.len();
        let clock = TransferClock::start();
        let mut pos = 0;

        while pos < total {
            if let Some(delay) = self.pacer.delay_before(pos, total) {
                cancel::sleep_unless_cancelled(delay, cancel, pos).await?;
            }
            cancel::check(cancel, pos)?;

            let chunk = self.pacer.chunk(pos, total);
            trace!("Writing bytes {}..{} of {}", chunk.start, chunk.end, total);

            match self.inner.write(&buf[chunk]).await {
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

    pub async fn flush(&mut self) -> io::Result<()> {
        self.inner.flush().await
    }

    /// Shut down the write half of the sink
    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.inner.shutdown().await
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

use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
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

/// Tokio counterpart of [`RateLimitedReader`](crate::RateLimitedReader)
#[derive(Debug)]
pub struct AsyncRateLimitedReader<R> {
    inner: R,
    pacer: Pacer,
}

impl<R: AsyncRead + Unpin> AsyncRateLimitedReader<R> {
    pub fn new(inner: R, rate: Rate) -> Result<Self> {
        Self::with_config(inner, PacingConfig::new(rate))
    }

    pub fn with_config(inner: R, config: PacingConfig) -> Result<Self> {
        let pacer = Pacer::new(&config)?;
        debug!("Async rate limited reader: {} in {}-byte slices every {:?}", pacer.rate(), pacer.slice_budget(), pacer.interval());

        Ok(Self { inner, pacer })
    }

    /// Fill `buf` from the source, pacing it to the configured rate
    pub async fn read_paced(&mut self, buf: &mut [u8]) -> std::result::Result<usize, TransferError> {
        self.transfer(buf, None).await
    }

    pub async fn read_paced_with_cancel(&mut self, buf: &mut [u8], cancel: &CancelHandle) -> std::result::Result<usize, TransferError> {
        self.transfer(buf, Some(cancel)).await
    }

    async fn transfer(&mut self, buf: &mut [u8], cancel: Option<&CancelHandle>) -> std::result::Result<usize, TransferError> {
        let total = buf.len();
        let clock = TransferClock::start();
        let mut pos = 0;

        while pos < total {
            if let Some(delay) = self.pacer.delay_before(pos, total) {
                cancel::sleep_unless_cancelled(delay, cancel, pos).await?;
            }
            cancel::check(cancel, pos)?;

            let chunk = self.pacer.chunk(pos, total);
            trace!("Reading bytes {}..{} of {}", chunk.start, chunk.end, total);

            match self.inner.read(&mut buf[chunk]).await {
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

use std::path::Path;
use std::time::Duration;

use config::Config;
use config::File;
use config::FileFormat;
use serde::Deserialize;

use crate::error::PacingError;
use crate::error::Result;
use crate::rate::Rate;

/// Default time slice over which the rate is enforced
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

/// Whether a call sleeps before its first chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirstChunkDelay {
    /// Sleep one interval before every chunk, the first included
    #[default]
    Always,

    /// Send straight away when the whole call fits in a single chunk
    SkipWhenSingleChunk,
}

/// Pacing parameters for a rate limited stream
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PacingConfig {
    /// Maximum bytes per second
    pub rate: Rate,

    /// Length of one time slice
    #[serde(rename = "interval_ms", with = "interval_millis", default = "default_interval")]
    pub interval: Duration,

    #[serde(default)]
    pub first_chunk_delay: FirstChunkDelay,
}

fn default_interval() -> Duration {
    DEFAULT_INTERVAL
}

mod interval_millis {
    use std::time::Duration;

    use serde::Deserialize;
    use serde::Deserializer;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

impl PacingConfig {
    /// Config for `rate` with the default interval and delay policy
    pub fn new(rate: Rate) -> Self {
        Self { rate, interval: DEFAULT_INTERVAL, first_chunk_delay: FirstChunkDelay::default() }
    }

    /// Create a builder for configuring pacing
    pub fn builder() -> PacingConfigBuilder {
        PacingConfigBuilder::new()
    }

    /// Parse a TOML document such as `rate = "10 Mbps"` / `interval_ms = 50`
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config: Self = Config::builder().add_source(File::from_str(toml, FileFormat::Toml)).build()?.try_deserialize()?;
        config.slice_budget()?;

        Ok(config)
    }

    /// Bytes permitted per interval, rejecting configurations that could never make progress
    pub fn slice_budget(&self) -> Result<usize> {
        if self.rate.is_zero() {
            return Err(PacingError::ZeroRate);
        }
        if self.interval.is_zero() {
            return Err(PacingError::ZeroInterval);
        }

        match self.rate.slice_budget(self.interval) {
            0 => Err(PacingError::BudgetTooSmall { rate: self.rate, interval_ms: self.interval.as_millis() as u64 }),
            budget => Ok(usize::try_from(budget).unwrap_or(usize::MAX)),
        }
    }
}

/// Builder for configuring pacing
#[derive(Debug, Default)]
pub struct PacingConfigBuilder {
    rate: Option<Rate>,
    interval: Option<Duration>,
    first_chunk_delay: FirstChunkDelay,
}

impl PacingConfigBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum rate
    pub fn rate(mut self, rate: Rate) -> Self {
        self.rate = Some(rate);
        self
    }

    /// Set the time slice length
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn first_chunk_delay(mut self, delay: FirstChunkDelay) -> Self {
        self.first_chunk_delay = delay;
        self
    }

    /// Build and validate the config
    pub fn build(self) -> Result<PacingConfig> {
        let config = PacingConfig {
            rate: self.rate.ok_or(PacingError::MissingRate)?,
            interval: self.interval.unwrap_or(DEFAULT_INTERVAL),
            first_chunk_delay: self.first_chunk_delay,
        };
        config.slice_budget()?;

        Ok(config)
    }
}

/// Load a pacing config from a file, format picked from its extension
///
/// The loaded config is validated the same way [`PacingConfigBuilder::build`] validates.
pub fn load_pacing_config<P: AsRef<Path>>(path: P) -> Result<PacingConfig> {
    let config: PacingConfig = Config::builder().add_source(File::from(path.as_ref())).build()?.try_deserialize()?;
    config.slice_budget()?;

    Ok(config)
}

/// Load a pacing config, falling back to `fallback_rate` with default timing
pub fn load_pacing_config_or_default<P: AsRef<Path>>(path: P, fallback_rate: Rate) -> PacingConfig {
    let path = path.as_ref();
    match load_pacing_config(path) {
        Ok(config) => {
            tracing::info!("Loaded pacing config from {}", path.display());
            config
        }
        Err(err) => {
            tracing::warn!("Failed to load pacing config from {}: {}. Using {}.", path.display(), err, fallback_rate);
            PacingConfig::new(fallback_rate)
        }
    }
}

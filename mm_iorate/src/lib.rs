//! Bandwidth capped readers and writers
//!
//! Wraps any byte stream so that it never moves more than a configured number of bytes per
//! second, enforced over fixed time slices (100ms by default).
//!
//! ```no_run
//! use std::io::Write;
//!
//! use mm_iorate::RateLimitedWriter;
//! use mm_iorate::units::Mbps;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = std::fs::File::create("capture.bin")?;
//! let mut writer = RateLimitedWriter::new(file, 8 * Mbps)?;
//! writer.write_all(&[0u8; 4096])?;
//! # Ok(())
//! # }
//! ```

pub mod async_reader;
pub mod async_writer;
pub mod cancel;
pub mod config;
pub mod error;
pub mod pacer;
pub mod rate;
pub mod reader;
mod time;
pub mod writer;

pub use async_reader::AsyncRateLimitedReader;
pub use async_writer::AsyncRateLimitedWriter;
pub use cancel::CancelHandle;
pub use config::DEFAULT_INTERVAL;
pub use config::FirstChunkDelay;
pub use config::PacingConfig;
pub use config::PacingConfigBuilder;
pub use config::load_pacing_config;
pub use config::load_pacing_config_or_default;
pub use error::PacingError;
pub use error::Result;
pub use error::TransferError;
pub use pacer::Pacer;
pub use rate::Rate;
pub use rate::units;
pub use reader::RateLimitedReader;
pub use time::Sleeper;
pub use time::ThreadSleeper;
pub use writer::RateLimitedWriter;

//! End-to-end pacing tests
//!
//! Wall-clock tests use short transfers so they finish in well under a second each.

use std::io;
use std::io::Cursor;
use std::io::Read;
use std::io::Write;
use std::time::Duration;
use std::time::Instant;

use mm_iorate::PacingConfig;
use mm_iorate::Rate;
use mm_iorate::RateLimitedReader;
use mm_iorate::RateLimitedWriter;
use mm_iorate::Sleeper;
use mm_iorate::TransferError;
use mm_iorate::units::*;
use proptest::prelude::*;

/// Sleeper that returns immediately, for tests that only check chunking
struct NoopSleeper;

impl Sleeper for NoopSleeper {
    fn sleep(&self, _duration: Duration) {}
}

/// Sink keeping every chunk it was handed, failing once `fail_at` bytes are stored
#[derive(Default)]
struct ChunkSink {
    chunks: Vec<Vec<u8>>,
    stored: usize,
    fail_at: Option<usize>,
}

impl Write for ChunkSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let room = match self.fail_at {
            Some(limit) if self.stored >= limit => return Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink full")),
            Some(limit) => limit - self.stored,
            None => usize::MAX,
        };
        let accepted = buf.len().min(room);
        self.chunks.push(buf[..accepted].to_vec());
        self.stored += accepted;
        Ok(accepted)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_ten_bytes_per_second_scenario() {
    let mut writer = RateLimitedWriter::new(Vec::<u8>::new(), 10 * Bps).unwrap();
    assert_eq!(writer.slice_budget(), 1);

    let start = Instant::now();
    assert_eq!(writer.write_paced(b"12345").unwrap(), 5);

    assert!(start.elapsed() >= Duration::from_millis(500), "finished in {:?}", start.elapsed());
    assert_eq!(writer.into_inner(), b"12345");
}

#[test]
fn test_reader_respects_slice_count() {
    let data = vec![3u8; 300];
    let mut reader = RateLimitedReader::new(Cursor::new(data.clone()), KBps).unwrap();
    let mut buf = vec![0u8; 300];

    let start = Instant::now();
    assert_eq!(reader.read_paced(&mut buf).unwrap(), 300);

    // 102-byte slices, so three intervals
    assert!(start.elapsed() >= Duration::from_millis(300), "finished in {:?}", start.elapsed());
    assert_eq!(buf, data);
}

#[test]
fn test_throughput_stays_under_rate() {
    let rate = 10 * KBps;
    let config = PacingConfig::builder().rate(rate).interval(Duration::from_millis(10)).build().unwrap();
    let mut writer = RateLimitedWriter::with_config(io::sink(), config).unwrap();
    let payload = vec![0u8; 2000];

    let start = Instant::now();
    writer.write_paced(&payload).unwrap();
    let elapsed = start.elapsed();

    let achieved = payload.len() as f64 / elapsed.as_secs_f64();
    assert!(achieved <= rate.bytes_per_second() as f64, "achieved {achieved:.0} B/s over {elapsed:?}");
}

#[test]
fn test_copy_between_paced_streams() {
    let data: Vec<u8> = (0..5000).map(|i| (i * 7 % 256) as u8).collect();
    let mut reader = RateLimitedReader::with_sleeper(Cursor::new(data.clone()), PacingConfig::new(MBps), NoopSleeper).unwrap();
    let mut writer = RateLimitedWriter::with_sleeper(Vec::<u8>::new(), PacingConfig::new(10 * KBps), NoopSleeper).unwrap();

    let copied = io::copy(&mut reader, &mut writer).unwrap();

    assert_eq!(copied, 5000);
    assert_eq!(writer.into_inner(), data);
}

#[test]
fn test_reader_stops_on_error() {
    struct FlakySource {
        served: usize,
        calls: usize,
    }

    impl Read for FlakySource {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.calls += 1;
            if self.served >= 150 {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "stalled"));
            }
            let n = buf.len().min(150 - self.served);
            buf[..n].fill(1);
            self.served += n;
            Ok(n)
        }
    }

    let source = FlakySource { served: 0, calls: 0 };
    let mut reader = RateLimitedReader::with_sleeper(source, PacingConfig::new(KBps), NoopSleeper).unwrap();
    let mut buf = vec![0u8; 1000];

    let err = reader.read_paced(&mut buf).unwrap_err();

    assert_eq!(err.transferred(), 150);
    assert!(matches!(&err, TransferError::Io { source, .. } if source.kind() == io::ErrorKind::TimedOut));
    assert_eq!(reader.get_ref().calls, 3);
}

proptest! {
    #[test]
    fn prop_writer_delivers_everything_in_budgeted_chunks(
        data in proptest::collection::vec(any::<u8>(), 0..4096),
        bytes_per_second in 10u64..200_000,
    ) {
        let mut writer = RateLimitedWriter::with_sleeper(ChunkSink::default(), PacingConfig::new(Rate::new(bytes_per_second)), NoopSleeper).unwrap();
        let budget = writer.slice_budget();

        prop_assert_eq!(writer.write_paced(&data).unwrap(), data.len());

        let sink = writer.into_inner();
        prop_assert!(sink.chunks.iter().all(|chunk| chunk.len() <= budget));
        prop_assert_eq!(sink.chunks.len(), data.len().div_ceil(budget));
        prop_assert_eq!(sink.chunks.concat(), data);
    }

    #[test]
    fn prop_writer_reports_exact_partial_count(
        data in proptest::collection::vec(any::<u8>(), 1..2048),
        bytes_per_second in 10u64..50_000,
        cut in 0.0f64..1.0,
    ) {
        let fail_at = ((data.len() as f64) * cut) as usize;
        let sink = ChunkSink { fail_at: Some(fail_at), ..Default::default() };
        let mut writer = RateLimitedWriter::with_sleeper(sink, PacingConfig::new(Rate::new(bytes_per_second)), NoopSleeper).unwrap();

        let err = writer.write_paced(&data).unwrap_err();
        prop_assert_eq!(err.transferred(), fail_at);

        // The failing call is the last one the sink sees
        let sink = writer.into_inner();
        prop_assert_eq!(sink.stored, fail_at);
        prop_assert_eq!(sink.chunks.concat(), data[..fail_at].to_vec());
    }

    #[test]
    fn prop_reader_fills_buffer(
        data in proptest::collection::vec(any::<u8>(), 0..4096),
        bytes_per_second in 10u64..200_000,
    ) {
        let mut reader = RateLimitedReader::with_sleeper(Cursor::new(data.clone()), PacingConfig::new(Rate::new(bytes_per_second)), NoopSleeper).unwrap();
        let mut buf = vec![0u8; data.len()];

        prop_assert_eq!(reader.read_paced(&mut buf).unwrap(), data.len());
        prop_assert_eq!(buf, data);
    }

    #[test]
    fn prop_min_duration_matches_slice_count(
        len in 0usize..100_000,
        bytes_per_second in 10u64..1_000_000,
    ) {
        let pacer = mm_iorate::Pacer::new(&PacingConfig::new(Rate::new(bytes_per_second))).unwrap();
        let slices = len.div_ceil(pacer.slice_budget()) as u32;

        prop_assert_eq!(pacer.min_duration(len), pacer.interval() * slices);
    }
}

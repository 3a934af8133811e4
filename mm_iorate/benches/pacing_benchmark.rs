use std::hint::black_box;
use std::io;
use std::time::Duration;

use criterion::Criterion;
use criterion::criterion_group;
use criterion::criterion_main;
use mm_iorate::PacingConfig;
use mm_iorate::Rate;
use mm_iorate::RateLimitedReader;
use mm_iorate::RateLimitedWriter;
use mm_iorate::Sleeper;
use mm_iorate::units::*;

/// Measures the chunking loop alone
struct NoopSleeper;

impl Sleeper for NoopSleeper {
    fn sleep(&self, _duration: Duration) {}
}

fn bench_paced_write(c: &mut Criterion) {
    let payload = vec![0u8; 1 << 20];

    c.bench_function("write 1MiB in 1KiB slices", |b| {
        let config = PacingConfig::builder().rate(10 * KBps).interval(Duration::from_millis(100)).build().unwrap();
        let mut writer = RateLimitedWriter::with_sleeper(io::sink(), config, NoopSleeper).unwrap();
        b.iter(|| writer.write_paced(black_box(&payload)))
    });

    c.bench_function("write 1MiB in 100KiB slices", |b| {
        let mut writer = RateLimitedWriter::with_sleeper(io::sink(), PacingConfig::new(MBps), NoopSleeper).unwrap();
        b.iter(|| writer.write_paced(black_box(&payload)))
    });
}

fn bench_paced_read(c: &mut Criterion) {
    let mut buf = vec![0u8; 1 << 20];

    c.bench_function("read 1MiB in 1KiB slices", |b| {
        let mut reader = RateLimitedReader::with_sleeper(io::repeat(7), PacingConfig::new(10 * KBps), NoopSleeper).unwrap();
        b.iter(|| reader.read_paced(black_box(&mut buf)))
    });
}

fn bench_rate_parsing(c: &mut Criterion) {
    c.bench_function("parse 10 Mbps", |b| b.iter(|| black_box("10 Mbps").parse::<Rate>()));

    c.bench_function("slice budget", |b| b.iter(|| black_box(GBps).slice_budget(black_box(Duration::from_millis(100)))));
}

criterion_group!(benches, bench_paced_write, bench_paced_read, bench_rate_parsing);
criterion_main!(benches);

//! Criterion benchmarks for the escape-sequence decoder.
//!
//! The decoder runs once per byte typed, so it must stay far below the
//! latency of a single terminal read.
//!
//! Run with:
//! ```bash
//! cargo bench --package arrowkey-core --bench decoder_bench
//! ```

use arrowkey_core::decoder::decode_all;
use arrowkey_core::EscapeDecoder;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

// ── Input fixtures ────────────────────────────────────────────────────────────

fn arrows(n: usize) -> Vec<u8> {
    b"\x1b[A\x1b[B\x1b[C\x1b[D"
        .iter()
        .copied()
        .cycle()
        .take(n * 3)
        .collect()
}

fn typing(n: usize) -> Vec<u8> {
    b"the quick brown fox ".iter().copied().cycle().take(n).collect()
}

fn mixed(n: usize) -> Vec<u8> {
    b"ab\x1b[Ax\x1bO\x1b[5~\x1b[D"
        .iter()
        .copied()
        .cycle()
        .take(n)
        .collect()
}

// ── Benchmark groups ──────────────────────────────────────────────────────────

fn bench_single_sequence(c: &mut Criterion) {
    c.bench_function("feed_arrow_sequence", |b| {
        let mut decoder = EscapeDecoder::new();
        b.iter(|| {
            decoder.feed(black_box(0x1B));
            decoder.feed(black_box(b'['));
            decoder.feed(black_box(b'C'))
        })
    });
}

fn bench_streams(c: &mut Criterion) {
    let inputs: &[(&str, Vec<u8>)] = &[
        ("arrows", arrows(1_000)),
        ("typing", typing(3_000)),
        ("mixed", mixed(3_000)),
    ];

    let mut group = c.benchmark_group("decode_stream");
    for (name, bytes) in inputs {
        group.bench_with_input(BenchmarkId::new("input", name), bytes, |b, bytes| {
            b.iter(|| decode_all(black_box(bytes)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_single_sequence, bench_streams);
criterion_main!(benches);

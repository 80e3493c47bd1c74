//! Throughput benchmarks for the bounded bit I/O types and CRC-32.
//!
//! netc targets sub-microsecond per-packet latency, so these benchmarks
//! focus on small, packet-sized buffers (64 B - 4 KiB) rather than the
//! bulk-file sizes a general archiver would benchmark against.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use netc_core::bitstream::{BitReader, BitWriter};
use netc_core::crc::Crc32;
use std::hint::black_box;

fn bench_bitwriter(c: &mut Criterion) {
    let mut group = c.benchmark_group("bitwriter_pack_bytes");
    for size in [64usize, 256, 1024, 4096] {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut buf = vec![0u8; size + 8];
            b.iter(|| {
                let mut w = BitWriter::new(&mut buf);
                for i in 0..size {
                    w.write_bits(black_box(i as u32 & 0xFF), 8).unwrap();
                }
                black_box(w.flush().unwrap());
            });
        });
    }
    group.finish();
}

fn bench_bitreader(c: &mut Criterion) {
    let mut group = c.benchmark_group("bitreader_unpack_bytes");
    for size in [64usize, 256, 1024, 4096] {
        let mut buf = vec![0u8; size];
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = (i & 0xFF) as u8;
        }
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let mut r = BitReader::new(&buf);
                for _ in 0..size {
                    black_box(r.read_bits(8).unwrap());
                }
            });
        });
    }
    group.finish();
}

fn bench_crc32(c: &mut Criterion) {
    let mut group = c.benchmark_group("crc32_dictionary_sized");
    for size in [1024usize, 8192, 40972] {
        let data = vec![0x5Au8; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(Crc32::compute(&data)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_bitwriter, bench_bitreader, bench_crc32);
criterion_main!(benches);

//! Benchmarks for archive assembly and compression

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ota_archive::compression::wrap;
use ota_archive::{assemble, Entry, EntryRole, Label};

fn create_entries(firmware_size: usize) -> Vec<Entry> {
    let firmware: Vec<u8> = (0..firmware_size).map(|i| (i % 251) as u8).collect();
    vec![
        Entry::from_bytes(EntryRole::Font, Label::new("font").unwrap(), &vec![0x20; 64 * 1024])
            .unwrap(),
        Entry::from_bytes(
            EntryRole::Filesystem,
            Label::new("spiffs").unwrap(),
            &vec![0xFF; 256 * 1024],
        )
        .unwrap(),
        Entry::from_bytes(EntryRole::Firmware, Label::new("app").unwrap(), &firmware).unwrap(),
    ]
}

fn benchmark_assemble(c: &mut Criterion) {
    let mut group = c.benchmark_group("assemble");

    for size in [256 * 1024, 1024 * 1024].iter() {
        let entries = create_entries(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &entries, |b, entries| {
            b.iter(|| black_box(assemble(black_box(entries)).unwrap()));
        });
    }

    group.finish();
}

fn benchmark_entry_checksum(c: &mut Criterion) {
    let mut group = c.benchmark_group("entry_from_bytes");

    for size in [4096, 256 * 1024, 1024 * 1024].iter() {
        let data = vec![0xA5u8; *size];
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter(|| {
                Entry::from_bytes(EntryRole::Firmware, Label::new("app").unwrap(), black_box(data))
                    .unwrap()
            });
        });
    }

    group.finish();
}

fn benchmark_wrap(c: &mut Criterion) {
    let mut group = c.benchmark_group("wrap");
    group.sample_size(20);

    for size in [256 * 1024, 1024 * 1024].iter() {
        let raw = assemble(&create_entries(*size)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), &raw, |b, raw| {
            b.iter(|| black_box(wrap(black_box(raw)).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_assemble,
    benchmark_entry_checksum,
    benchmark_wrap
);
criterion_main!(benches);

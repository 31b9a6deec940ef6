use criterion::{criterion_group, criterion_main, Criterion};
use std::path::Path;

use unmht::charset::EncodingRsTranscoder;
use unmht::extract::{ExtractOptions, Extractor};

fn fixture(name: &str) -> Vec<u8> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read(path).unwrap()
}

fn bench_decode_message(c: &mut Criterion) {
    let data = fixture("related.mht");

    c.bench_function("decode_related_mht", |b| {
        b.iter(|| unmht::parser::decode_message(&data, &EncodingRsTranscoder).unwrap())
    });
}

fn bench_extract(c: &mut Criterion) {
    let related = fixture("related.mht");
    let mixed = fixture("mixed.eml");
    let extractor = Extractor::new(ExtractOptions::default());

    c.bench_function("extract_related_mht", |b| {
        b.iter(|| extractor.extract("file:///bench/related.mht", &related).unwrap())
    });
    c.bench_function("extract_mixed_eml", |b| {
        b.iter(|| extractor.extract("file:///bench/mixed.eml", &mixed).unwrap())
    });
}

criterion_group!(benches, bench_decode_message, bench_extract);
criterion_main!(benches);

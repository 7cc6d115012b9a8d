//! Benchmarks for turning a telemetry region into a catalog
//!
//! - `catalog_decode`: one value buffer decoded against a parsed schema
//! - `decoder_poll`: a full connected poll (header, tick check, decode, publish)
//!
//! Platform: Cross-platform (synthetic region, CI-safe)

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use livetiming::region::SignalMode;
use livetiming::schema::header::HEADER_SIZE;
use livetiming::schema::variables::VAR_HEADER_SIZE;
use livetiming::schema::{Header, parse_variable_schema};
use livetiming::test_utils::RegionBuilder;
use livetiming::{Catalog, DecoderConfig, TelemetryDecoder, VariableType};
use std::hint::black_box;
use std::time::Duration;

fn builder_with(extra_arrays: usize) -> RegionBuilder {
    (0..extra_arrays).fold(RegionBuilder::standings(), |builder, i| {
        builder.variable(&format!("CarIdxExtra{}", i), VariableType::Float32, 64)
    })
}

fn bench_catalog_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("catalog_decode");

    for extra in [0usize, 16, 64] {
        let fixture = builder_with(extra).build();
        let image = fixture.region().snapshot();
        let header = Header::parse(&image[..HEADER_SIZE]).unwrap();
        let table_start = header.var_header_offset as usize;
        let table = &image[table_start..table_start + header.num_vars as usize * VAR_HEADER_SIZE];
        let schema =
            parse_variable_schema(table, header.num_vars as usize, header.buf_len as usize).unwrap();
        let slot = header.latest_buffer().unwrap();
        let buffer = &image[slot.offset..slot.offset + schema.frame_size];

        group.bench_with_input(BenchmarkId::from_parameter(schema.variable_count()), &buffer, |b, buffer| {
            b.iter(|| black_box(Catalog::decode(&schema, buffer, 1, slot.tick_count).unwrap()))
        });
    }

    group.finish();
}

fn bench_decoder_poll(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
    let fixture = builder_with(16).signal_mode(SignalMode::AlwaysReady).build();
    let mut decoder = TelemetryDecoder::new(fixture.region(), DecoderConfig::default());
    runtime.block_on(decoder.poll(Duration::from_millis(1))).unwrap();

    c.bench_function("decoder_poll", |b| {
        b.iter(|| black_box(runtime.block_on(decoder.poll(Duration::from_millis(1))).unwrap()))
    });
}

criterion_group!(benches, bench_catalog_decode, bench_decoder_poll);
criterion_main!(benches);

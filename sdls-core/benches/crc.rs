//! CRC engine and TC apply-pipeline throughput benchmarks.
//!
//! Run with: `cargo bench --bench crc`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use sdls_crypto::{CrcEngine, Gvcid};
use sdls_store::{Config, InMemoryAuditSink, Key, KeyRing, KeyState, ManagedParameterTable, SadbType};

const PAYLOAD_SIZES: &[usize] = &[64, 1024, 65_536];

fn bench_crc16(c: &mut Criterion) {
    let engine = CrcEngine::new();
    let mut group = c.benchmark_group("crc16");
    for &size in PAYLOAD_SIZES {
        let data = vec![0x5Au8; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter(|| black_box(engine.crc16(black_box(data))));
        });
    }
    group.finish();
}

fn bench_crc32(c: &mut Criterion) {
    let engine = CrcEngine::new();
    let mut group = c.benchmark_group("crc32");
    for &size in PAYLOAD_SIZES {
        let data = vec![0xA5u8; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter(|| black_box(engine.crc32(black_box(data))));
        });
    }
    group.finish();
}

fn bench_tc_apply(c: &mut Criterion) {
    let config = Config::new(SadbType::InMemory, true, false, false, false, false, false, true, 0xFF);

    let mut managed = ManagedParameterTable::new();
    managed.add(0, 0x3FF, 0, true, false).unwrap();

    let gvcid = Gvcid::new(0, 0x3FF, 0, None);
    let store = sdls_store::InMemoryStore::new();
    store.create(1, gvcid).unwrap();
    store.rekey(1, 130, 130).unwrap();
    store.set_arsnw(1, 10).unwrap();
    store.set_state(1, sdls_store::SaState::Operational).unwrap();
    {
        let mut sa = store.get_by_spi(1).unwrap();
        sa.est = true;
        sa.shivf_len = 12;
        sa.shsnf_len = 2;
        sa.stmacf_len = 16;
        sa.iv = vec![0u8; 12];
        sa.arc = vec![0u8; 2];
        store.save(&sa).unwrap();
    }

    let mut keys = KeyRing::new();
    keys.insert(Key::new(130, [0x11u8; 32], KeyState::Active));

    let crypto = sdls_crypto::Aes256GcmProvider;
    let crc = CrcEngine::new();
    let audit = InMemoryAuditSink::new();

    let mut plain = vec![0u8; 5 + 16];
    plain[0] = 0x20;
    plain[1] = 0x03;
    plain[2] = 0xFF;
    plain[3] = 0x00;

    c.bench_function("tc_apply_gcm", |b| {
        b.iter(|| {
            black_box(
                sdls_core::pipeline::apply_security_tc(
                    &config,
                    &managed,
                    &store,
                    &keys,
                    &crypto,
                    &crc,
                    &audit,
                    black_box(&plain),
                    gvcid,
                )
                .unwrap(),
            )
        });
    });
}

criterion_group!(benches, bench_crc16, bench_crc32, bench_tc_apply);
criterion_main!(benches);

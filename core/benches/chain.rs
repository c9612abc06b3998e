//! Chain throughput over a 1 MB chunk, per algorithm and for a mixed chain.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use obfs_core::chain::{ChainExecutor, ObfuscationConfig, ObfuscatorSpec};
use obfs_core::codec::Algorithm;
use obfs_core::constants::MEGABYTE;

fn single(algorithm: Algorithm) -> ObfuscationConfig {
    let spec = match algorithm {
        Algorithm::Xor => ObfuscatorSpec::new(algorithm).with("key", "bench-key"),
        Algorithm::Base64 => ObfuscatorSpec::new(algorithm).with("rounds", 1),
        Algorithm::Deflate => ObfuscatorSpec::new(algorithm).with("level", 6),
        _ => ObfuscatorSpec::new(algorithm).with("key", "bench-key").with("salt", "bench-salt"),
    };
    ObfuscationConfig::new(vec![spec])
}

fn bench_algorithms(c: &mut Criterion) {
    let payload: Vec<u8> = (0..MEGABYTE).map(|i| (i % 251) as u8).collect();
    let mut group = c.benchmark_group("chain_obfuscate_1mb");
    group.throughput(Throughput::Bytes(payload.len() as u64));

    for algorithm in Algorithm::ALL {
        let Ok(chain) = ChainExecutor::compile(&single(algorithm)) else { continue };
        group.bench_with_input(BenchmarkId::from_parameter(algorithm), &payload, |b, p| {
            b.iter(|| chain.obfuscate(black_box(p)))
        });
    }
    group.finish();
}

fn bench_mixed_round_trip(c: &mut Criterion) {
    let payload = vec![0x5Au8; MEGABYTE];
    let config = ObfuscationConfig::new(vec![
        ObfuscatorSpec::new(Algorithm::Deflate),
        ObfuscatorSpec::new(Algorithm::Aes).with("key", "k").with("salt", "s"),
        ObfuscatorSpec::new(Algorithm::Xor).with("key", "x"),
    ]);
    let Ok(chain) = ChainExecutor::compile(&config) else { return };

    c.bench_function("chain_round_trip_mixed_1mb", |b| {
        b.iter(|| {
            let wire = chain.obfuscate(black_box(&payload)).ok()?;
            chain.deobfuscate(&wire).ok()
        })
    });
}

criterion_group!(benches, bench_algorithms, bench_mixed_round_trip);
criterion_main!(benches);

//! Token codec benchmarks.
//!
//! Run with: cargo bench -p taskgate-auth

use chrono::{Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use taskgate_auth::{Keyring, PrincipalId, SigningKey, TokenCodec};

fn bench_token_codec(c: &mut Criterion) {
    let codec = TokenCodec::new(Keyring::new(SigningKey::new("bench", "bench-secret-0123456789abcdef")));
    let now = Utc::now();
    let issued = codec
        .issue(PrincipalId::new(), Duration::hours(1), now)
        .expect("issue");

    let mut tampered = issued.token.clone();
    tampered.push('x');

    let mut group = c.benchmark_group("token_codec");

    group.bench_function("issue", |b| {
        b.iter(|| {
            codec
                .issue(black_box(PrincipalId::new()), Duration::hours(1), now)
                .expect("issue")
        })
    });

    group.bench_function("verify_valid", |b| {
        b.iter(|| codec.verify(black_box(&issued.token), now))
    });

    group.bench_function("verify_tampered", |b| {
        b.iter(|| codec.verify(black_box(&tampered), now))
    });

    group.finish();
}

criterion_group!(benches, bench_token_codec);
criterion_main!(benches);

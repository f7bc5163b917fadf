use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::Rng;
use tk_core::ExpiresAt;

fn bench_expiry_parse(c: &mut Criterion) {
    let mut rng = rand::thread_rng();
    let millis: Vec<String> = (0..1000)
        .map(|_| rng.gen_range(1_600_000_000_000i64..1_900_000_000_000).to_string())
        .collect();
    let rfc3339: Vec<String> = millis
        .iter()
        .map(|m| {
            let e: ExpiresAt = m.parse().unwrap();
            e.to_datetime().unwrap().to_rfc3339()
        })
        .collect();

    c.bench_function("expiry_parse_millis_1000", |b| {
        b.iter(|| {
            for s in &millis {
                black_box(s.parse::<ExpiresAt>().unwrap());
            }
        })
    });

    c.bench_function("expiry_parse_rfc3339_1000", |b| {
        b.iter(|| {
            for s in &rfc3339 {
                black_box(s.parse::<ExpiresAt>().unwrap());
            }
        })
    });
}

criterion_group!(benches, bench_expiry_parse);
criterion_main!(benches);

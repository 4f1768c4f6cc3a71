use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kube_usage_monitor::parsing::{normalize_cpu, normalize_memory};

fn cpu_parsing_benchmark(c: &mut Criterion) {
    let test_values = vec![
        "100m",
        "1",
        "2",
        "1000000000n",
        "48213n",
        "500m",
        "1500m",
    ];

    c.bench_function("normalize_cpu", |b| {
        b.iter(|| {
            for value in &test_values {
                let _ = black_box(normalize_cpu(black_box(value)));
            }
        })
    });
}

fn memory_parsing_benchmark(c: &mut Criterion) {
    let test_values = vec![
        "1Ki",
        "1Mi",
        "1Gi",
        "131072",
        "512Mi",
        "24576Ki",
        "2Gi",
    ];

    c.bench_function("normalize_memory", |b| {
        b.iter(|| {
            for value in &test_values {
                let _ = black_box(normalize_memory(black_box(value)));
            }
        })
    });
}

criterion_group!(benches, cpu_parsing_benchmark, memory_parsing_benchmark);
criterion_main!(benches);

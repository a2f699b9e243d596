use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use graphcat::catalog::{CatalogStore, FilterSpec, Metric, NewGraph, RangeFilter};
use graphcat::export::ArchiveExporter;
use graphcat::sampling::{SamplingEngine, SamplingMethod, SamplingRequest};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn catalog(size: u64) -> CatalogStore {
    let mut rng = StdRng::seed_from_u64(42);
    let mut store = CatalogStore::new();
    for i in 0..size {
        let nodes = rng.gen_range(5..2000u64);
        let graph = NewGraph::new(format!("graph_{}.graphml", i))
            .with_metric(Metric::NumNodes, nodes)
            .with_metric(Metric::NumEdges, nodes * rng.gen_range(1..6u64))
            .with_metric(Metric::MaxDegree, rng.gen_range(1..40u64))
            .with_metric(Metric::ChromNum, rng.gen_range(2..9u64))
            .with_metric(Metric::CliNum, rng.gen_range(2..7u64))
            .with_metric(Metric::VertexCover, nodes / 2)
            .planar(rng.gen_bool(0.4));
        let _ = store.insert(graph, Some(vec![b'x'; 256]));
    }
    store
}

/// Sampling latency per strategy
fn bench_sampling(c: &mut Criterion) {
    let mut group = c.benchmark_group("sampling");
    group.sample_size(20);

    for size in [1_000u64, 10_000].iter() {
        let store = catalog(*size);
        let candidates = store.all().to_vec();

        for method in SamplingMethod::ALL {
            let id = BenchmarkId::new(method.as_str(), size);
            group.bench_with_input(id, &candidates, |b, candidates| {
                let engine = SamplingEngine::default();
                b.iter(|| {
                    let request = SamplingRequest::new(candidates.clone(), 100, method).with_seed(7);
                    criterion::black_box(engine.select(request).len());
                });
            });
        }
    }
    group.finish();
}

/// Filter evaluation over the whole catalog
fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter");

    for size in [1_000u64, 10_000].iter() {
        let store = catalog(*size);
        let query = FilterSpec::new()
            .with_file_name("graph_1")
            .with_range(Metric::NumNodes, RangeFilter::between(100.0, 1500.0))
            .compile()
            .unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| criterion::black_box(store.count(&query)));
        });
    }
    group.finish();
}

/// Zip export of 100 graph files
fn bench_export(c: &mut Criterion) {
    let store = catalog(100);
    c.bench_function("export_100", |b| {
        b.iter(|| criterion::black_box(ArchiveExporter::new().to_bytes(store.all()).unwrap().0.len()));
    });
}

criterion_group!(benches, bench_sampling, bench_filter, bench_export);
criterion_main!(benches);

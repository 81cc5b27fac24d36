use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use layered_props::converter::IntConverter;
use layered_props::registry::Registry;
use layered_props::source::MapSource;
use std::sync::Arc;
use std::thread;

const NUM_KEYS: usize = 10_000;
const NUM_LAYERS: usize = 4;

// ========== 辅助函数 ==========

fn generate_key(i: usize) -> String {
    format!("key_{:06}", i)
}

/// 每层定义 1/(layer+1) 的 key，越低的层定义越多
fn build_registry(num_layers: usize) -> (Arc<Registry>, Vec<Arc<MapSource>>) {
    let registry = Arc::new(Registry::default());
    let mut sources = Vec::new();
    for layer in 0..num_layers {
        let source = Arc::new(MapSource::with_values(
            &format!("layer_{}", layer),
            (0..NUM_KEYS)
                .filter(|i| i % (num_layers - layer) == 0)
                .map(|i| (generate_key(i), i.to_string())),
        ));
        registry.register(source.clone(), layer as i32).unwrap();
        sources.push(source);
    }
    (registry, sources)
}

// ========== 1. 缓存命中 ==========

fn benchmark_cached_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("cached_resolve");

    for num_layers in [1, NUM_LAYERS] {
        let (registry, _) = build_registry(num_layers);
        for i in 0..NUM_KEYS {
            registry.resolve(&generate_key(i));
        }
        let keys: Vec<String> = (0..NUM_KEYS).map(generate_key).collect();

        group.bench_with_input(BenchmarkId::from_parameter(num_layers), &keys, |b, keys| {
            b.iter(|| {
                for key in keys {
                    black_box(registry.resolve(key));
                }
            })
        });
    }

    group.finish();
}

// ========== 2. 缓存未命中 ==========

fn benchmark_uncached_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("uncached_resolve");

    for num_layers in [1, NUM_LAYERS] {
        let (registry, _) = build_registry(num_layers);
        let keys: Vec<String> = (0..NUM_KEYS).map(generate_key).collect();

        group.bench_with_input(BenchmarkId::from_parameter(num_layers), &keys, |b, keys| {
            b.iter(|| {
                registry.invalidate(None);
                for key in keys {
                    black_box(registry.resolve(key));
                }
            })
        });
    }

    group.finish();
}

// ========== 3. 属性句柄 ==========

fn benchmark_handle_get(c: &mut Criterion) {
    let (registry, _) = build_registry(NUM_LAYERS);
    let handle = registry
        .bind(&generate_key(0), IntConverter::<u64>::new(), 0)
        .unwrap();

    c.bench_function("handle_get", |b| {
        b.iter(|| black_box(handle.get().unwrap()))
    });
}

// ========== 4. 刷新 ==========

fn benchmark_refresh(c: &mut Criterion) {
    let mut group = c.benchmark_group("refresh");

    for changed in [0, 100, 1_000] {
        let (registry, sources) = build_registry(NUM_LAYERS);
        for i in 0..NUM_KEYS {
            registry.resolve(&generate_key(i));
        }
        let top = sources[NUM_LAYERS - 1].clone();

        group.bench_with_input(BenchmarkId::from_parameter(changed), &changed, |b, &changed| {
            let mut round = 0usize;
            b.iter(|| {
                round += 1;
                top.extend((0..changed).map(|i| (generate_key(i), format!("{}", round))));
                black_box(registry.refresh())
            })
        });
    }

    group.finish();
}

// ========== 5. 多线程读取 ==========

fn benchmark_concurrent_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_resolve");
    let num_threads = thread::available_parallelism().map(|n| n.get()).unwrap_or(4);

    let (registry, _) = build_registry(NUM_LAYERS);
    let keys: Vec<String> = (0..NUM_KEYS).map(generate_key).collect();
    for key in &keys {
        registry.resolve(key);
    }

    group.bench_with_input(
        BenchmarkId::from_parameter(num_threads),
        &num_threads,
        |b, &num_threads| {
            b.iter(|| {
                thread::scope(|scope| {
                    for t in 0..num_threads {
                        let registry = &registry;
                        let keys = &keys;
                        scope.spawn(move || {
                            for key in keys.iter().skip(t).step_by(num_threads) {
                                black_box(registry.resolve(key));
                            }
                        });
                    }
                });
            })
        },
    );

    group.finish();
}

criterion_group!(
    benches,
    benchmark_cached_resolve,
    benchmark_uncached_resolve,
    benchmark_handle_get,
    benchmark_refresh,
    benchmark_concurrent_resolve
);
criterion_main!(benches);

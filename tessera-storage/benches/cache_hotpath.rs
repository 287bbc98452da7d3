use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use tessera_core::{CacheConfig, NamespacePolicy, TesseraError};
use tessera_storage::{CacheRequest, TenantCache, TenantScopedKey};

fn bench_key_build(c: &mut Criterion) {
    c.bench_function("key/encode_org_scoped", |b| {
        b.iter(|| {
            let key = TenantScopedKey::new(
                black_box("acme"),
                black_box(Some("org1")),
                black_box("sessions"),
                black_box("42"),
            )
            .expect("build key");
            black_box(key.encode());
        });
    });

    c.bench_function("key/decode_scope", |b| {
        b.iter(|| {
            let scope = TenantScopedKey::decode_scope(black_box("tenant:acme:org:org1:sessions:42"))
                .expect("decode key");
            black_box(scope);
        });
    });
}

fn bench_get_or_set_hit(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let config = CacheConfig::new()
        .with_namespace("sessions", NamespacePolicy::new().with_ttl_secs(86_400));
    let cache = TenantCache::in_memory(Arc::new(config));
    let request = CacheRequest::new("acme", "sessions", "42").with_org("org1");

    runtime
        .block_on(cache.set_scoped(&request, &"cached".to_string()))
        .expect("seed cache");

    c.bench_function("cache/get_or_set_hit", |b| {
        b.to_async(&runtime).iter(|| async {
            let value: Option<String> = cache
                .get_or_set(&request, || async {
                    Ok::<_, TesseraError>(Some("fetched".to_string()))
                })
                .await
                .expect("get_or_set");
            black_box(value);
        });
    });
}

criterion_group!(benches, bench_key_build, bench_get_or_set_hit);
criterion_main!(benches);

//! Event store benchmarks
//!
//! Insert throughput at different capacities, and the cost of computing
//! statistics over a full store.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use spyglass_core::{EntryDraft, EventStore, RequestDetail, ResponseDetail};

fn request_draft(i: usize) -> EntryDraft {
    EntryDraft::Request {
        request: RequestDetail {
            method: if i % 3 == 0 { "POST" } else { "GET" }.to_string(),
            url: format!("/users/{}", i),
            path: format!("/users/{}", i),
            query: None,
            params: Default::default(),
            headers: None,
            cookies: Default::default(),
            body: None,
            ip: Some(format!("10.0.{}.{}", i % 7, i % 251)),
            user_agent: Some(format!("agent/{}", i % 5)),
            referer: None,
            origin: None,
            hostname: "localhost".to_string(),
            protocol: "http".to_string(),
            timestamp: 0,
        },
        response: ResponseDetail {
            status_code: if i % 10 == 0 { 500 } else { 200 },
            status_message: "OK".to_string(),
            headers: None,
            body: None,
            response_time: (i % 300) as u64,
        },
    }
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_insert");

    for capacity in [100, 1_000, 10_000] {
        group.bench_with_input(
            BenchmarkId::new("capacity", capacity),
            &capacity,
            |b, &capacity| {
                let store = EventStore::new(capacity);
                for i in 0..capacity {
                    store.insert(request_draft(i));
                }
                let mut i = 0;
                b.iter(|| {
                    i += 1;
                    black_box(store.insert(request_draft(i)))
                });
            },
        );
    }

    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_queries");

    let store = EventStore::new(1_000);
    let mut last_id = String::new();
    for i in 0..1_000 {
        last_id = store.insert(request_draft(i)).id;
    }
    let oldest = store.list().pop();
    let first_id = oldest.map(|e| e.id).unwrap_or_default();

    group.bench_function("stats", |b| b.iter(|| black_box(store.stats())));
    group.bench_function("list", |b| b.iter(|| black_box(store.list())));
    group.bench_function("get_newest", |b| b.iter(|| black_box(store.get(&last_id))));
    group.bench_function("get_oldest", |b| b.iter(|| black_box(store.get(&first_id))));

    group.finish();
}

criterion_group!(benches, bench_insert, bench_queries);
criterion_main!(benches);

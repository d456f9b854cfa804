//! Capture path benchmarks
//!
//! Measures extraction and redaction overhead per recorded request.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;
use spyglass_core::{CaptureCoordinator, DetailExtractor, RawRequest, RawResponse, SpyglassConfig};

const LOGIN_BODY: &str = r#"{"username":"ada","password":"hunter2","remember":true}"#;

fn sample_request() -> RawRequest {
    RawRequest::new("POST", "/api/login?redirect=%2Fhome")
        .with_path("/api/login")
        .with_query("redirect", "/home")
        .with_header("host", "localhost:3000")
        .with_header("user-agent", "Mozilla/5.0")
        .with_header("authorization", "Bearer abc.def.ghi")
        .with_header("content-type", "application/json")
        .with_cookie("sid", "s3ss10n")
        .with_body(json!(LOGIN_BODY))
        .with_remote_addr("10.0.0.5")
}

fn bench_extract(c: &mut Criterion) {
    let extractor = DetailExtractor::default();
    let request = sample_request();
    let response = RawResponse::new(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"token": "t", "user": {"id": 1}}));

    c.bench_function("extract_request_detail", |b| {
        b.iter(|| black_box(extractor.extract_request_detail(&request)))
    });
    c.bench_function("extract_response_detail", |b| {
        b.iter(|| {
            let detail = extractor.extract_response_detail(&response, 12);
            black_box(detail)
        })
    });
}

fn bench_record(c: &mut Criterion) {
    let coordinator = CaptureCoordinator::new(SpyglassConfig::new().max_entries(1_000));
    let request = sample_request();
    let response = RawResponse::new(201);

    c.bench_function("record_completed_request", |b| {
        b.iter(|| {
            let started = coordinator.begin_request();
            let entry = coordinator.record_completed_request(&request, &response, started);
            black_box(entry)
        })
    });

    let skipped = RawRequest::new("GET", "/favicon.ico");
    c.bench_function("record_skipped_request", |b| {
        b.iter(|| {
            let started = coordinator.begin_request();
            let entry = coordinator.record_completed_request(&skipped, &response, started);
            black_box(entry)
        })
    });
}

criterion_group!(benches, bench_extract, bench_record);
criterion_main!(benches);

use proptest::prelude::*;
use serde_json::json;
use spyglass_core::{
    CaptureCoordinator, EntryKind, ErrorValue, EventStore, HttpError, LegacyEntry, RawRequest,
    RawResponse, SpyglassConfig, StartToken,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[test]
fn test_end_to_end_request_lookup() {
    let coordinator = CaptureCoordinator::new(SpyglassConfig::new());

    let started = StartToken::at(Instant::now() - Duration::from_millis(37));
    let request = RawRequest::new("GET", "/users/42")
        .with_path("/users/42")
        .with_param("id", "42")
        .with_remote_addr("10.0.0.5");
    let response = RawResponse::new(200).with_body(json!({"id": 42, "name": "Ada"}));

    let entry = coordinator
        .record_completed_request(&request, &response, started)
        .unwrap();

    let found = coordinator.store().get(&entry.id).unwrap();
    assert_eq!(found.kind, EntryKind::Request);

    let response = found.response.as_ref().unwrap();
    assert_eq!(response.status_code, 200);
    // the token is backdated; allow for scheduling delay on slow machines
    assert!((37..1_000).contains(&response.response_time));

    let request = found.request.as_ref().unwrap();
    assert_eq!(request.ip.as_deref(), Some("10.0.0.5"));
    assert_eq!(request.params.get("id"), Some(&"42".to_string()));
}

#[test]
fn test_stats_over_mixed_entries() {
    let coordinator = CaptureCoordinator::new(SpyglassConfig::new());
    let now = Instant::now();

    for (ip, ms) in [("1.1.1.1", 100), ("2.2.2.2", 200), ("1.1.1.1", 300)] {
        let request = RawRequest::new("GET", "/items")
            .with_remote_addr(ip)
            .with_header("user-agent", "agent");
        let entry = coordinator.record_completed_request(
            &request,
            &RawResponse::new(200),
            StartToken::at(now - Duration::from_millis(ms)),
        );
        assert!(entry.is_some());
    }
    coordinator.record_exception(None, &ErrorValue::new("Error", "first"));
    coordinator.record_exception(None, &HttpError::internal("second"));

    let stats = coordinator.store().stats();
    assert_eq!(stats.total, 5);
    assert_eq!(stats.requests, 3);
    assert_eq!(stats.exceptions, 2);
    // response times are measured, so they can only grow past the backdated start
    assert!(stats.average_response_time >= 200);
    assert_eq!(stats.unique_ips, 2);
    assert_eq!(stats.unique_user_agents, 1);
}

#[test]
fn test_noise_path_does_not_affect_stats() {
    let coordinator = CaptureCoordinator::new(SpyglassConfig::new());
    let recorded = coordinator.record_completed_request(
        &RawRequest::new("GET", "/favicon.ico"),
        &RawResponse::new(200),
        coordinator.begin_request(),
    );

    assert!(recorded.is_none());
    assert_eq!(coordinator.store().stats().total, 0);
}

#[test]
fn test_custom_skip_path() {
    let coordinator = CaptureCoordinator::new(SpyglassConfig::new().skip_path("/health"));
    assert!(!coordinator.should_capture("/health/live"));
    assert!(coordinator.should_capture("/users"));
}

#[test]
fn test_capacity_from_config() {
    let coordinator = CaptureCoordinator::new(SpyglassConfig::new().max_entries(2));
    for i in 0..5 {
        coordinator.record_exception(None, &ErrorValue::new("Error", i.to_string()));
    }

    let entries = coordinator.store().list();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].exception.as_ref().unwrap().message, "4");
    assert_eq!(entries[1].exception.as_ref().unwrap().message, "3");
}

#[test]
fn test_legacy_view_of_captured_request() {
    let coordinator = CaptureCoordinator::new(SpyglassConfig::new());
    let entry = coordinator
        .record_completed_request(
            &RawRequest::new("DELETE", "/users/7"),
            &RawResponse::new(204).with_status_message("No Content"),
            coordinator.begin_request(),
        )
        .unwrap();

    let json = serde_json::to_value(LegacyEntry::from(entry)).unwrap();
    assert_eq!(json["method"], "DELETE");
    assert_eq!(json["status"], 204);
    assert_eq!(json["response"]["statusMessage"], "No Content");
}

#[test]
fn test_concurrent_capture_distinct_ids() {
    let coordinator = CaptureCoordinator::new(SpyglassConfig::new().max_entries(1_000));

    let handles: Vec<_> = (0..16)
        .map(|t| {
            let coordinator = coordinator.clone();
            std::thread::spawn(move || {
                (0..25)
                    .filter_map(|i| {
                        coordinator.record_completed_request(
                            &RawRequest::new("GET", format!("/t/{}/{}", t, i)),
                            &RawResponse::new(200),
                            coordinator.begin_request(),
                        )
                    })
                    .map(|entry| entry.id)
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let ids: Vec<String> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    let unique: HashSet<&String> = ids.iter().collect();

    assert_eq!(ids.len(), 400);
    assert_eq!(unique.len(), 400);
    assert_eq!(coordinator.store().len(), 400);
}

#[tokio::test]
async fn test_auto_clear_sweeps_old_entries() {
    let store = Arc::new(EventStore::new(10));
    let coordinator = CaptureCoordinator::with_store(
        SpyglassConfig::new().auto_clear_after(Some(Duration::from_millis(20))),
        store.clone(),
    );
    coordinator.record_exception(None, &ErrorValue::new("Error", "stale"));

    let handle = coordinator.spawn_auto_clear().unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert!(store.is_empty());
    drop(handle);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_eviction_makes_oldest_unreachable(capacity in 1usize..16) {
        let coordinator = CaptureCoordinator::new(SpyglassConfig::new().max_entries(capacity));
        let ids: Vec<String> = (0..=capacity)
            .filter_map(|i| {
                let error = ErrorValue::new("Error", i.to_string());
                coordinator.record_exception(None, &error)
            })
            .map(|e| e.id)
            .collect();

        prop_assert_eq!(coordinator.store().len(), capacity);
        prop_assert!(coordinator.store().get(&ids[0]).is_none());
        for id in &ids[1..] {
            prop_assert!(coordinator.store().get(id).is_some());
        }
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tests for change detection and fingerprinting.

use serde_json::json;
use zwift_poller::detect::ChangeDetector;
use zwift_poller::models::Stream;

fn detector() -> ChangeDetector {
    ChangeDetector::new(vec!["world_time".to_string(), "road_time".to_string()])
}

#[test]
fn test_diff_same_payload_twice_yields_none() {
    let detector = detector();
    let payload = json!({"weight": 75000, "ftp": 250});

    let event = detector
        .diff(Stream::Profile, &payload, None)
        .expect("First diff with no prior fingerprint is a change");

    let second = detector.diff(Stream::Profile, &payload, Some(&event.fingerprint));
    assert!(second.is_none());
}

#[test]
fn test_volatile_field_change_yields_none() {
    let detector = detector();
    let first = json!({"power": 200, "world_time": 1000});
    let second = json!({"power": 200, "world_time": 2000});

    let event = detector.diff(Stream::World, &first, None).unwrap();
    assert!(detector
        .diff(Stream::World, &second, Some(&event.fingerprint))
        .is_none());
}

#[test]
fn test_fingerprint_independent_of_field_order() {
    let detector = detector();
    let a: serde_json::Value =
        serde_json::from_str(r#"{"power": 200, "heartrate": 150, "cadence": 90}"#).unwrap();
    let b: serde_json::Value =
        serde_json::from_str(r#"{"cadence": 90, "heartrate": 150, "power": 200}"#).unwrap();

    assert_eq!(detector.fingerprint(&a), detector.fingerprint(&b));
}

#[test]
fn test_real_change_yields_event() {
    let detector = detector();
    let before = json!({"weight": 75000, "ftp": 250});
    let after = json!({"weight": 74500, "ftp": 250});

    let first = detector.diff(Stream::Profile, &before, None).unwrap();
    let event = detector
        .diff(Stream::Profile, &after, Some(&first.fingerprint))
        .expect("Weight change must be detected");

    assert_eq!(event.stream.event_type(), "profile_update");
    assert_eq!(event.payload, after);
    assert_ne!(event.fingerprint, first.fingerprint);
}

#[test]
fn test_nested_ignore_path() {
    let detector = ChangeDetector::new(vec!["map.synced_at".to_string()]);
    let first = json!({"map": {"synced_at": 1, "route": "watopia"}});
    let second = json!({"map": {"synced_at": 2, "route": "watopia"}});

    assert_eq!(detector.fingerprint(&first), detector.fingerprint(&second));
}

#[test]
fn test_array_payloads_diff() {
    let detector = detector();
    let first = json!([{"id": 1, "name": "Morning Ride"}]);
    let second = json!([{"id": 2, "name": "Evening Ride"}, {"id": 1, "name": "Morning Ride"}]);

    let event = detector.diff(Stream::Activities, &first, None).unwrap();
    assert!(detector
        .diff(Stream::Activities, &second, Some(&event.fingerprint))
        .is_some());
}

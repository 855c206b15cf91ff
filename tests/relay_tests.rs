// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tests for relay host discovery and failover.

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zwift_poller::error::AppError;
use zwift_poller::services::RelayResolver;

const PROBE_PATH: &str = "/api/profiles/42";

async fn mock_probe(server: &MockServer, status: u16) {
    Mock::given(method("GET"))
        .and(path(PROBE_PATH))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_failover_converges_and_sticks() {
    let bad1 = MockServer::start().await;
    let bad2 = MockServer::start().await;
    let good = MockServer::start().await;
    mock_probe(&bad1, 500).await;
    mock_probe(&bad2, 503).await;
    mock_probe(&good, 200).await;

    let resolver = RelayResolver::new(
        vec![bad1.uri(), bad2.uri(), good.uri()],
        PROBE_PATH.to_string(),
        3,
    );

    let host = resolver.active_host("token").await.unwrap();
    assert_eq!(host, good.uri());

    // Subsequent calls reuse the promoted host without re-probing 1-2.
    let host = resolver.active_host("token").await.unwrap();
    assert_eq!(host, good.uri());
    assert_eq!(bad1.received_requests().await.unwrap().len(), 1);
    assert_eq!(bad2.received_requests().await.unwrap().len(), 1);
    assert_eq!(good.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_no_relay_available() {
    let bad = MockServer::start().await;
    mock_probe(&bad, 500).await;

    let resolver = RelayResolver::new(vec![bad.uri()], PROBE_PATH.to_string(), 3);
    let err = resolver.active_host("token").await.unwrap_err();
    assert!(matches!(err, AppError::NoRelayAvailable));
}

#[tokio::test]
async fn test_failure_threshold_triggers_reprobe() {
    let server = MockServer::start().await;
    mock_probe(&server, 200).await;

    let resolver = RelayResolver::new(vec![server.uri()], PROBE_PATH.to_string(), 3);

    resolver.active_host("token").await.unwrap();
    assert_eq!(server.received_requests().await.unwrap().len(), 1);

    // Below the threshold the host stays promoted.
    resolver.record_failure().await;
    resolver.record_failure().await;
    resolver.active_host("token").await.unwrap();
    assert_eq!(server.received_requests().await.unwrap().len(), 1);

    // Crossing it forces a probe on the next resolution.
    resolver.record_failure().await;
    resolver.active_host("token").await.unwrap();
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_success_resets_failure_count() {
    let server = MockServer::start().await;
    mock_probe(&server, 200).await;

    let resolver = RelayResolver::new(vec![server.uri()], PROBE_PATH.to_string(), 3);
    resolver.active_host("token").await.unwrap();

    resolver.record_failure().await;
    resolver.record_failure().await;
    resolver.record_success().await;
    resolver.record_failure().await;
    resolver.record_failure().await;

    // Still under the threshold, so no re-probe.
    resolver.active_host("token").await.unwrap();
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for integration tests.

use chrono::{Duration as ChronoDuration, Utc};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use wiremock::MockServer;
use zwift_poller::config::Config;
use zwift_poller::models::Credential;
use zwift_poller::services::{AuthManager, RelayResolver, ZwiftClient};
use zwift_poller::store::TokenStore;

/// Player ID used across tests.
pub const PLAYER_ID: u64 = 42;

/// Token endpoint response body.
#[allow(dead_code)]
pub fn token_body(access_token: &str, refresh_token: &str) -> Value {
    json!({
        "access_token": access_token,
        "refresh_token": refresh_token,
        "expires_in": 3600,
        "refresh_expires_in": 86400,
    })
}

/// A credential with the given seconds-from-now expiries.
#[allow(dead_code)]
pub fn credential(access: &str, refresh: &str, access_secs: i64, refresh_secs: i64) -> Credential {
    Credential {
        access_token: access.to_string(),
        refresh_token: refresh.to_string(),
        access_expiry: Utc::now() + ChronoDuration::seconds(access_secs),
        refresh_expiry: Utc::now() + ChronoDuration::seconds(refresh_secs),
    }
}

/// An auth manager pointed at a mock token endpoint.
#[allow(dead_code)]
pub fn auth_manager(server: &MockServer, token_file: PathBuf) -> AuthManager {
    AuthManager::new(
        format!("{}/auth", server.uri()),
        "rider@example.com".to_string(),
        "hunter2".to_string(),
        Duration::from_secs(60),
        TokenStore::new(token_file),
    )
}

/// Config with every endpoint pointed at one mock server.
#[allow(dead_code)]
pub fn test_config(server: &MockServer, token_file: PathBuf) -> Config {
    Config {
        player_id: PLAYER_ID,
        hub_url: server.uri(),
        webhook_id: "test_hook".to_string(),
        auth_url: format!("{}/auth", server.uri()),
        relay_hosts: vec![server.uri()],
        token_file,
        world_active_interval: Duration::from_secs(30),
        world_idle_interval: Duration::from_secs(60),
        ..Config::default()
    }
}

/// A Zwift API client wired against a test config.
#[allow(dead_code)]
pub fn api_client(config: &Config) -> Arc<ZwiftClient> {
    let auth = Arc::new(AuthManager::new(
        config.auth_url.clone(),
        config.username.clone(),
        config.password.clone(),
        config.token_refresh_margin,
        TokenStore::new(config.token_file.clone()),
    ));
    let relay = Arc::new(RelayResolver::new(
        config.relay_hosts.clone(),
        ZwiftClient::probe_path(config.player_id),
        config.relay_failure_threshold,
    ));
    Arc::new(ZwiftClient::new(auth, relay, config.player_id))
}

/// Count requests the server has seen for a given path.
#[allow(dead_code)]
pub async fn requests_for_path(server: &MockServer, path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == path)
        .count()
}

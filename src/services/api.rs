// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Thin authenticated request layer over the Zwift relay API.
//!
//! Every fetch resolves a token through [`AuthManager`] and a host
//! through [`RelayResolver`]. A 401 invalidates the cached token and
//! retries once after a forced re-auth; transport and 5xx failures feed
//! the resolver's failure count and surface as [`AppError::Api`] without
//! any retry here. Retry is the scheduler's job, one tick later.

use crate::error::{AppError, Result};
use crate::models::Stream;
use crate::services::auth::AuthManager;
use crate::services::relay::RelayResolver;
use serde_json::Value;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Request timeout for profile and activities fetches.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Request timeout for world/live fetches. Live data goes stale fast;
/// a slow answer is as useless as none.
const WORLD_TIMEOUT: Duration = Duration::from_secs(10);

/// How many recent activities to pull per poll.
const ACTIVITIES_LIMIT: u32 = 10;

/// User agent the world relay endpoint expects.
const WORLD_USER_AGENT: &str = "ZwiftMobileLink/5.0 (HA)";

/// Authenticated Zwift API client used by the poll lanes.
pub struct ZwiftClient {
    http: reqwest::Client,
    auth: Arc<AuthManager>,
    relay: Arc<RelayResolver>,
    player_id: u64,
    /// World the player was last seen in; updated by the scheduler from
    /// profile payloads.
    world_id: AtomicI64,
}

impl ZwiftClient {
    /// Create a client for the given player.
    pub fn new(auth: Arc<AuthManager>, relay: Arc<RelayResolver>, player_id: u64) -> Self {
        Self {
            http: reqwest::Client::new(),
            auth,
            relay,
            player_id,
            world_id: AtomicI64::new(1),
        }
    }

    /// Point world fetches at a different world.
    pub fn set_world_id(&self, world_id: i64) {
        self.world_id.store(world_id, Ordering::Relaxed);
    }

    /// Probe path used by the relay resolver: the cheapest
    /// authenticated request this API offers.
    pub fn probe_path(player_id: u64) -> String {
        format!("/api/profiles/{}", player_id)
    }

    /// Fetch the current payload for a stream.
    pub async fn fetch(&self, stream: Stream) -> Result<Value> {
        let credential = self.auth.ensure_valid_token().await?;
        let host = self.relay.active_host(&credential.access_token).await?;
        let url = format!("{}{}", host, self.stream_path(stream));
        let timeout = match stream {
            Stream::World => WORLD_TIMEOUT,
            _ => FETCH_TIMEOUT,
        };

        match self.get(&url, &credential.access_token, stream, timeout).await {
            Ok(payload) => {
                self.relay.record_success().await;
                Ok(payload)
            }
            Err(e) if e.is_token_error() => {
                // Token rejected upstream: force a refresh and retry once.
                tracing::debug!(stream = %stream, "Got 401, forcing token refresh");
                self.auth.invalidate().await;
                let credential = self.auth.ensure_valid_token().await?;
                let payload = self
                    .get(&url, &credential.access_token, stream, timeout)
                    .await?;
                self.relay.record_success().await;
                Ok(payload)
            }
            Err(e) => {
                self.relay.record_failure().await;
                Err(e)
            }
        }
    }

    /// Request path for a stream.
    fn stream_path(&self, stream: Stream) -> String {
        match stream {
            Stream::Profile => format!("/api/profiles/{}", self.player_id),
            Stream::Activities => format!(
                "/api/profiles/{}/activities?start=0&limit={}",
                self.player_id, ACTIVITIES_LIMIT
            ),
            Stream::World => format!(
                "/relay/worlds/{}/players/{}",
                self.world_id.load(Ordering::Relaxed),
                self.player_id
            ),
        }
    }

    /// Single authenticated GET with JSON response.
    async fn get(
        &self,
        url: &str,
        access_token: &str,
        stream: Stream,
        timeout: Duration,
    ) -> Result<Value> {
        let mut request = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .timeout(timeout);

        if stream == Stream::World {
            request = request.header("User-Agent", WORLD_USER_AGENT);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Api(format!("{} fetch failed: {}", stream, e)))?;

        if response.status().as_u16() == 401 {
            return Err(AppError::Api(AppError::API_TOKEN_ERROR.to_string()));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Api(format!(
                "{} fetch returned HTTP {}: {}",
                stream, status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Api(format!("{} JSON parse error: {}", stream, e)))
    }
}

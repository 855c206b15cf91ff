// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Relay host discovery and failover.
//!
//! Zwift serves the same data from several interchangeable relay hosts,
//! not all of which answer at any given moment. The resolver probes the
//! configured candidates in priority order, promotes the first one that
//! responds, and sticks with it until its consecutive-failure count
//! crosses the configured threshold, at which point it is demoted and
//! the next request triggers a fresh probe.

use crate::error::{AppError, Result};
use crate::models::RelayHost;
use chrono::Utc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Probe request timeout. Probes are meant to be cheap; a host that
/// cannot answer a profile GET in this window is not worth promoting.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Tracks which relay host is currently authoritative.
pub struct RelayResolver {
    http: reqwest::Client,
    /// Candidate base URLs, in priority order.
    candidates: Vec<String>,
    /// Lightweight authenticated path used for probing.
    probe_path: String,
    failure_threshold: u32,
    active: Mutex<Option<RelayHost>>,
}

impl RelayResolver {
    /// Create a resolver over the given candidates. Entries without a
    /// scheme are assumed to be https hosts.
    pub fn new(candidates: Vec<String>, probe_path: String, failure_threshold: u32) -> Self {
        let candidates = candidates
            .into_iter()
            .map(|host| {
                if host.contains("://") {
                    host
                } else {
                    format!("https://{}", host)
                }
            })
            .collect();

        Self {
            http: reqwest::Client::new(),
            candidates,
            probe_path,
            failure_threshold,
            active: Mutex::new(None),
        }
    }

    /// Return the base URL of a currently responsive relay host,
    /// probing candidates if none is promoted.
    pub async fn active_host(&self, access_token: &str) -> Result<String> {
        let mut guard = self.active.lock().await;

        if let Some(host) = guard.as_ref() {
            if host.consecutive_failures < self.failure_threshold {
                return Ok(host.address.clone());
            }
        }

        for candidate in &self.candidates {
            if self.probe(candidate, access_token).await {
                tracing::info!(host = %candidate, "Promoted relay host");
                *guard = Some(RelayHost::promoted(candidate.clone()));
                return Ok(candidate.clone());
            }
        }

        tracing::warn!("No relay host responded to probes");
        *guard = None;
        Err(AppError::NoRelayAvailable)
    }

    /// Probe one candidate with a short-timeout authenticated request.
    async fn probe(&self, base_url: &str, access_token: &str) -> bool {
        let url = format!("{}{}", base_url, self.probe_path);
        match self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::debug!(host = %base_url, status = %response.status(), "Probe rejected");
                false
            }
            Err(e) => {
                tracing::debug!(host = %base_url, error = %e, "Probe failed");
                false
            }
        }
    }

    /// Record a failed live request against the active host. Crossing
    /// the failure threshold demotes it so the next [`Self::active_host`]
    /// call re-probes.
    pub async fn record_failure(&self) {
        let mut guard = self.active.lock().await;
        if let Some(host) = guard.as_mut() {
            host.consecutive_failures += 1;
            if host.consecutive_failures >= self.failure_threshold {
                tracing::info!(
                    host = %host.address,
                    failures = host.consecutive_failures,
                    "Demoting relay host, will re-probe"
                );
            }
        }
    }

    /// Record a successful live request against the active host.
    pub async fn record_success(&self) {
        let mut guard = self.active.lock().await;
        if let Some(host) = guard.as_mut() {
            host.consecutive_failures = 0;
            host.last_success = Some(Utc::now());
        }
    }
}

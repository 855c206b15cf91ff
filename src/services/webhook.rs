// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Webhook delivery to Home Assistant.
//!
//! Events are POSTed as `{event_type, payload}` to the hub's webhook
//! endpoint, with a bounded number of retries on transient failure.
//! Delivery is at-most-once: an event that exhausts its retries is
//! logged and dropped, never queued for replay. A later poll only
//! resends when the state actually changes again.

use crate::error::{AppError, Result};
use crate::models::ChangeEvent;
use serde_json::{json, Value};
use std::time::Duration;

/// Default number of delivery attempts per event.
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default pause between attempts, multiplied by the attempt number.
const DEFAULT_BACKOFF: Duration = Duration::from_millis(500);

/// Hub request timeout.
const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the Home Assistant webhook endpoint.
pub struct WebhookClient {
    http: reqwest::Client,
    url: String,
    token: Option<String>,
    max_attempts: u32,
    backoff: Duration,
}

impl WebhookClient {
    /// Create a client for the given hub URL and webhook ID.
    pub fn new(hub_url: &str, webhook_id: &str, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: format!("{}/api/webhook/{}", hub_url.trim_end_matches('/'), webhook_id),
            token,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
        }
    }

    /// Override retry policy (used by tests to keep backoff short).
    pub fn with_retry(mut self, max_attempts: u32, backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.backoff = backoff;
        self
    }

    /// Deliver a change event to the hub.
    pub async fn send(&self, event: &ChangeEvent) -> Result<()> {
        self.post(event.stream.event_type(), &event.payload).await
    }

    /// Notify the hub of a riding-state transition.
    pub async fn send_status(&self, online: bool, world_id: Option<i64>) -> Result<()> {
        self.post("status_update", &json!({"online": online, "world_id": world_id}))
            .await
    }

    /// POST one event, retrying transient failures with short backoff.
    async fn post(&self, event_type: &str, payload: &Value) -> Result<()> {
        let body = json!({
            "event_type": event_type,
            "payload": payload,
        });

        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            let mut request = self.http.post(&self.url).json(&body).timeout(SEND_TIMEOUT);
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }

            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!(event_type, attempt, "Webhook sent");
                    return Ok(());
                }
                Ok(response) if response.status().is_server_error() => {
                    last_error = format!("HTTP {}", response.status());
                }
                Ok(response) => {
                    // Client error: the hub is rejecting this event shape
                    // outright, retrying the same bytes cannot help.
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();
                    return Err(AppError::Delivery(format!(
                        "{} rejected with HTTP {}: {}",
                        event_type, status, text
                    )));
                }
                Err(e) => {
                    last_error = e.to_string();
                }
            }

            if attempt < self.max_attempts {
                tracing::warn!(
                    event_type,
                    attempt,
                    error = %last_error,
                    "Webhook attempt failed, retrying"
                );
                tokio::time::sleep(self.backoff * attempt).await;
            }
        }

        Err(AppError::Delivery(format!(
            "{} failed after {} attempts: {}",
            event_type, self.max_attempts, last_error
        )))
    }
}

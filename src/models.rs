// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the poller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// OAuth2 credential pair with expiry bookkeeping.
///
/// Created on first login, mutated in place by refresh, persisted after
/// every mutation, never deleted (only replaced).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credential {
    /// Bearer token presented to the Zwift API.
    pub access_token: String,
    /// Token used to obtain a new access token without re-login.
    pub refresh_token: String,
    /// When the access token expires.
    pub access_expiry: DateTime<Utc>,
    /// When the refresh token expires.
    pub refresh_expiry: DateTime<Utc>,
}

impl Credential {
    /// True if the access token is still usable, with `margin` to spare.
    pub fn is_access_valid(&self, margin: Duration) -> bool {
        !self.access_token.is_empty()
            && Utc::now() + chrono::Duration::from_std(margin).unwrap_or_else(|_| chrono::Duration::zero())
                < self.access_expiry
    }

    /// True if the refresh token is still usable, with `margin` to spare.
    pub fn is_refresh_valid(&self, margin: Duration) -> bool {
        !self.refresh_token.is_empty()
            && Utc::now() + chrono::Duration::from_std(margin).unwrap_or_else(|_| chrono::Duration::zero())
                < self.refresh_expiry
    }
}

/// One of the interchangeable upstream relay endpoints.
#[derive(Debug, Clone)]
pub struct RelayHost {
    /// Base URL of the relay, e.g. `https://us-or-rly101.zwift.com`.
    pub address: String,
    /// Last time a request against this host succeeded.
    pub last_success: Option<DateTime<Utc>>,
    /// Consecutive request failures since the last success.
    pub consecutive_failures: u32,
}

impl RelayHost {
    /// A freshly promoted host.
    pub fn promoted(address: String) -> Self {
        Self {
            address,
            last_success: Some(Utc::now()),
            consecutive_failures: 0,
        }
    }
}

/// One independently scheduled category of polled data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    Profile,
    Activities,
    World,
}

impl Stream {
    /// Stream name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Stream::Profile => "profile",
            Stream::Activities => "activities",
            Stream::World => "world",
        }
    }

    /// Webhook event type for a change on this stream.
    pub fn event_type(&self) -> &'static str {
        match self {
            Stream::Profile => "profile_update",
            Stream::Activities => "activities_update",
            Stream::World => "world_update",
        }
    }
}

impl std::fmt::Display for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-stream poll state, owned exclusively by that stream's lane and
/// mutated only after a completed fetch.
#[derive(Debug, Clone)]
pub struct StreamState {
    /// Fingerprint of the last payload that was accepted as current.
    pub last_fingerprint: Option<String>,
    /// When the last successful fetch completed.
    pub last_fetch: Option<DateTime<Utc>>,
    /// Interval in effect for the next tick.
    pub current_interval: Duration,
}

impl StreamState {
    /// Fresh state for a lane with the given starting interval.
    pub fn new(interval: Duration) -> Self {
        Self {
            last_fingerprint: None,
            last_fetch: None,
            current_interval: interval,
        }
    }
}

/// A detected state change, constructed by the change detector and
/// consumed immediately by the webhook dispatcher. Not persisted.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    /// Stream the change was observed on.
    pub stream: Stream,
    /// Fingerprint of the new payload; the caller stores this in the
    /// stream's [`StreamState`] once the event is handed off.
    pub fingerprint: String,
    /// The new payload, as fetched (volatile fields included).
    pub payload: Value,
    /// When the change was detected.
    pub detected_at: DateTime<Utc>,
}

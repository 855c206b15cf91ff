// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Poll scheduling across the three data streams.
//!
//! Each stream (profile, activities, world) runs as its own lane: a
//! timer loop that sleeps for the stream's current interval, fetches,
//! diffs against the cached fingerprint, and dispatches a webhook on
//! change. Lanes never block each other; a stalled profile fetch does
//! not delay the world schedule.
//!
//! The world lane has two cadences: a short interval while a ride is in
//! progress and a longer re-check interval while idle, decided at the
//! top of each tick from the most recent profile payload.
//!
//! A tick that fails is logged and skipped with its stream state left
//! untouched; the next tick runs at the fixed interval. Upstream
//! instability is the relay resolver's problem, not the scheduler's.

use crate::config::Config;
use crate::detect::ChangeDetector;
use crate::models::{Stream, StreamState};
use crate::services::{WebhookClient, ZwiftClient};
use chrono::Utc;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Drives the three polling lanes.
pub struct Poller {
    api: Arc<ZwiftClient>,
    webhook: Arc<WebhookClient>,
    detector: ChangeDetector,
    profile_interval: Duration,
    activities_interval: Duration,
    world_active_interval: Duration,
    world_idle_interval: Duration,
    riding: AtomicBool,
    world_id: AtomicI64,
}

impl Poller {
    /// Create a poller over the given clients.
    pub fn new(config: &Config, api: Arc<ZwiftClient>, webhook: Arc<WebhookClient>) -> Self {
        Self {
            api,
            webhook,
            detector: ChangeDetector::new(config.ignore_fields.clone()),
            profile_interval: config.profile_interval,
            activities_interval: config.activities_interval,
            world_active_interval: config.world_active_interval,
            world_idle_interval: config.world_idle_interval,
            riding: AtomicBool::new(false),
            world_id: AtomicI64::new(1),
        }
    }

    /// Run until `shutdown` flips to true. An in-flight tick completes
    /// before its lane exits; only the sleeps are interrupted.
    pub async fn run(self: Arc<Self>, shutdown: watch::Receiver<bool>) {
        tracing::info!("Starting poller");

        // Initial fetch so the hub has state right away. A fresh stream
        // state has no fingerprint, so the first successful fetch always
        // dispatches.
        let mut profile_state = StreamState::new(self.profile_interval);
        let mut activities_state = StreamState::new(self.activities_interval);
        self.poll_profile(&mut profile_state).await;
        self.poll_activities(&mut activities_state).await;

        let lanes = [
            tokio::spawn(
                self.clone()
                    .profile_loop(profile_state, shutdown.clone()),
            ),
            tokio::spawn(
                self.clone()
                    .activities_loop(activities_state, shutdown.clone()),
            ),
            tokio::spawn(self.clone().world_loop(shutdown)),
        ];

        for lane in lanes {
            let _ = lane.await;
        }
        tracing::info!("Poller stopped");
    }

    /// Whether the most recent profile payload showed a ride in progress.
    pub fn is_riding(&self) -> bool {
        self.riding.load(Ordering::Relaxed)
    }

    /// Interval the world lane will use for its next tick.
    pub fn world_interval(&self) -> Duration {
        if self.is_riding() {
            self.world_active_interval
        } else {
            self.world_idle_interval
        }
    }

    async fn profile_loop(
        self: Arc<Self>,
        mut state: StreamState,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            if wait_for_tick(state.current_interval, &mut shutdown).await {
                break;
            }
            self.poll_profile(&mut state).await;
        }
        tracing::debug!("Profile lane stopped");
    }

    async fn activities_loop(
        self: Arc<Self>,
        mut state: StreamState,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            if wait_for_tick(state.current_interval, &mut shutdown).await {
                break;
            }
            self.poll_activities(&mut state).await;
        }
        tracing::debug!("Activities lane stopped");
    }

    async fn world_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut state = StreamState::new(self.world_idle_interval);
        loop {
            // Cadence is re-derived at the top of every tick.
            state.current_interval = self.world_interval();
            if wait_for_tick(state.current_interval, &mut shutdown).await {
                break;
            }
            if self.is_riding() {
                self.poll_world(&mut state).await;
            } else {
                tracing::debug!("Not riding, world poll skipped");
            }
        }
        tracing::debug!("World lane stopped");
    }

    /// One profile tick: fetch, derive riding state, dispatch on change.
    pub async fn poll_profile(&self, state: &mut StreamState) {
        match self.api.fetch(Stream::Profile).await {
            Ok(payload) => {
                self.apply_riding_state(&payload).await;
                self.dispatch_if_changed(Stream::Profile, payload, state).await;
            }
            Err(e) => tracing::warn!(stream = "profile", error = %e, "Poll tick skipped"),
        }
    }

    /// One activities tick.
    pub async fn poll_activities(&self, state: &mut StreamState) {
        match self.api.fetch(Stream::Activities).await {
            Ok(payload) => {
                self.dispatch_if_changed(Stream::Activities, payload, state)
                    .await;
            }
            Err(e) => tracing::warn!(stream = "activities", error = %e, "Poll tick skipped"),
        }
    }

    /// One world tick.
    pub async fn poll_world(&self, state: &mut StreamState) {
        match self.api.fetch(Stream::World).await {
            Ok(payload) => {
                self.dispatch_if_changed(Stream::World, payload, state).await;
            }
            Err(e) => tracing::warn!(stream = "world", error = %e, "Poll tick skipped"),
        }
    }

    /// Diff a fetched payload and dispatch a webhook if it changed.
    ///
    /// The fingerprint cache is updated before the webhook is attempted:
    /// delivery is at-most-once, and a dropped event is not resent by a
    /// later unchanged poll.
    async fn dispatch_if_changed(&self, stream: Stream, payload: Value, state: &mut StreamState) {
        state.last_fetch = Some(Utc::now());

        match self
            .detector
            .diff(stream, &payload, state.last_fingerprint.as_deref())
        {
            Some(event) => {
                state.last_fingerprint = Some(event.fingerprint.clone());
                tracing::info!(stream = %stream, "State changed, sending webhook");
                if let Err(e) = self.webhook.send(&event).await {
                    tracing::warn!(stream = %stream, error = %e, "Change event dropped");
                }
            }
            None => tracing::debug!(stream = %stream, "Unchanged"),
        }
    }

    /// Derive riding state and world from a profile payload, emitting a
    /// status webhook on transitions.
    async fn apply_riding_state(&self, payload: &Value) {
        let now_riding = payload
            .get("riding")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        if let Some(world_id) = payload.get("worldId").and_then(Value::as_i64) {
            if world_id != 0 {
                self.world_id.store(world_id, Ordering::Relaxed);
                self.api.set_world_id(world_id);
            }
        }

        let was_riding = self.riding.swap(now_riding, Ordering::Relaxed);
        if now_riding == was_riding {
            return;
        }

        let world_id = self.world_id.load(Ordering::Relaxed);
        if now_riding {
            tracing::info!(world_id, "Rider is now online");
        } else {
            tracing::info!("Rider is now offline");
        }

        let status = self
            .webhook
            .send_status(now_riding, now_riding.then_some(world_id))
            .await;
        if let Err(e) = status {
            tracing::warn!(error = %e, "Status event dropped");
        }
    }
}

/// Sleep until the next tick. Returns true if shutdown was requested,
/// either explicitly or by the sender going away.
async fn wait_for_tick(interval: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(interval) => false,
        res = shutdown.changed() => res.is_err() || *shutdown.borrow(),
    }
}

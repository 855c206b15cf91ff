// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Zwift-Poller: forward Zwift state changes to Home Assistant
//!
//! This crate polls the Zwift API on independent schedules (profile,
//! activities, world/live), diffs each payload against the last known
//! state, and pushes change events to a Home Assistant webhook so the
//! hub never has to poll Zwift itself.

pub mod config;
pub mod detect;
pub mod error;
pub mod models;
pub mod poller;
pub mod services;
pub mod store;

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - network-facing layers of the poller.

pub mod api;
pub mod auth;
pub mod relay;
pub mod webhook;

pub use api::ZwiftClient;
pub use auth::AuthManager;
pub use relay::RelayResolver;
pub use webhook::WebhookClient;

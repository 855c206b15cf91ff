// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Zwift-Poller daemon
//!
//! Polls the Zwift API on a schedule and forwards state changes to a
//! Home Assistant webhook, keeping the expensive polling out of the
//! hub's own event loop.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zwift_poller::{
    config::Config,
    poller::Poller,
    services::{AuthManager, RelayResolver, WebhookClient, ZwiftClient},
    store::TokenStore,
};

#[tokio::main]
async fn main() {
    init_logging();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            eprintln!();
            eprintln!("Required environment variables:");
            eprintln!("  ZWIFT_USERNAME      - Zwift account email");
            eprintln!("  ZWIFT_PASSWORD      - Zwift account password");
            eprintln!("  ZWIFT_PLAYER_ID     - Zwift player ID to poll");
            eprintln!("  ZWIFT_HA_WEBHOOK_ID - Home Assistant webhook ID");
            std::process::exit(1);
        }
    };

    tracing::info!(
        player_id = config.player_id,
        hub_url = %config.hub_url,
        profile_interval = config.profile_interval.as_secs(),
        activities_interval = config.activities_interval.as_secs(),
        world_interval = config.world_active_interval.as_secs(),
        "Starting zwift-poller"
    );

    let store = TokenStore::new(config.token_file.clone());
    let auth = Arc::new(AuthManager::new(
        config.auth_url.clone(),
        config.username.clone(),
        config.password.clone(),
        config.token_refresh_margin,
        store,
    ));
    let relay = Arc::new(RelayResolver::new(
        config.relay_hosts.clone(),
        ZwiftClient::probe_path(config.player_id),
        config.relay_failure_threshold,
    ));
    let api = Arc::new(ZwiftClient::new(auth, relay, config.player_id));
    let webhook = Arc::new(WebhookClient::new(
        &config.hub_url,
        &config.webhook_id,
        config.hub_token.clone(),
    ));

    let poller = Arc::new(Poller::new(&config, api, webhook));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    poller.run(shutdown_rx).await;
    tracing::info!("Shutdown complete");
}

/// Wait for SIGINT or SIGTERM.
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("zwift_poller=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! All knobs use the `ZWIFT_` prefix. Policy constants that cannot be
//! derived from requirements (token refresh margin, relay failure
//! threshold) are configuration defaults here, not hardcoded in the
//! services that use them.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default Zwift relay hosts, tried in order.
const DEFAULT_RELAY_HOSTS: &[&str] = &[
    "us-or-rly101.zwift.com",
    "us-or-rly102.zwift.com",
    "eu-west-rly101.zwift.com",
    "eu-west-rly102.zwift.com",
];

/// Zwift OAuth2 token endpoint (password and refresh grants).
const DEFAULT_AUTH_URL: &str =
    "https://secure.zwift.com/auth/realms/zwift/tokens/access/codes";

/// Payload fields ignored by change detection. These change on every
/// poll without representing real state change.
const DEFAULT_IGNORE_FIELDS: &[&str] = &["world_time", "road_time"];

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Zwift credentials ---
    /// Zwift account email.
    pub username: String,
    /// Zwift account password.
    pub password: String,
    /// Zwift player ID to poll.
    pub player_id: u64,

    // --- Home Assistant webhook ---
    /// Home Assistant base URL.
    pub hub_url: String,
    /// Webhook ID configured in Home Assistant.
    pub webhook_id: String,
    /// Optional long-lived access token for authenticated webhooks.
    pub hub_token: Option<String>,

    // --- Polling cadences ---
    /// Profile poll interval.
    pub profile_interval: Duration,
    /// Activities poll interval.
    pub activities_interval: Duration,
    /// World/live poll interval while a ride is in progress.
    pub world_active_interval: Duration,
    /// Riding-state re-check interval while no ride is in progress.
    pub world_idle_interval: Duration,

    // --- Policy constants ---
    /// Refresh tokens this long before they actually expire.
    pub token_refresh_margin: Duration,
    /// Consecutive request failures before the active relay host is
    /// demoted and candidates are re-probed.
    pub relay_failure_threshold: u32,

    // --- Endpoints ---
    /// OAuth2 token endpoint.
    pub auth_url: String,
    /// Relay host candidates, in priority order. Entries without a
    /// scheme are assumed to be https.
    pub relay_hosts: Vec<String>,

    // --- Storage ---
    /// Path where OAuth tokens are persisted across restarts.
    pub token_file: PathBuf,

    // --- Change detection ---
    /// Volatile payload field paths excluded from fingerprinting.
    /// Dotted paths address nested fields.
    pub ignore_fields: Vec<String>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            username: "rider@example.com".to_string(),
            password: "test_password".to_string(),
            player_id: 12345,
            hub_url: "http://homeassistant:8123".to_string(),
            webhook_id: "test_webhook".to_string(),
            hub_token: None,
            profile_interval: Duration::from_secs(300),
            activities_interval: Duration::from_secs(300),
            world_active_interval: Duration::from_secs(30),
            world_idle_interval: Duration::from_secs(60),
            token_refresh_margin: Duration::from_secs(60),
            relay_failure_threshold: 3,
            auth_url: DEFAULT_AUTH_URL.to_string(),
            relay_hosts: DEFAULT_RELAY_HOSTS.iter().map(|h| h.to_string()).collect(),
            token_file: PathBuf::from("/data/tokens.json"),
            ignore_fields: DEFAULT_IGNORE_FIELDS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            username: env::var("ZWIFT_USERNAME").map_err(|_| ConfigError::Missing("ZWIFT_USERNAME"))?,
            password: env::var("ZWIFT_PASSWORD").map_err(|_| ConfigError::Missing("ZWIFT_PASSWORD"))?,
            player_id: env::var("ZWIFT_PLAYER_ID")
                .map_err(|_| ConfigError::Missing("ZWIFT_PLAYER_ID"))?
                .parse()
                .map_err(|_| ConfigError::Invalid("ZWIFT_PLAYER_ID"))?,

            hub_url: env::var("ZWIFT_HA_URL")
                .unwrap_or_else(|_| "http://homeassistant:8123".to_string()),
            webhook_id: env::var("ZWIFT_HA_WEBHOOK_ID")
                .map_err(|_| ConfigError::Missing("ZWIFT_HA_WEBHOOK_ID"))?,
            hub_token: env::var("ZWIFT_HA_TOKEN").ok().filter(|t| !t.is_empty()),

            profile_interval: secs_var("ZWIFT_PROFILE_INTERVAL", 300)?,
            activities_interval: secs_var("ZWIFT_ACTIVITIES_INTERVAL", 300)?,
            world_active_interval: secs_var("ZWIFT_WORLD_INTERVAL", 30)?,
            world_idle_interval: secs_var("ZWIFT_WORLD_IDLE_INTERVAL", 60)?,

            token_refresh_margin: secs_var("ZWIFT_TOKEN_REFRESH_MARGIN", 60)?,
            relay_failure_threshold: env::var("ZWIFT_RELAY_FAILURE_THRESHOLD")
                .ok()
                .map(|v| v.parse().map_err(|_| ConfigError::Invalid("ZWIFT_RELAY_FAILURE_THRESHOLD")))
                .transpose()?
                .unwrap_or(3),

            auth_url: env::var("ZWIFT_AUTH_URL").unwrap_or_else(|_| DEFAULT_AUTH_URL.to_string()),
            relay_hosts: env::var("ZWIFT_RELAY_HOSTS")
                .map(|v| {
                    v.split(',')
                        .map(|h| h.trim().to_string())
                        .filter(|h| !h.is_empty())
                        .collect()
                })
                .unwrap_or_else(|_| DEFAULT_RELAY_HOSTS.iter().map(|h| h.to_string()).collect()),

            token_file: env::var("ZWIFT_TOKEN_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/data/tokens.json")),

            ignore_fields: env::var("ZWIFT_IGNORE_FIELDS")
                .map(|v| {
                    v.split(',')
                        .map(|f| f.trim().to_string())
                        .filter(|f| !f.is_empty())
                        .collect()
                })
                .unwrap_or_else(|_| DEFAULT_IGNORE_FIELDS.iter().map(|f| f.to_string()).collect()),
        })
    }
}

/// Read a duration-in-seconds env var with a default.
fn secs_var(name: &'static str, default: u64) -> Result<Duration, ConfigError> {
    match env::var(name) {
        Ok(v) => v
            .parse()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(Duration::from_secs(default)),
    }
}

/// Configuration errors. These are the only errors fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types.
//!
//! Every error here is contained within the poll tick that produced it;
//! nothing in this taxonomy is allowed to take the process down. Only
//! configuration errors at startup are fatal, and those live in
//! [`crate::config::ConfigError`].

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Both the refresh grant and the password grant were rejected.
    /// Repeated occurrences usually mean user action is needed (changed
    /// password, new terms of service to accept).
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// No relay host answered a probe. The cycle is skipped and retried
    /// on the next scheduled tick.
    #[error("No relay host available")]
    NoRelayAvailable,

    /// A single Zwift API request failed.
    #[error("Zwift API error: {0}")]
    Api(String),

    /// Webhook delivery to Home Assistant exhausted its retries.
    #[error("Webhook delivery failed: {0}")]
    Delivery(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Marker message for a 401 from the Zwift API.
    pub const API_TOKEN_ERROR: &'static str = "Invalid or expired access token";

    /// True if this error indicates the access token was rejected
    /// upstream (HTTP 401), as opposed to a transport or server failure.
    pub fn is_token_error(&self) -> bool {
        match self {
            AppError::Api(msg) => msg.contains(Self::API_TOKEN_ERROR),
            _ => false,
        }
    }
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AppError>;

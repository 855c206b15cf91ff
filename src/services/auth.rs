// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth2 token lifecycle management for the Zwift API.
//!
//! Handles:
//! - Password grant on first login
//! - Refresh grant when the access token is expiring
//! - Fallback to password grant when the refresh token is rejected
//! - Persistence of every successful exchange via [`TokenStore`]
//!
//! Refreshes are single-flight: the credential sits behind a mutex held
//! for the whole exchange, so concurrent callers await the in-progress
//! refresh and reuse its result instead of issuing duplicates.

use crate::error::{AppError, Result};
use crate::models::Credential;
use crate::store::TokenStore;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;

/// OAuth client ID Zwift expects for the mobile-link flows.
const CLIENT_ID: &str = "Zwift_Mobile_Link";

/// Skew subtracted from reported lifetimes to cover transfer time.
const EXPIRY_SKEW_SECS: i64 = 5;

/// Manages the Zwift OAuth2 credential.
pub struct AuthManager {
    http: reqwest::Client,
    auth_url: String,
    username: String,
    password: String,
    refresh_margin: Duration,
    store: TokenStore,
    credential: Mutex<Option<Credential>>,
}

impl AuthManager {
    /// Create a manager, loading any persisted credential from the store.
    pub fn new(
        auth_url: String,
        username: String,
        password: String,
        refresh_margin: Duration,
        store: TokenStore,
    ) -> Self {
        let credential = store.load();
        Self {
            http: reqwest::Client::new(),
            auth_url,
            username,
            password,
            refresh_margin,
            store,
            credential: Mutex::new(credential),
        }
    }

    /// Get a credential guaranteed not expired (with the configured
    /// margin), refreshing or re-authenticating as needed.
    ///
    /// Holding the credential lock across the exchange means only one
    /// refresh is ever in flight; waiters see the refreshed credential
    /// on the validity re-check and return it without a network call.
    pub async fn ensure_valid_token(&self) -> Result<Credential> {
        let mut guard = self.credential.lock().await;

        if let Some(credential) = guard.as_ref() {
            if credential.is_access_valid(self.refresh_margin) {
                return Ok(credential.clone());
            }
        }

        // Try the refresh grant first if we have a usable refresh token.
        if let Some(credential) = guard.as_ref() {
            if credential.is_refresh_valid(self.refresh_margin) {
                let refresh_token = credential.refresh_token.clone();
                match self.refresh_grant(&refresh_token).await {
                    Ok(new_credential) => {
                        self.store.save(&new_credential)?;
                        *guard = Some(new_credential.clone());
                        return Ok(new_credential);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Token refresh failed, falling back to login");
                    }
                }
            }
        }

        // Full login: first use, expired refresh token, or revoked grant.
        let new_credential = self.password_grant().await?;
        self.store.save(&new_credential)?;
        *guard = Some(new_credential.clone());
        Ok(new_credential)
    }

    /// Drop the cached access token so the next call re-authenticates.
    /// Used when the upstream API rejects a token we believed valid.
    pub async fn invalidate(&self) {
        let mut guard = self.credential.lock().await;
        if let Some(credential) = guard.as_mut() {
            tracing::debug!("Invalidating cached access token");
            credential.access_token.clear();
        }
    }

    /// Authenticate with username/password.
    async fn password_grant(&self) -> Result<Credential> {
        tracing::info!("Authenticating with password grant");

        let response = self
            .http
            .post(&self.auth_url)
            .form(&[
                ("client_id", CLIENT_ID),
                ("grant_type", "password"),
                ("username", self.username.as_str()),
                ("password", self.password.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Authentication(format!("Login request failed: {}", e)))?;

        let credential = self.parse_token_response(response, "login").await?;
        tracing::info!("Password grant successful");
        Ok(credential)
    }

    /// Obtain a new access token using the refresh token.
    async fn refresh_grant(&self, refresh_token: &str) -> Result<Credential> {
        tracing::info!("Refreshing access token");

        let response = self
            .http
            .post(&self.auth_url)
            .form(&[
                ("client_id", CLIENT_ID),
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await
            .map_err(|e| AppError::Authentication(format!("Refresh request failed: {}", e)))?;

        let credential = self.parse_token_response(response, "refresh").await?;
        tracing::info!("Token refresh successful");
        Ok(credential)
    }

    /// Check a token endpoint response and convert it to a credential.
    async fn parse_token_response(
        &self,
        response: reqwest::Response,
        grant: &str,
    ) -> Result<Credential> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Authentication(format!(
                "{} rejected with HTTP {}: {}",
                grant, status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Authentication(format!("Bad token response: {}", e)))?;

        Ok(token.into_credential(Utc::now()))
    }
}

/// Token endpoint response body.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: i64,
    #[serde(default)]
    refresh_expires_in: i64,
}

impl TokenResponse {
    /// Convert reported lifetimes to absolute expiries.
    fn into_credential(self, now: DateTime<Utc>) -> Credential {
        Credential {
            access_expiry: now
                + ChronoDuration::seconds(normalize_expiry(self.expires_in) - EXPIRY_SKEW_SECS),
            refresh_expiry: now
                + ChronoDuration::seconds(
                    normalize_expiry(self.refresh_expires_in) - EXPIRY_SKEW_SECS,
                ),
            access_token: self.access_token,
            refresh_token: self.refresh_token,
        }
    }
}

/// Zwift sometimes reports token lifetimes in milliseconds.
fn normalize_expiry(expires_in: i64) -> i64 {
    if expires_in > 1_000_000 {
        expires_in / 1000
    } else {
        expires_in
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Durable storage for the OAuth credential pair.
//!
//! Tokens are kept in a single JSON file so they survive process
//! restarts. A missing file means "not logged in yet"; a corrupt file is
//! logged and treated the same way rather than blocking startup.

use crate::error::{AppError, Result};
use crate::models::Credential;
use anyhow::Context;
use std::fs;
use std::path::PathBuf;

/// JSON-file-backed credential store.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Create a store backed by the given file path.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Load the persisted credential, if any.
    pub fn load(&self) -> Option<Credential> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(_) => return None,
        };

        match serde_json::from_str(&data) {
            Ok(credential) => {
                tracing::info!(path = %self.path.display(), "Loaded tokens");
                Some(credential)
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to parse stored tokens, starting fresh"
                );
                None
            }
        }
    }

    /// Persist the credential, creating parent directories as needed.
    pub fn save(&self, credential: &Credential) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))
                .map_err(AppError::Internal)?;
        }

        let data = serde_json::to_string(credential)
            .context("Failed to serialize tokens")
            .map_err(AppError::Internal)?;

        fs::write(&self.path, data)
            .with_context(|| format!("Failed to write {}", self.path.display()))
            .map_err(AppError::Internal)?;

        tracing::debug!(path = %self.path.display(), "Saved tokens");
        Ok(())
    }
}

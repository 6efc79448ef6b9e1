//! Host-supplied configuration
//!
//! A plain data struct built by the embedding application — no XDG
//! discovery, no `.taskrc` parsing, no environment-variable reads. Those
//! are CLI/application concerns, not the replica core's.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::task::UrgencyCoefficients;

/// Where and how a replica stores its data, syncs, expires tasks, and
/// scores urgency. Constructed directly by the host; never read from disk
/// by this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Directory holding the SQLite store and lock file.
    pub data_dir: PathBuf,
    /// Remote sync endpoint, if this replica participates in sync.
    pub sync: Option<SyncConfig>,
    /// Weights for urgency computation (§4.2).
    pub urgency: UrgencyCoefficients,
    /// Tasks `completed`/`deleted` for longer than this are dropped by
    /// `Replica::expire_tasks` (Open Question #3: a single horizon, no
    /// layered precedence).
    pub expiry_horizon: chrono::Duration,
}

/// Remote endpoint and secret for `SyncEngine` (C7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub server_url: String,
    /// 32-byte AEAD key, base64-encoded. Never written to the store —
    /// only its fingerprint is (§4.1).
    pub encryption_secret: String,
}

impl Configuration {
    /// Configuration rooted at `data_dir`, sync disabled, default urgency
    /// coefficients and a 30-day expiry horizon.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            sync: None,
            urgency: UrgencyCoefficients::default(),
            expiry_horizon: chrono::Duration::days(30),
        }
    }

    pub fn with_sync(mut self, server_url: impl Into<String>, encryption_secret: impl Into<String>) -> Self {
        self.sync = Some(SyncConfig {
            server_url: server_url.into(),
            encryption_secret: encryption_secret.into(),
        });
        self
    }

    pub fn with_urgency(mut self, urgency: UrgencyCoefficients) -> Self {
        self.urgency = urgency;
        self
    }

    pub fn with_expiry_horizon(mut self, horizon: chrono::Duration) -> Self {
        self.expiry_horizon = horizon;
        self
    }
}

//! Transport abstraction for SyncEngine (§4.7, §6)
//!
//! A version is identified by an opaque, server-chosen id and carries the
//! operations list of the client that created it. `SyncTransport` is the
//! seam between the rebase algorithm and wherever versions actually live —
//! a directory on disk for tests/local servers, or an HTTP sync server for
//! production use.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::sync::crypto;
use crate::task::Operation;

/// One version in the server's chain: the operations a client pushed, and
/// the version id its push was built on top of.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
    pub id: String,
    pub parent_id: String,
    pub operations: Vec<Operation>,
}

/// Where versions live and how they're exchanged (§4.7 step 2).
pub trait SyncTransport {
    /// The version whose `parent_id` is `base_version`, if the server has
    /// one.
    fn get_child_version(&self, base_version: &str) -> Result<Option<Version>, SyncError>;

    /// Attempt to add `operations` as the child of `base_version`. Returns
    /// the new version's id on success, or `None` if the server already
    /// has a different child (the caller must rebase and retry).
    fn push(&self, base_version: &str, operations: &[Operation]) -> Result<Option<String>, SyncError>;
}

/// A `SyncTransport` backed by files in a directory — one JSON file per
/// version, named by id — for single-machine or test setups where
/// "remote" means "another directory", not a network.
pub struct LocalTransport {
    root: PathBuf,
}

impl LocalTransport {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn version_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }
}

impl SyncTransport for LocalTransport {
    fn get_child_version(&self, base_version: &str) -> Result<Option<Version>, SyncError> {
        fs::create_dir_all(&self.root).map_err(|e| SyncError::Transport { message: e.to_string() })?;
        let entries = fs::read_dir(&self.root).map_err(|e| SyncError::Transport { message: e.to_string() })?;

        for entry in entries {
            let entry = entry.map_err(|e| SyncError::Transport { message: e.to_string() })?;
            let content = fs::read_to_string(entry.path()).map_err(|e| SyncError::Transport { message: e.to_string() })?;
            let version: Version =
                serde_json::from_str(&content).map_err(|e| SyncError::Transport { message: e.to_string() })?;
            if version.parent_id == base_version {
                return Ok(Some(version));
            }
        }
        Ok(None)
    }

    fn push(&self, base_version: &str, operations: &[Operation]) -> Result<Option<String>, SyncError> {
        if self.get_child_version(base_version)?.is_some() {
            return Ok(None);
        }
        let id = uuid::Uuid::new_v4().to_string();
        let version = Version { id: id.clone(), parent_id: base_version.to_string(), operations: operations.to_vec() };
        let json = serde_json::to_string(&version).map_err(|e| SyncError::Transport { message: e.to_string() })?;
        fs::write(self.version_path(&id), json).map_err(|e| SyncError::Transport { message: e.to_string() })?;
        Ok(Some(id))
    }
}

/// Wire form of a push request: `operations` never crosses the network in
/// the clear, only as a base64-encoded, compressed-and-sealed blob (§4.7).
#[derive(Serialize)]
struct PushRequest<'a> {
    base_version: &'a str,
    sealed_operations: String,
}

#[derive(Deserialize)]
struct PushResponse {
    accepted: bool,
    version_id: Option<String>,
}

/// Wire form of a fetched version: the envelope (`id`/`parent_id`) is
/// plaintext bookkeeping, but `sealed_operations` is the same opaque blob
/// a push sent — the server only ever stores and forwards it.
#[derive(Serialize, Deserialize)]
struct WireVersion {
    id: String,
    parent_id: String,
    sealed_operations: String,
}

/// A `SyncTransport` speaking to a remote sync server over HTTP, using a
/// blocking `reqwest` client rather than pulling in an async runtime
/// (§5's synchronous-only model). Every operations list is sealed with
/// `crypto::seal`/`unseal` before it leaves or after it arrives — the
/// server itself never sees a decrypted operation.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    base_url: String,
    secret: [u8; 32],
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, secret: [u8; 32], timeout: Duration) -> Result<Self, SyncError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Transport { message: e.to_string() })?;
        Ok(Self { client, base_url: base_url.into(), secret })
    }

    /// Build a transport from a replica's `SyncConfig`, decoding its
    /// base64 secret into the AEAD key every push/fetch seals with.
    pub fn from_sync_config(config: &SyncConfig, timeout: Duration) -> Result<Self, SyncError> {
        let secret = crypto::decode_secret(&config.encryption_secret)?;
        Self::new(config.server_url.clone(), secret, timeout)
    }

    fn seal_operations(&self, operations: &[Operation]) -> Result<String, SyncError> {
        let plaintext = serde_json::to_vec(operations).map_err(|e| SyncError::Crypto { message: e.to_string() })?;
        let sealed = crypto::seal(&plaintext, &self.secret)?;
        Ok(BASE64.encode(sealed))
    }

    fn unseal_operations(&self, sealed_operations: &str) -> Result<Vec<Operation>, SyncError> {
        let sealed = BASE64.decode(sealed_operations).map_err(|e| SyncError::Crypto { message: e.to_string() })?;
        let plaintext = crypto::unseal(&sealed, &self.secret)?;
        serde_json::from_slice(&plaintext).map_err(|e| SyncError::Crypto { message: e.to_string() })
    }
}

impl SyncTransport for HttpTransport {
    fn get_child_version(&self, base_version: &str) -> Result<Option<Version>, SyncError> {
        let url = format!("{}/versions/child-of/{base_version}", self.base_url);
        let response = self.client.get(&url).send().map_err(|e| SyncError::Transport { message: e.to_string() })?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let wire: WireVersion = response
            .error_for_status()
            .map_err(|e| SyncError::Transport { message: e.to_string() })?
            .json()
            .map_err(|e| SyncError::Transport { message: e.to_string() })?;
        let operations = self.unseal_operations(&wire.sealed_operations)?;
        Ok(Some(Version { id: wire.id, parent_id: wire.parent_id, operations }))
    }

    fn push(&self, base_version: &str, operations: &[Operation]) -> Result<Option<String>, SyncError> {
        let url = format!("{}/versions", self.base_url);
        let sealed_operations = self.seal_operations(operations)?;
        let body = PushRequest { base_version, sealed_operations };
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| SyncError::Transport { message: e.to_string() })?
            .error_for_status()
            .map_err(|e| SyncError::Transport { message: e.to_string() })?;
        let parsed: PushResponse = response.json().map_err(|e| SyncError::Transport { message: e.to_string() })?;
        Ok(if parsed.accepted { parsed.version_id } else { None })
    }
}

//! Error types for the replica core
//!
//! This module defines all error types used throughout the crate, using
//! `thiserror` for idiomatic Rust error handling. Every public `Replica`
//! method returns `Result<_, ReplicaError>`; callers match on variant
//! rather than parsing a message.

use uuid::Uuid;

/// Top-level error returned by every public `Replica` operation.
#[derive(thiserror::Error, Debug)]
pub enum ReplicaError {
    #[error("storage error")]
    Storage {
        #[from]
        source: StorageError,
    },

    #[error("task error")]
    Task {
        #[from]
        source: TaskError,
    },

    #[error("sync error")]
    Sync {
        #[from]
        source: SyncError,
    },

    #[error("validation error")]
    Validation {
        #[from]
        source: ValidationError,
    },

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("invalid configuration: {message}")]
    BadConfig { message: String },
}

/// Storage-related errors (C1)
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage corrupt: {message}")]
    Corrupt { message: String },

    #[error("storage locked: {path}")]
    Locked { path: std::path::PathBuf },

    #[error("database error: {message}")]
    Database { message: String },
}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        StorageError::Database {
            message: e.to_string(),
        }
    }
}

/// Identity and logical-state errors on tasks (C2/C4)
#[derive(thiserror::Error, Debug)]
pub enum TaskError {
    #[error("task not found: {id}")]
    NotFound { id: Uuid },

    #[error("task already exists: {id}")]
    DuplicateUuid { id: Uuid },

    #[error("task already exists: {id}")]
    AlreadyExists { id: Uuid },

    #[error("bad value for attribute '{attribute}': {value}")]
    BadAttributeValue { attribute: String, value: String },

    #[error("invariant violated: {message}")]
    InvariantViolation { message: String },

    #[error("dependency cycle: {from} already depends (transitively) on {to}")]
    DependencyCycle { from: Uuid, to: Uuid },
}

/// Sync-related errors (C7)
#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    #[error("transport error: {message}")]
    Transport { message: String },

    #[error("authentication error: {message}")]
    Auth { message: String },

    #[error("crypto error: {message}")]
    Crypto { message: String },

    #[error("sync conflict could not be resolved: {message}")]
    ConflictUnresolvable { message: String },

    #[error("synchronization is not configured for this replica")]
    NotConfigured,
}

/// Validation errors for tasks
#[derive(thiserror::Error, Debug, Clone)]
pub enum ValidationError {
    #[error("task description cannot be empty")]
    EmptyDescription,

    #[error("empty modify: no edits supplied")]
    EmptyUpdate,
}

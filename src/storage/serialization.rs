//! Wire/on-disk encoding for operation log records (§6).
//!
//! Each row in the `operations` table holds one JSON-encoded
//! `OperationRecord`. This is also the unit exchanged with a sync server
//! (before compression/sealing, see [`crate::sync::crypto`]).

use crate::error::StorageError;
use crate::task::operation::Operation;

pub fn encode_operation(op: &Operation) -> Result<String, StorageError> {
    serde_json::to_string(op).map_err(|e| StorageError::Corrupt { message: e.to_string() })
}

pub fn decode_operation(json: &str) -> Result<Operation, StorageError> {
    serde_json::from_str(json).map_err(|e| StorageError::Corrupt { message: e.to_string() })
}

pub fn encode_operations(ops: &[Operation]) -> Result<String, StorageError> {
    serde_json::to_string(ops).map_err(|e| StorageError::Corrupt { message: e.to_string() })
}

pub fn decode_operations(json: &str) -> Result<Vec<Operation>, StorageError> {
    serde_json::from_str(json).map_err(|e| StorageError::Corrupt { message: e.to_string() })
}

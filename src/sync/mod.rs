//! SyncEngine (C7): reconciles a replica's local operations tail with a
//! remote server's version chain by rebasing (§4.7).

pub mod crypto;
pub mod rebase;
pub mod transport;

use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::SyncError;
use crate::task::operation::{apply, Operation};
use transport::SyncTransport;

/// Outcome of one `SyncEngine::sync` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub pushed_operations: usize,
    pub pulled_versions: usize,
    pub new_base_version: String,
}

/// Drives the algorithm in §4.7 against a `SyncTransport`, given the
/// replica's current `base_version` and unsynced tail.
pub struct SyncEngine<'a> {
    transport: &'a dyn SyncTransport,
}

impl<'a> SyncEngine<'a> {
    pub fn new(transport: &'a dyn SyncTransport) -> Self {
        Self { transport }
    }

    /// Run the rebase loop. `tasks` is the replica's in-memory task table,
    /// mutated in place as remote operations are applied during rebase.
    /// Returns the rebased local tail (to be written back over the log)
    /// and a report. The caller is responsible for appending any further
    /// `Operation`s produced locally in the meantime before the next sync.
    pub fn sync(
        &self,
        base_version: &str,
        local_ops: Vec<Operation>,
        tasks: &mut BTreeMap<Uuid, BTreeMap<String, String>>,
    ) -> Result<(Vec<Operation>, SyncReport), SyncError> {
        let local_ops: Vec<Operation> = local_ops.into_iter().filter(|op| !op.is_undo_point()).collect();
        let mut current_base = base_version.to_string();
        let mut tail = local_ops;
        let mut pulled_versions = 0;

        loop {
            match self.transport.get_child_version(&current_base)? {
                None => {
                    if let Some(new_version) = self.transport.push(&current_base, &tail)? {
                        return Ok((
                            tail.clone(),
                            SyncReport {
                                pushed_operations: tail.len(),
                                pulled_versions,
                                new_base_version: new_version,
                            },
                        ));
                    }
                    // Someone pushed between our check and our push; loop
                    // and observe their version instead.
                }
                Some(remote_version) => {
                    for op in &remote_version.operations {
                        apply(tasks, op).map_err(|e| SyncError::ConflictUnresolvable { message: e.to_string() })?;
                    }
                    tail = rebase::rebase_all(tail, &remote_version.operations);
                    current_base = remote_version.id;
                    pulled_versions += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::transport::LocalTransport;

    #[test]
    fn first_sync_with_no_remote_history_pushes_directly() {
        let dir = tempfile::tempdir().unwrap().into_path();
        let transport = LocalTransport::new(&dir);
        let engine = SyncEngine::new(&transport);

        let uuid = Uuid::new_v4();
        let mut tasks = BTreeMap::new();
        let (rebased, report) = engine.sync("V0", vec![Operation::Create { uuid }], &mut tasks).unwrap();

        assert_eq!(rebased.len(), 1);
        assert_eq!(report.pulled_versions, 0);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn concurrent_push_is_pulled_and_rebased_over() {
        let dir = tempfile::tempdir().unwrap().into_path();
        let transport = LocalTransport::new(&dir);

        let uuid = Uuid::new_v4();
        // Peer B pushes first.
        transport
            .push(
                "V0",
                &[Operation::Update {
                    uuid,
                    property: "project".into(),
                    value: Some("work".into()),
                    old_value: None,
                    timestamp: chrono::Utc::now(),
                }],
            )
            .unwrap();

        let engine = SyncEngine::new(&transport);
        let mut tasks = BTreeMap::new();
        tasks.insert(uuid, BTreeMap::new());

        let (_, report) = engine
            .sync(
                "V0",
                vec![Operation::Update {
                    uuid,
                    property: "due".into(),
                    value: Some("later".into()),
                    old_value: None,
                    timestamp: chrono::Utc::now(),
                }],
                &mut tasks,
            )
            .unwrap();

        assert_eq!(report.pulled_versions, 1);
        assert_eq!(tasks.get(&uuid).unwrap().get("project").map(String::as_str), Some("work"));
        let _ = std::fs::remove_dir_all(&dir);
    }
}

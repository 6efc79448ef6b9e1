//! A replicated task store: the operation log, sync, undo and
//! working-set core behind a Taskwarrior-style task manager.
//!
//! This crate is deliberately narrow: it owns task identity, the
//! operation log, sync reconciliation, undo, the working set, recurrence
//! expansion and dependency bookkeeping. It does not parse a CLI, render
//! reports, read `.taskrc` files, or run hooks — those live in the
//! application embedding this crate.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use replitask::{Configuration, Replica, TaskEdits, TaskStatus};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Configuration::new("/tmp/my-replica");
//! let replica = Replica::open(config)?;
//!
//! let task = replica.new_task(TaskStatus::Pending, "write documentation")?;
//! replica.add_undo_point(true)?;
//! replica.modify(task.uuid(), TaskEdits::new().project("docs"))?;
//!
//! replica.rebuild_working_set(false)?;
//! for task in replica.pending_tasks()? {
//!     println!("{}: {}", task.uuid(), task.description());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod query;
pub mod replica;
pub mod storage;
pub mod sync;
pub mod task;
pub mod undo;
pub mod working_set;

pub use config::{Configuration, SyncConfig};
pub use error::{ReplicaError, StorageError, SyncError, TaskError, ValidationError};
pub use query::{filter::TagFilter, TaskFilter};
pub use replica::Replica;
pub use task::{Annotation, Operation, Priority, Task, TaskEdits, TaskStatus, UrgencyCoefficients};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

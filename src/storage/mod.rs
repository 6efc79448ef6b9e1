//! Storage (C1): the durable substrate underneath a [`crate::replica::Replica`].
//!
//! A `Storage` owns one `rusqlite::Connection` and an OS-level `.lock`
//! sentinel file that enforces single-writer exclusivity per data
//! directory (§5). Four tables hold everything: `tasks`, `operations`,
//! `working_set`, `sync_meta` (§4.1).

pub mod serialization;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::error::StorageError;
use crate::task::operation::Operation;
use crate::task::Task;

/// A handle onto one replica's on-disk state. Not `Clone`: exclusivity is
/// enforced by holding the one `Storage` value for the process lifetime of
/// a replica, backed by a `.lock` sentinel file created with `create_new`
/// (fails if another live handle already holds it) and removed on drop.
#[derive(Debug)]
pub struct Storage {
    conn: Connection,
    lock_path: PathBuf,
}

impl Storage {
    /// Open (creating if absent) the SQLite-backed store rooted at
    /// `dir`. Fails with [`StorageError::Locked`] if another live handle
    /// already holds `dir/.lock`.
    pub fn open(dir: &Path) -> Result<Self, StorageError> {
        fs::create_dir_all(dir)?;
        let lock_path = dir.join(".lock");
        fs::File::options()
            .write(true)
            .create_new(true)
            .open(&lock_path)
            .map_err(|_| StorageError::Locked { path: lock_path.clone() })?;

        let conn = Connection::open(dir.join("replica.sqlite3"))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS tasks (
                uuid TEXT PRIMARY KEY,
                attributes TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS operations (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                record TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS working_set (
                idx INTEGER PRIMARY KEY,
                uuid TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS sync_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;

        Ok(Self { conn, lock_path })
    }

    /// Open an in-memory store, for tests.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let dir = tempfile::tempdir().unwrap().into_path();
        Self::open(&dir)
    }

    /// Run `f`, which may call any other `&self` method on this `Storage`,
    /// inside one SQLite transaction: commits on `Ok`, rolls back on
    /// `Err`. `rusqlite::Connection::transaction` takes `&mut self`, which
    /// would prevent `f` from also borrowing `self`, so the transaction is
    /// driven with raw `BEGIN`/`COMMIT`/`ROLLBACK` instead.
    pub fn transaction<T, E>(&self, f: impl FnOnce() -> Result<T, E>) -> Result<T, E>
    where
        E: From<StorageError>,
    {
        self.conn.execute_batch("BEGIN").map_err(StorageError::from)?;
        match f() {
            Ok(value) => {
                self.conn.execute_batch("COMMIT").map_err(StorageError::from)?;
                Ok(value)
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    pub fn get_task(&self, uuid: Uuid) -> Result<Option<Task>, StorageError> {
        self.conn
            .query_row(
                "SELECT attributes FROM tasks WHERE uuid = ?1",
                params![uuid.to_string()],
                |row| row.get::<_, String>(0),
            )
            .optional()?
            .map(|json| decode_attributes(&json).map(|attrs| Task::from_parts(uuid, attrs)))
            .transpose()
    }

    pub fn all_tasks(&self) -> Result<Vec<Task>, StorageError> {
        let mut stmt = self.conn.prepare("SELECT uuid, attributes FROM tasks")?;
        let rows = stmt.query_map([], |row| {
            let uuid: String = row.get(0)?;
            let attrs: String = row.get(1)?;
            Ok((uuid, attrs))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (uuid, attrs) = row?;
            let uuid = Uuid::parse_str(&uuid).map_err(|e| StorageError::Corrupt { message: e.to_string() })?;
            out.push(Task::from_parts(uuid, decode_attributes(&attrs)?));
        }
        Ok(out)
    }

    pub fn put_task(&self, task: &Task) -> Result<(), StorageError> {
        let json = encode_attributes(task.attributes())?;
        self.conn.execute(
            "INSERT INTO tasks (uuid, attributes) VALUES (?1, ?2)
             ON CONFLICT(uuid) DO UPDATE SET attributes = excluded.attributes",
            params![task.uuid().to_string(), json],
        )?;
        Ok(())
    }

    pub fn remove_task(&self, uuid: Uuid) -> Result<(), StorageError> {
        self.conn.execute("DELETE FROM tasks WHERE uuid = ?1", params![uuid.to_string()])?;
        Ok(())
    }

    /// Append one operation to the log, returning its assigned sequence
    /// number.
    pub fn append_operation(&self, op: &Operation) -> Result<i64, StorageError> {
        let record = serialization::encode_operation(op)?;
        self.conn.execute("INSERT INTO operations (record) VALUES (?1)", params![record])?;
        Ok(self.conn.last_insert_rowid())
    }

    /// All operations with `seq > after`, in log order.
    pub fn operations_since(&self, after: i64) -> Result<Vec<(i64, Operation)>, StorageError> {
        let mut stmt = self.conn.prepare("SELECT seq, record FROM operations WHERE seq > ?1 ORDER BY seq ASC")?;
        let rows = stmt.query_map(params![after], |row| {
            let seq: i64 = row.get(0)?;
            let record: String = row.get(1)?;
            Ok((seq, record))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (seq, record) = row?;
            out.push((seq, serialization::decode_operation(&record)?));
        }
        Ok(out)
    }

    pub fn all_operations(&self) -> Result<Vec<(i64, Operation)>, StorageError> {
        self.operations_since(0)
    }

    pub fn last_sequence(&self) -> Result<i64, StorageError> {
        Ok(self
            .conn
            .query_row("SELECT COALESCE(MAX(seq), 0) FROM operations", [], |row| row.get(0))?)
    }

    pub fn working_set(&self) -> Result<BTreeMap<u32, Uuid>, StorageError> {
        let mut stmt = self.conn.prepare("SELECT idx, uuid FROM working_set")?;
        let rows = stmt.query_map([], |row| {
            let idx: i64 = row.get(0)?;
            let uuid: String = row.get(1)?;
            Ok((idx, uuid))
        })?;

        let mut out = BTreeMap::new();
        for row in rows {
            let (idx, uuid) = row?;
            let uuid = Uuid::parse_str(&uuid).map_err(|e| StorageError::Corrupt { message: e.to_string() })?;
            out.insert(idx as u32, uuid);
        }
        Ok(out)
    }

    pub fn replace_working_set(&self, set: &BTreeMap<u32, Uuid>) -> Result<(), StorageError> {
        self.conn.execute("DELETE FROM working_set", [])?;
        for (idx, uuid) in set {
            self.conn.execute(
                "INSERT INTO working_set (idx, uuid) VALUES (?1, ?2)",
                params![*idx as i64, uuid.to_string()],
            )?;
        }
        Ok(())
    }

    pub fn get_meta(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .conn
            .query_row("SELECT value FROM sync_meta WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?)
    }

    pub fn set_meta(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO sync_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }
}

impl Drop for Storage {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

fn encode_attributes(attrs: &BTreeMap<String, String>) -> Result<String, StorageError> {
    serde_json::to_string(attrs).map_err(|e| StorageError::Corrupt { message: e.to_string() })
}

fn decode_attributes(json: &str) -> Result<BTreeMap<String, String>, StorageError> {
    serde_json::from_str(json).map_err(|e| StorageError::Corrupt { message: e.to_string() })
}

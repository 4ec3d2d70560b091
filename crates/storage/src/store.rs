// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};
use td_core::{TaskId, TaskStatus};
use tracing::debug;

use crate::error::StorageError;
use crate::schema;

/// A task handed out by `claim_one`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedTask {
    pub path: String,
    pub task_id: TaskId,
}

/// The task table, guarded by a single connection. SQLite serialises
/// writers internally; the mutex just keeps `rusqlite::Connection`
/// (`Send` but not `Sync`) shareable across the coordinator's request
/// handlers without a connection pool, which this workload doesn't need.
pub struct TaskStore {
    conn: Mutex<Connection>,
}

impl TaskStore {
    /// Open (creating if absent) the task store at `db_path`.
    pub fn open(db_path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(db_path)?;
        schema::open_and_migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// An in-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        schema::open_and_migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// `ClaimOne`: atomically flip a single `pending` row to `in_progress`,
    /// stamping `lease_expiry` and `assignee`, deriving `task_id` fresh from
    /// the path (never trusting a stored value — the id is a pure function
    /// of the path).
    pub fn claim_one(
        &self,
        assignee: &str,
        now: u64,
        lease_ttl_secs: u64,
    ) -> Result<Option<ClaimedTask>, StorageError> {
        let conn = self.lock();
        let tx = conn.unchecked_transaction()?;

        let path: Option<String> = tx
            .query_row(
                "SELECT path FROM tasks WHERE status = ?1 ORDER BY rowid LIMIT 1",
                params![TaskStatus::Pending.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        let Some(path) = path else {
            tx.commit()?;
            return Ok(None);
        };

        let task_id = TaskId::for_path(&path);
        let lease_expiry = now + lease_ttl_secs;

        let updated = tx.execute(
            "UPDATE tasks SET status = ?1, lease_expiry = ?2, assignee = ?3, task_id = ?4
             WHERE path = ?5 AND status = ?6",
            params![
                TaskStatus::InProgress.as_str(),
                lease_expiry as i64,
                assignee,
                task_id.as_str(),
                path,
                TaskStatus::Pending.as_str(),
            ],
        )?;
        tx.commit()?;

        if updated == 0 {
            // Lost a race to another claimant between the select and the
            // update; the caller's retry loop will pick the next row.
            return Ok(None);
        }

        debug!(%path, task_id = %task_id, %assignee, "claimed task");
        Ok(Some(ClaimedTask { path, task_id }))
    }

    /// `Complete`: only succeeds when the row is `in_progress` and matches
    /// the id. Returns `false` (NotFound) for a stale or unknown id so a
    /// late-arriving duplicate upload cannot clobber a reassigned task.
    pub fn complete(&self, task_id: &TaskId) -> Result<bool, StorageError> {
        self.terminal_transition(task_id, TaskStatus::Completed)
    }

    /// `Fail`: same precondition as `complete`, terminal.
    pub fn fail(&self, task_id: &TaskId) -> Result<bool, StorageError> {
        self.terminal_transition(task_id, TaskStatus::Failed)
    }

    fn terminal_transition(
        &self,
        task_id: &TaskId,
        to: TaskStatus,
    ) -> Result<bool, StorageError> {
        let conn = self.lock();
        let updated = conn.execute(
            "UPDATE tasks SET status = ?1, lease_expiry = NULL, assignee = NULL
             WHERE task_id = ?2 AND status = ?3",
            params![
                to.as_str(),
                task_id.as_str(),
                TaskStatus::InProgress.as_str(),
            ],
        )?;
        Ok(updated > 0)
    }

    /// Look up the path for an `in_progress` row by task id, used by the
    /// dispatch API to locate where to write the artifact before calling
    /// `complete`.
    pub fn path_for_in_progress(&self, task_id: &TaskId) -> Result<Option<String>, StorageError> {
        let conn = self.lock();
        let path = conn
            .query_row(
                "SELECT path FROM tasks WHERE task_id = ?1 AND status = ?2",
                params![task_id.as_str(), TaskStatus::InProgress.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(path)
    }

    /// `ExpireLeases`: any `in_progress` row with `lease_expiry < now` is
    /// reset to `failed`. Resurrection to `pending` is left to the
    /// reconciler, which alone knows whether the artifact still needs
    /// redoing.
    pub fn expire_leases(&self, now: u64) -> Result<u64, StorageError> {
        let conn = self.lock();
        let count = conn.execute(
            "UPDATE tasks SET status = ?1, lease_expiry = NULL, assignee = NULL
             WHERE status = ?2 AND lease_expiry < ?3",
            params![
                TaskStatus::Failed.as_str(),
                TaskStatus::InProgress.as_str(),
                now as i64,
            ],
        )?;
        Ok(count as u64)
    }

    /// `Upsert`: insert a new `pending` row for `path` if none exists.
    /// Returns `true` if a row was inserted.
    pub fn upsert_pending(&self, path: &str) -> Result<bool, StorageError> {
        let conn = self.lock();
        let inserted = conn.execute(
            "INSERT INTO tasks (path, status, lease_expiry, assignee, task_id)
             VALUES (?1, ?2, NULL, NULL, NULL)
             ON CONFLICT(path) DO NOTHING",
            params![path, TaskStatus::Pending.as_str()],
        )?;
        Ok(inserted > 0)
    }

    /// `Reset`: unconditionally move a row back to `pending`, clearing
    /// lease/assignee/task_id. Used by the reconciler when an orphaned
    /// `in_progress` row or a `failed`/`completed` row whose artifact has
    /// vanished needs to be redone.
    pub fn reset_to_pending(&self, path: &str) -> Result<(), StorageError> {
        let conn = self.lock();
        conn.execute(
            "UPDATE tasks SET status = ?1, lease_expiry = NULL, assignee = NULL, task_id = NULL
             WHERE path = ?2",
            params![TaskStatus::Pending.as_str(), path],
        )?;
        Ok(())
    }

    /// The status of the row at `path`, if one exists. Used by the
    /// reconciler to decide which branch of its per-file logic applies.
    pub fn status_of(&self, path: &str) -> Result<Option<TaskStatus>, StorageError> {
        let conn = self.lock();
        let raw: Option<String> = conn
            .query_row(
                "SELECT status FROM tasks WHERE path = ?1",
                params![path],
                |row| row.get(0),
            )
            .optional()?;
        Ok(raw.and_then(|s| TaskStatus::from_str(&s)))
    }

    /// The lease expiry of the row at `path`, if `in_progress`.
    pub fn lease_expiry_of(&self, path: &str) -> Result<Option<u64>, StorageError> {
        let conn = self.lock();
        let raw: Option<i64> = conn
            .query_row(
                "SELECT lease_expiry FROM tasks WHERE path = ?1",
                params![path],
                |row| row.get(0),
            )
            .optional()?;
        Ok(raw.map(|v| v as u64))
    }

    #[cfg(test)]
    pub(crate) fn row_count(&self) -> Result<i64, StorageError> {
        let conn = self.lock();
        let count = conn.query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use rusqlite::Connection;

use crate::error::StorageError;

/// Bumped whenever the `tasks` table shape changes. A fresh database is
/// stamped with this value; an existing one is checked against it so a
/// future migration has somewhere to hook in.
pub const SCHEMA_VERSION: i64 = 1;

pub fn open_and_migrate(conn: &Connection) -> Result<(), StorageError> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", true)?;

    let user_version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if user_version == 0 {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS tasks (
                path         TEXT PRIMARY KEY,
                status       TEXT NOT NULL,
                lease_expiry INTEGER,
                assignee     TEXT,
                task_id      TEXT
            );
            CREATE INDEX IF NOT EXISTS tasks_status_idx ON tasks(status);
            CREATE UNIQUE INDEX IF NOT EXISTS tasks_task_id_idx ON tasks(task_id)
                WHERE task_id IS NOT NULL;",
        )?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        return Ok(());
    }

    if user_version != SCHEMA_VERSION {
        return Err(StorageError::SchemaMismatch {
            found: user_version,
            expected: SCHEMA_VERSION,
        });
    }

    Ok(())
}

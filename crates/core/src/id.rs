// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task identifiers.
//!
//! A [`TaskId`] is the opaque handle a worker sees on the wire. It is a
//! pure function of the source path (`task_id = MD5(path)`, invariant
//! P6) — never randomly generated, never stored for `pending` rows.

use std::fmt;

/// 32-character lowercase hex MD5 digest of an absolute file path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct TaskId([u8; 32]);

impl TaskId {
    /// Derive the id for a path. Pure and deterministic: the same path
    /// always yields the same id (invariant P6).
    pub fn for_path(path: &str) -> Self {
        let digest = md5::compute(path.as_bytes());
        let hex = format!("{digest:x}");
        Self::from_hex(&hex).unwrap_or_else(|| {
            // md5::compute always yields 32 lowercase hex chars.
            unreachable!("md5 digest formatting produced non-hex output")
        })
    }

    /// Parse a 32-character lowercase hex string received over the wire.
    pub fn from_hex(s: &str) -> Option<Self> {
        if s.len() != 32 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let mut buf = [0u8; 32];
        buf.copy_from_slice(s.as_bytes());
        buf.make_ascii_lowercase();
        Some(Self(buf))
    }

    pub fn as_str(&self) -> &str {
        // Invariant: only ever constructed from validated ASCII hex.
        std::str::from_utf8(&self.0).unwrap_or("")
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;

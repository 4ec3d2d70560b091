// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded line buffers for subprocess stdout/stderr (spec.md §5, §7): two
//! short-lived reader tasks drain each pipe so a chatty engine can't block
//! the pipeline on a full pipe, keeping only the last `CAPACITY` lines of
//! each for error reporting.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// Lines kept for operator notifications (spec.md §7: "up to 20 lines").
pub const CAPACITY: usize = 20;

#[derive(Clone, Default)]
pub struct RingBuffer {
    lines: Arc<Mutex<VecDeque<String>>>,
}

impl RingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, line: String) {
        let mut lines = self.lines.lock();
        if lines.len() == CAPACITY {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    pub fn tail(&self) -> Vec<String> {
        self.lines.lock().iter().cloned().collect()
    }
}

/// Drains `reader` line by line into `buffer`. If `echo` is set, also
/// writes each line to stdout live (spec.md §4.4 step 5: "stream its
/// stdout to the operator console live").
pub async fn drain_into<R: AsyncRead + Unpin>(reader: R, buffer: RingBuffer, echo: bool) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if echo {
                    println!("{line}");
                }
                buffer.push(line);
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "subprocess output reader failed");
                break;
            }
        }
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run status snapshot

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Status of a worker's most recent run
///
/// A fresh worker reports `idle = false, result = true`: it has not run
/// yet and is not waiting for a trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    /// Waiting for a trigger
    pub idle: bool,
    /// Outcome of the last completed run, true until a run fails
    pub result: bool,
    /// Output of the last run only
    pub stdout: String,
    pub stderr: String,
    /// When the last run completed
    pub last_finished: Option<DateTime<Utc>>,
}

impl Default for Status {
    fn default() -> Self {
        Self {
            idle: false,
            result: true,
            stdout: String::new(),
            stderr: String::new(),
            last_finished: None,
        }
    }
}

impl Status {
    /// Whether at least one run has completed
    pub fn has_run(&self) -> bool {
        self.last_finished.is_some()
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run/trigger state machine shared by all workers
//!
//! A runner alternates between running one cycle of its executor and
//! waiting for a trigger. Triggers are a single-slot signal: any number
//! of triggers received during a run result in exactly one follow-up run.

use crate::status::Status;
use async_trait::async_trait;
use chrono::Utc;
use std::time::Instant;
use tokio::sync::{watch, Mutex, Notify};
use tracing::Instrument;

/// Result of one execution of a worker's underlying job
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutcome {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl RunOutcome {
    /// A failed run with a message describing why
    pub fn failure(message: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: message.to_string(),
        }
    }
}

/// One cycle of work performed by a runner
#[async_trait]
pub trait Execute: Send + Sync + 'static {
    async fn execute(&self) -> RunOutcome;
}

/// Drives an executor through run cycles and publishes its status
pub struct Runner<E> {
    name: String,
    executor: E,
    status: watch::Sender<Status>,
    trigger: Notify,
    cycle: Mutex<()>,
}

impl<E: Execute> Runner<E> {
    pub fn new(name: impl Into<String>, executor: E) -> Self {
        let (status, _) = watch::channel(Status::default());
        Self {
            name: name.into(),
            executor,
            status,
            trigger: Notify::new(),
            cycle: Mutex::new(()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Snapshot of the current status
    pub fn status(&self) -> Status {
        self.status.borrow().clone()
    }

    /// Receiver notified on every status change
    pub fn subscribe(&self) -> watch::Receiver<Status> {
        self.status.subscribe()
    }

    /// Request another run without waiting for it
    pub fn trigger(&self) {
        tracing::debug!(worker = %self.name, "trigger requested");
        self.trigger.notify_one();
    }

    /// Perform one run cycle, returning whether it succeeded
    ///
    /// Cycles never overlap; a second caller waits for the first to finish.
    pub async fn run_once(&self) -> bool {
        let _cycle = self.cycle.lock().await;
        let span = tracing::info_span!("worker.run", worker = %self.name);

        async {
            self.status.send_modify(|s| s.idle = false);
            tracing::info!("sync started");

            let start = Instant::now();
            let outcome = self.executor.execute().await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            if outcome.success {
                tracing::info!(success = true, elapsed_ms, "sync finished");
            } else {
                tracing::warn!(
                    success = false,
                    elapsed_ms,
                    stderr_len = outcome.stderr.len(),
                    "sync failed"
                );
            }

            let success = outcome.success;
            self.status.send_modify(|s| {
                s.result = outcome.success;
                s.stdout = outcome.stdout;
                s.stderr = outcome.stderr;
                s.last_finished = Some(Utc::now());
                s.idle = true;
            });
            success
        }
        .instrument(span)
        .await
    }

    /// Run once immediately, then once per delivered trigger, forever
    pub async fn run_forever(&self) {
        loop {
            self.run_once().await;
            self.trigger.notified().await;
            tracing::debug!(worker = %self.name, "trigger delivered");
        }
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;

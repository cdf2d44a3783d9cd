// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workers and the worker factory
//!
//! Each mirrored repository gets one worker, built from its config by a
//! [`WorkerRegistry`] keyed on the config's `type` field.

use crate::config::{self, RepoConfig};
use crate::error::ConfigError;
use crate::process::{ExternalCommand, Launch, ProcessExecutor, ShellScript};
use crate::rlimit::RlimitGuard;
use crate::runner::Runner;
use crate::status::Status;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;

/// A long-lived sync job for one repository
#[async_trait]
pub trait Worker: Send + Sync {
    fn name(&self) -> &str;

    /// The config the worker was built from, unmodified
    fn config(&self) -> &RepoConfig;

    /// Non-blocking snapshot of the run status
    fn status(&self) -> Status;

    /// Receiver notified on every status change
    fn subscribe(&self) -> watch::Receiver<Status>;

    /// Request another run; at most one request is kept pending
    fn trigger(&self);

    /// Perform a single run cycle
    async fn run_once(&self) -> bool;

    /// Run immediately, then on every trigger. Does not return.
    async fn run_forever(&self);
}

/// Worker that runs a subprocess on every cycle
pub struct ProcessWorker<L> {
    config: Arc<RepoConfig>,
    runner: Runner<ProcessExecutor<L>>,
}

/// Worker running an inline `script` through the shell
pub type ShellScriptWorker = ProcessWorker<ShellScript>;
/// Worker running a named executable
pub type ExternalWorker = ProcessWorker<ExternalCommand>;

impl<L: Launch> ProcessWorker<L> {
    /// Validate `config` and build the worker. Nothing is started.
    pub fn new(config: RepoConfig) -> Result<Self, ConfigError> {
        let name = config::name(&config)?.to_string();
        let launch = L::from_config(&config)?;
        let guard = RlimitGuard::from_config(&config)?;

        tracing::debug!(worker = %name, kind = L::KIND, ceiling = ?guard.ceiling(), "worker created");

        let config = Arc::new(config);
        let executor = ProcessExecutor::new(launch, Arc::clone(&config), guard);
        Ok(Self {
            config,
            runner: Runner::new(name, executor),
        })
    }

    pub fn launch(&self) -> &L {
        self.runner.executor().launch()
    }

    pub fn rlimit(&self) -> &RlimitGuard {
        self.runner.executor().guard()
    }
}

#[async_trait]
impl<L: Launch> Worker for ProcessWorker<L> {
    fn name(&self) -> &str {
        self.runner.name()
    }

    fn config(&self) -> &RepoConfig {
        &self.config
    }

    fn status(&self) -> Status {
        self.runner.status()
    }

    fn subscribe(&self) -> watch::Receiver<Status> {
        self.runner.subscribe()
    }

    fn trigger(&self) {
        self.runner.trigger()
    }

    async fn run_once(&self) -> bool {
        self.runner.run_once().await
    }

    async fn run_forever(&self) {
        self.runner.run_forever().await
    }
}

/// Builds a worker from a validated config
pub type WorkerConstructor = fn(RepoConfig) -> Result<Arc<dyn Worker>, ConfigError>;

fn construct<L: Launch>(config: RepoConfig) -> Result<Arc<dyn Worker>, ConfigError> {
    Ok(Arc::new(ProcessWorker::<L>::new(config)?))
}

/// Dispatch table from `type` to worker constructor
#[derive(Clone)]
pub struct WorkerRegistry {
    constructors: HashMap<String, WorkerConstructor>,
}

impl WorkerRegistry {
    /// A registry with no worker types
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Register (or replace) the constructor for a worker type
    pub fn register(&mut self, kind: impl Into<String>, constructor: WorkerConstructor) -> &mut Self {
        self.constructors.insert(kind.into(), constructor);
        self
    }

    /// Registered worker types, sorted
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Build a worker for `config`
    ///
    /// Fails if `name` is missing or empty, if `type` is missing or not
    /// registered, or if the variant rejects the config.
    pub fn build(&self, config: RepoConfig) -> Result<Arc<dyn Worker>, ConfigError> {
        config::name(&config)?;
        let kind = config::worker_type(&config)?;
        let constructor = *self
            .constructors
            .get(kind)
            .ok_or_else(|| ConfigError::UnknownType(kind.to_string()))?;
        constructor(config)
    }
}

impl Default for WorkerRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register(ExternalCommand::KIND, construct::<ExternalCommand>)
            .register(ShellScript::KIND, construct::<ShellScript>);
        registry
    }
}

/// Build a worker using the built-in worker types
pub fn new_worker(config: RepoConfig) -> Result<Arc<dyn Worker>, ConfigError> {
    WorkerRegistry::default().build(config)
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;

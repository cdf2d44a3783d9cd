// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lug-worker: job execution core for mirror synchronization
//!
//! This crate provides:
//! - A worker per mirrored repository, built from an untyped config mapping
//! - A run/trigger state machine shared by all worker variants
//! - Materialization of config into `LUG_*` environment variables
//! - A memory ceiling applied around subprocess start

pub mod config;
pub mod env;
mod error;
pub mod process;
pub mod rlimit;
pub mod runner;
mod status;
pub mod worker;

pub use config::{load_repos, load_repos_str, RepoConfig};
pub use env::{materialize, EnvPolicy};
pub use error::{ConfigError, ConversionError, ExecError};
pub use process::{ExternalCommand, Launch, ProcessExecutor, ShellScript};
pub use rlimit::{parse_size, RlimitGuard};
pub use runner::{Execute, RunOutcome, Runner};
pub use status::Status;
pub use worker::{
    new_worker, ExternalWorker, ProcessWorker, ShellScriptWorker, Worker, WorkerConstructor,
    WorkerRegistry,
};

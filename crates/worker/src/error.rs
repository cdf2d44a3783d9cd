// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for worker construction and execution

use thiserror::Error;

/// Errors raised while validating a repo config or building a worker
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("worker name must not be empty")]
    EmptyName,
    #[error("no worker registered for type: {0}")]
    UnknownType(String),
    #[error("field {field} must be {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },
    #[error("invalid size {value:?}: {reason}")]
    InvalidSize { value: String, reason: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Errors from turning a config into environment variables
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("cannot encode config as JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures inside a single run cycle
///
/// These never escape the state machine. They are recorded on the
/// status as `result = false` with the message as the run's stderr.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("no command configured")]
    NoCommand,
    #[error("invalid command: {0}")]
    InvalidCommand(String),
    #[error("failed to start process: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("failed to wait for process: {0}")]
    Wait(#[source] std::io::Error),
    #[error("rlimit error: {0}")]
    Rlimit(#[from] nix::Error),
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error("run task aborted: {0}")]
    Join(String),
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution for workers
//!
//! A [`Launch`] describes what to start; [`ProcessExecutor`] attaches the
//! materialized environment, starts the child inside the rlimit bracket
//! and captures its output.

use crate::config::{self, RepoConfig, SCRIPT_KEY};
use crate::env::{materialize, EnvPolicy};
use crate::error::{ConfigError, ExecError};
use crate::rlimit::RlimitGuard;
use crate::runner::{Execute, RunOutcome};
use async_trait::async_trait;
use serde_json::Value;
use std::os::unix::process::CommandExt;
use std::process::{Command, Output, Stdio};
use std::sync::Arc;

/// Key naming the executable for external workers
pub const COMMAND_KEY: &str = "command";
/// Key holding extra arguments for external workers
pub const ARGS_KEY: &str = "args";

/// A kind of process a worker can start
pub trait Launch: Send + Sync + 'static {
    /// Value of the `type` field selecting this launcher
    const KIND: &'static str;

    /// Validate the keys this launcher needs
    fn from_config(config: &RepoConfig) -> Result<Self, ConfigError>
    where
        Self: Sized;

    /// Build the command to start, without environment or stdio
    fn command(&self) -> Result<Command, ExecError>;
}

/// Inline script run through `sh -c`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellScript {
    script: String,
}

impl ShellScript {
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
        }
    }

    pub fn script(&self) -> &str {
        &self.script
    }
}

impl Launch for ShellScript {
    const KIND: &'static str = "shell_script";

    fn from_config(config: &RepoConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config::required_str(config, SCRIPT_KEY)?))
    }

    fn command(&self) -> Result<Command, ExecError> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(&self.script);
        Ok(cmd)
    }
}

/// Pre-existing executable, started without a shell
///
/// `command` and `args` are ordinary sync parameters, so construction
/// accepts any value for them. They are checked when a run starts: a
/// missing or malformed command fails that run, as does a missing binary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalCommand {
    command: Value,
    args: Value,
}

impl ExternalCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: Value::String(program.into()),
            args: Value::from(args),
        }
    }

    /// The configured executable, if it is a string
    pub fn program(&self) -> Option<&str> {
        self.command.as_str()
    }

    /// The configured arguments, checked as an array of strings
    pub fn args(&self) -> Result<Vec<String>, ExecError> {
        let invalid =
            || ExecError::InvalidCommand(format!("{} must be an array of strings", ARGS_KEY));
        match &self.args {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string).ok_or_else(invalid))
                .collect(),
            _ => Err(invalid()),
        }
    }
}

impl Launch for ExternalCommand {
    const KIND: &'static str = "external";

    fn from_config(config: &RepoConfig) -> Result<Self, ConfigError> {
        let raw = |key: &str| config.get(key).cloned().unwrap_or(Value::Null);
        Ok(Self {
            command: raw(COMMAND_KEY),
            args: raw(ARGS_KEY),
        })
    }

    fn command(&self) -> Result<Command, ExecError> {
        let program = match &self.command {
            Value::Null => return Err(ExecError::NoCommand),
            Value::String(program) => program,
            _ => {
                return Err(ExecError::InvalidCommand(format!(
                    "{} must be a string",
                    COMMAND_KEY
                )))
            }
        };
        let mut cmd = Command::new(program);
        cmd.args(self.args()?);
        Ok(cmd)
    }
}

/// Runs a [`Launch`] with the worker's environment and memory ceiling
pub struct ProcessExecutor<L> {
    launch: L,
    config: Arc<RepoConfig>,
    policy: EnvPolicy,
    guard: RlimitGuard,
}

impl<L: Launch> ProcessExecutor<L> {
    pub fn new(launch: L, config: Arc<RepoConfig>, guard: RlimitGuard) -> Self {
        Self {
            launch,
            config,
            policy: EnvPolicy::LUG,
            guard,
        }
    }

    pub fn with_policy(mut self, policy: EnvPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn launch(&self) -> &L {
        &self.launch
    }

    pub fn guard(&self) -> &RlimitGuard {
        &self.guard
    }

    fn prepare(&self) -> Result<Command, ExecError> {
        let env = materialize(&self.config, &self.policy)?;
        let mut cmd = self.launch.command()?;
        cmd.envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if self.guard.ceiling().is_some() {
            // Pinning the uid makes std start the child with fork/exec. The
            // posix_spawn path maps a helper stack in this process, which
            // fails once the lowered limit is in place. When running as root,
            // std also clears the child's supplementary groups on this path,
            // so a limited child has fewer credentials than an unlimited one.
            cmd.uid(nix::unistd::getuid().as_raw());
        }
        Ok(cmd)
    }
}

/// Start the child inside the bracket, then wait for it outside
fn start_and_wait(mut cmd: Command, guard: RlimitGuard) -> Result<Output, ExecError> {
    let child = guard.bracket(|| cmd.spawn())?.map_err(ExecError::Spawn)?;
    child.wait_with_output().map_err(ExecError::Wait)
}

#[async_trait]
impl<L: Launch> Execute for ProcessExecutor<L> {
    async fn execute(&self) -> RunOutcome {
        let cmd = match self.prepare() {
            Ok(cmd) => cmd,
            Err(e) => {
                tracing::warn!(error = %e, "could not prepare sync process");
                return RunOutcome::failure(e);
            }
        };

        let guard = self.guard;
        let result = tokio::task::spawn_blocking(move || start_and_wait(cmd, guard))
            .await
            .unwrap_or_else(|e| Err(ExecError::Join(e.to_string())));

        match result {
            Ok(output) => {
                tracing::debug!(status = %output.status, "sync process exited");
                RunOutcome {
                    success: output.status.success(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "sync process did not run");
                RunOutcome::failure(e)
            }
        }
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;

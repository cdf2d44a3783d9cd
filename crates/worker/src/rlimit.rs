// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Memory ceiling for sync processes
//!
//! The ceiling is installed as this process's soft `RLIMIT_AS` right before
//! a child is started, so the child inherits it, and restored right after.
//! Resource limits are process-wide, so every start goes through one global
//! bracket lock, including starts with no ceiling. Otherwise a ceiling
//! installed for one worker could be inherited by another worker's child.

use crate::config::{RepoConfig, RLIMIT_MEM_KEY};
use crate::error::{ConfigError, ExecError};
use nix::libc::rlim_t;
use nix::sys::resource::{getrlimit, setrlimit, Resource};
use serde_json::Value;
use std::sync::{Mutex, MutexGuard};

static START_BRACKET: Mutex<()> = Mutex::new(());

/// Parse a human-readable size such as `10M` or `1.5G` into bytes
///
/// Suffixes `K`, `M`, `G` and `T` are powers of 1024. They are case
/// insensitive and may be followed by `B` or `iB`. A bare number is bytes.
pub fn parse_size(value: &str) -> Result<u64, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidSize {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = value.trim();
    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (number, suffix) = trimmed.split_at(split);
    if number.is_empty() {
        return Err(invalid("expected a number"));
    }

    let suffix = suffix.trim().to_ascii_uppercase();
    let unit = suffix
        .strip_suffix("IB")
        .or_else(|| suffix.strip_suffix('B'))
        .unwrap_or(&suffix);
    let multiplier: u64 = match unit {
        "" => 1,
        "K" => 1 << 10,
        "M" => 1 << 20,
        "G" => 1 << 30,
        "T" => 1 << 40,
        _ => return Err(invalid("unknown unit")),
    };
    // "iB" without a unit letter is not a size
    if unit.is_empty() && suffix == "IB" {
        return Err(invalid("unknown unit"));
    }

    let bytes = if number.contains('.') {
        let n: f64 = number.parse().map_err(|_| invalid("malformed number"))?;
        let bytes = (n * multiplier as f64).round();
        if !bytes.is_finite() || bytes >= u64::MAX as f64 {
            return Err(invalid("too large"));
        }
        bytes as u64
    } else {
        let n: u64 = number.parse().map_err(|_| invalid("malformed number"))?;
        n.checked_mul(multiplier).ok_or_else(|| invalid("too large"))?
    };

    if bytes == 0 {
        return Err(invalid("must be greater than zero"));
    }
    Ok(bytes)
}

/// Address-space ceiling applied around a child process start
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RlimitGuard {
    ceiling: Option<u64>,
}

impl RlimitGuard {
    /// A guard that installs nothing
    pub fn unlimited() -> Self {
        Self { ceiling: None }
    }

    pub fn with_ceiling(bytes: u64) -> Self {
        Self {
            ceiling: Some(bytes),
        }
    }

    /// Build the guard from `rlimit_mem`
    ///
    /// Absent, null or empty means no ceiling. Strings are parsed with
    /// [`parse_size`]; a non-negative integer is taken as bytes.
    pub fn from_config(config: &RepoConfig) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidField {
            field: RLIMIT_MEM_KEY,
            expected: "a size string or byte count",
        };
        match config.get(RLIMIT_MEM_KEY) {
            None | Some(Value::Null) => Ok(Self::unlimited()),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(Self::unlimited()),
            Some(Value::String(s)) => Ok(Self::with_ceiling(parse_size(s)?)),
            Some(Value::Number(n)) => match n.as_u64() {
                Some(0) | None => Err(invalid()),
                Some(bytes) => Ok(Self::with_ceiling(bytes)),
            },
            Some(_) => Err(invalid()),
        }
    }

    /// Ceiling in bytes, if one is configured
    pub fn ceiling(&self) -> Option<u64> {
        self.ceiling
    }

    /// Take the start bracket and install the ceiling
    ///
    /// The returned scope holds the bracket lock until
    /// [`LimitScope::post_hook`] is called or it is dropped, either of
    /// which restores the previous limit.
    pub fn pre_hook(&self) -> Result<LimitScope, ExecError> {
        let lock = START_BRACKET.lock().unwrap_or_else(|e| e.into_inner());
        let saved = match self.ceiling {
            Some(ceiling) => {
                let (soft, hard) = getrlimit(Resource::RLIMIT_AS)?;
                setrlimit(Resource::RLIMIT_AS, (ceiling as rlim_t).min(hard), hard)?;
                Some((soft, hard))
            }
            None => None,
        };
        Ok(LimitScope {
            _lock: lock,
            saved,
        })
    }

    /// Run `start` with the ceiling installed, restoring it afterwards
    ///
    /// `start` should only start the child, not wait for it.
    pub fn bracket<T>(&self, start: impl FnOnce() -> T) -> Result<T, ExecError> {
        let scope = self.pre_hook()?;
        let started = start();
        if let Err(e) = scope.post_hook() {
            tracing::error!(error = %e, "failed to restore address space limit");
        }
        if let Some(ceiling) = self.ceiling {
            tracing::debug!(ceiling, "child started under address space limit");
        }
        Ok(started)
    }
}

/// An installed ceiling, held between the pre and post hooks
#[must_use = "dropping the scope restores the limit immediately"]
pub struct LimitScope {
    _lock: MutexGuard<'static, ()>,
    saved: Option<(rlim_t, rlim_t)>,
}

impl LimitScope {
    /// Restore the limit that was in place before the pre hook
    pub fn post_hook(mut self) -> Result<(), ExecError> {
        self.restore()
    }

    fn restore(&mut self) -> Result<(), ExecError> {
        if let Some((soft, hard)) = self.saved.take() {
            setrlimit(Resource::RLIMIT_AS, soft, hard)?;
        }
        Ok(())
    }
}

impl Drop for LimitScope {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            tracing::error!(error = %e, "failed to restore address space limit");
        }
    }
}

#[cfg(test)]
#[path = "rlimit_tests.rs"]
mod tests;

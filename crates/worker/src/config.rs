// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repo configuration mapping
//!
//! A repo config is an untyped map from string keys to scalar or nested
//! values. A handful of keys are consumed by the worker itself; everything
//! else is a sync parameter handed to the child process.

use crate::error::ConfigError;
use serde::Deserialize;
use serde_json::{Map, Number, Value};
use std::path::Path;

/// Configuration for one worker
pub type RepoConfig = Map<String, Value>;

/// Discriminator selecting the worker variant
pub const TYPE_KEY: &str = "type";
/// Worker identity used in logs and status
pub const NAME_KEY: &str = "name";
/// Inline script for the shell script variant
pub const SCRIPT_KEY: &str = "script";
/// Address-space ceiling for the child process
pub const RLIMIT_MEM_KEY: &str = "rlimit_mem";

/// Keys that are never materialized as sync parameters
pub const RESERVED_KEYS: [&str; 4] = [TYPE_KEY, NAME_KEY, SCRIPT_KEY, RLIMIT_MEM_KEY];

/// Get the worker name, which must be a non-empty string
pub fn name(config: &RepoConfig) -> Result<&str, ConfigError> {
    let name = required_str(config, NAME_KEY)?;
    if name.is_empty() {
        return Err(ConfigError::EmptyName);
    }
    Ok(name)
}

/// Get the worker type discriminator
pub fn worker_type(config: &RepoConfig) -> Result<&str, ConfigError> {
    required_str(config, TYPE_KEY)
}

/// Get a string field that must be present
pub fn required_str<'a>(config: &'a RepoConfig, key: &'static str) -> Result<&'a str, ConfigError> {
    optional_str(config, key)?.ok_or(ConfigError::MissingField(key))
}

/// Get a string field, treating `null` the same as absent
pub fn optional_str<'a>(
    config: &'a RepoConfig,
    key: &'static str,
) -> Result<Option<&'a str>, ConfigError> {
    match config.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(ConfigError::InvalidField {
            field: key,
            expected: "a string",
        }),
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    repos: Vec<toml::Table>,
}

/// Parse repo configs from a TOML document with a `[[repos]]` array
pub fn load_repos_str(content: &str) -> Result<Vec<RepoConfig>, ConfigError> {
    let file: ConfigFile = toml::from_str(content)?;
    file.repos.into_iter().map(table_to_config).collect()
}

/// Read and parse repo configs from a TOML file
pub fn load_repos(path: &Path) -> Result<Vec<RepoConfig>, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let repos = load_repos_str(&content)?;
    tracing::debug!(path = %path.display(), count = repos.len(), "loaded repo configs");
    Ok(repos)
}

fn table_to_config(table: toml::Table) -> Result<RepoConfig, ConfigError> {
    table
        .into_iter()
        .map(|(key, value)| Ok((key, toml_to_json(value)?)))
        .collect()
}

fn toml_to_json(value: toml::Value) -> Result<Value, ConfigError> {
    Ok(match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => Value::Number(Number::from_f64(f).ok_or(
            ConfigError::InvalidField {
                field: "repos",
                expected: "finite floats",
            },
        )?),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(toml_to_json)
                .collect::<Result<_, _>>()?,
        ),
        toml::Value::Table(table) => Value::Object(table_to_config(table)?),
    })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

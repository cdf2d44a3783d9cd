// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment materialization
//!
//! Turns a repo config into the `LUG_*` variables passed to the sync
//! process. Scalars become individual variables; the whole (non-null)
//! parameter set is also emitted as JSON so nested values and `false`
//! flags survive.

use crate::config::{RepoConfig, RESERVED_KEYS};
use crate::error::ConversionError;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Prefix and exclusions used when materializing a config
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvPolicy {
    pub prefix: &'static str,
    pub reserved: &'static [&'static str],
}

impl EnvPolicy {
    /// Policy used by every built-in worker
    pub const LUG: EnvPolicy = EnvPolicy {
        prefix: "LUG_",
        reserved: &RESERVED_KEYS,
    };

    /// Name of the variable holding the JSON-encoded parameters
    pub fn json_var(&self) -> String {
        format!("{}config_json", self.prefix)
    }
}

impl Default for EnvPolicy {
    fn default() -> Self {
        Self::LUG
    }
}

/// Materialize a config into environment variables
///
/// - numbers are written in decimal
/// - `true` becomes `"1"`; `false` and `null` produce no variable
/// - strings are passed verbatim
/// - arrays and objects only appear in the JSON variable
pub fn materialize(
    config: &RepoConfig,
    policy: &EnvPolicy,
) -> Result<BTreeMap<String, String>, ConversionError> {
    let mut vars = BTreeMap::new();
    let mut params = Map::new();

    for (key, value) in config {
        if policy.reserved.contains(&key.as_str()) || value.is_null() {
            continue;
        }
        params.insert(key.clone(), value.clone());

        let flat = match value {
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(true) => Some("1".to_string()),
            Value::String(s) => Some(s.clone()),
            Value::Bool(false) | Value::Null | Value::Array(_) | Value::Object(_) => None,
        };
        if let Some(flat) = flat {
            vars.insert(format!("{}{}", policy.prefix, key), flat);
        }
    }

    vars.insert(policy.json_var(), serde_json::to_string(&params)?);
    Ok(vars)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;

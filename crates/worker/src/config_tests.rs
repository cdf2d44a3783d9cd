// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use std::io::Write;

fn cfg(value: Value) -> RepoConfig {
    match value {
        Value::Object(map) => map,
        _ => unreachable!("test config must be an object"),
    }
}

#[test]
fn name_must_be_present_and_non_empty() {
    assert!(matches!(
        name(&cfg(json!({"type": "external"}))),
        Err(ConfigError::MissingField("name"))
    ));
    assert!(matches!(
        name(&cfg(json!({"name": ""}))),
        Err(ConfigError::EmptyName)
    ));
    assert!(matches!(
        name(&cfg(json!({"name": null}))),
        Err(ConfigError::MissingField("name"))
    ));
    assert_eq!(name(&cfg(json!({"name": "debian"}))).unwrap(), "debian");
}

#[test]
fn non_string_fields_are_rejected() {
    let err = worker_type(&cfg(json!({"type": 3}))).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::InvalidField {
            field: "type",
            expected: "a string"
        }
    ));
}

#[test]
fn optional_str_treats_null_as_absent() {
    let config = cfg(json!({"script": null}));
    assert_eq!(optional_str(&config, SCRIPT_KEY).unwrap(), None);
    assert_eq!(optional_str(&config, "missing").unwrap(), None);
}

#[test]
fn load_repos_converts_toml_values() {
    let repos = load_repos_str(
        r#"
[[repos]]
type = "shell_script"
name = "ubuntu"
script = "echo hi"
rlimit_mem = "512M"
retries = 3
ratio = 0.5
mirror = true
exclude = [".~tmp~", "Packages*"]

[repos.extra]
depth = 1

[[repos]]
type = "external"
name = "archlinux"
"#,
    )
    .unwrap();

    assert_eq!(repos.len(), 2);
    assert_eq!(
        Value::Object(repos[0].clone()),
        json!({
            "type": "shell_script",
            "name": "ubuntu",
            "script": "echo hi",
            "rlimit_mem": "512M",
            "retries": 3,
            "ratio": 0.5,
            "mirror": true,
            "exclude": [".~tmp~", "Packages*"],
            "extra": {"depth": 1},
        })
    );
    assert_eq!(name(&repos[1]).unwrap(), "archlinux");
}

#[test]
fn load_repos_without_repos_is_empty() {
    assert!(load_repos_str("interval = 60\n").unwrap().is_empty());
}

#[test]
fn load_repos_rejects_invalid_toml() {
    assert!(matches!(
        load_repos_str("[[repos]\nname ="),
        Err(ConfigError::Toml(_))
    ));
}

#[test]
fn load_repos_reads_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[[repos]]\ntype = \"external\"\nname = \"gentoo\"").unwrap();

    let repos = load_repos(file.path()).unwrap();
    assert_eq!(repos.len(), 1);
    assert_eq!(worker_type(&repos[0]).unwrap(), "external");
}

#[test]
fn load_repos_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_repos(&dir.path().join("nope.toml"));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

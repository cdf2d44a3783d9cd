// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use yare::parameterized;

const GIB: u64 = 1 << 30;

fn current_soft_limit() -> rlim_t {
    getrlimit(Resource::RLIMIT_AS).unwrap().0
}

#[parameterized(
    bare_bytes = { "4096", 4096 },
    kilo = { "4K", 4 * 1024 },
    mega = { "10M", 10 * 1024 * 1024 },
    giga = { "2G", 2 * GIB },
    tera = { "1T", 1 << 40 },
    lowercase = { "10m", 10 * 1024 * 1024 },
    byte_suffix = { "512MB", 512 * 1024 * 1024 },
    binary_suffix = { "512MiB", 512 * 1024 * 1024 },
    plain_b = { "100B", 100 },
    fractional = { "1.5G", 3 * GIB / 2 },
    padded = { "  8 K ", 8 * 1024 },
)]
fn parse_size_accepts(input: &str, expected: u64) {
    assert_eq!(parse_size(input).unwrap(), expected);
}

#[parameterized(
    empty = { "" },
    unit_only = { "M" },
    unknown_unit = { "10X" },
    bare_ib = { "10iB" },
    negative = { "-5M" },
    zero = { "0" },
    two_dots = { "1.2.3M" },
    overflow = { "99999999999999999999T" },
)]
fn parse_size_rejects(input: &str) {
    assert!(matches!(
        parse_size(input),
        Err(ConfigError::InvalidSize { .. })
    ));
}

#[test]
fn guard_from_config() {
    let cases = [
        (json!({}), None),
        (json!({"rlimit_mem": null}), None),
        (json!({"rlimit_mem": ""}), None),
        (json!({"rlimit_mem": "10M"}), Some(10 * 1024 * 1024)),
        (json!({"rlimit_mem": 2048}), Some(2048)),
    ];
    for (value, expected) in cases {
        let Value::Object(config) = value else {
            unreachable!()
        };
        assert_eq!(RlimitGuard::from_config(&config).unwrap().ceiling(), expected);
    }
}

#[test]
fn guard_from_config_rejects_bad_values() {
    for value in [
        json!({"rlimit_mem": "lots"}),
        json!({"rlimit_mem": true}),
        json!({"rlimit_mem": -1}),
        json!({"rlimit_mem": 0}),
    ] {
        let Value::Object(config) = value else {
            unreachable!()
        };
        assert!(RlimitGuard::from_config(&config).is_err(), "{:?}", config);
    }
}

#[test]
fn unlimited_guard_leaves_limit_alone() {
    let before = current_soft_limit();
    let seen = RlimitGuard::unlimited()
        .bracket(current_soft_limit)
        .unwrap();
    assert_eq!(seen, before);
    assert_eq!(current_soft_limit(), before);
}

#[test]
fn hooks_install_and_restore_ceiling() {
    let (_, hard) = getrlimit(Resource::RLIMIT_AS).unwrap();
    let before = current_soft_limit();
    // Large enough that the test process itself is unaffected
    let guard = RlimitGuard::with_ceiling(1 << 40);

    let scope = guard.pre_hook().unwrap();
    assert_eq!(current_soft_limit(), ((1u64 << 40) as rlim_t).min(hard));
    scope.post_hook().unwrap();

    assert_eq!(current_soft_limit(), before);
}

#[test]
fn dropping_scope_restores_ceiling() {
    let before = current_soft_limit();
    {
        let _scope = RlimitGuard::with_ceiling(1 << 41).pre_hook().unwrap();
    }
    assert_eq!(current_soft_limit(), before);
}

#[test]
fn concurrent_brackets_do_not_interleave() {
    let (_, hard) = getrlimit(Resource::RLIMIT_AS).unwrap();
    let handles: Vec<_> = (0..8u64)
        .map(|i| {
            std::thread::spawn(move || {
                let ceiling = (1u64 << 40) + i * GIB;
                let guard = RlimitGuard::with_ceiling(ceiling);
                let seen = guard
                    .bracket(|| {
                        std::thread::sleep(std::time::Duration::from_millis(5));
                        current_soft_limit()
                    })
                    .unwrap();
                (ceiling as rlim_t).min(hard) == seen
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
}

// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Coffer configuration system.

use coffer_config::diagnostic::ConfigError;
use coffer_config::model::CofferConfig;
use coffer_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

#[test]
fn full_toml_deserializes() {
    let toml = r#"
[vault]
kdf_memory_cost = 19456
kdf_iterations = 2
kdf_parallelism = 1
salt_len = 32

[storage]
database_path = "/tmp/coffer-test.db"

[log]
level = "debug"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.vault.kdf_memory_cost, 19456);
    assert_eq!(config.vault.kdf_iterations, 2);
    assert_eq!(config.vault.kdf_parallelism, 1);
    assert_eq!(config.vault.salt_len, 32);
    assert_eq!(config.storage.database_path, "/tmp/coffer-test.db");
    assert_eq!(config.log.level, "debug");
}

#[test]
fn empty_toml_uses_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.vault.kdf_memory_cost, 65536);
    assert_eq!(config.vault.kdf_iterations, 3);
    assert_eq!(config.vault.kdf_parallelism, 4);
    assert_eq!(config.vault.salt_len, 16);
    assert_eq!(config.log.level, "info");
    assert!(config.storage.database_path.ends_with("coffer.db"));
}

#[test]
fn unknown_vault_key_is_rejected_with_suggestion() {
    let toml = r#"
[vault]
salt_lne = 16
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject unknown field");
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } => {
            assert_eq!(key, "salt_lne");
            assert_eq!(suggestion.as_deref(), Some("salt_len"));
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

#[test]
fn wrong_type_is_reported() {
    let toml = r#"
[vault]
kdf_iterations = "three"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject wrong type");
    assert!(matches!(errors[0], ConfigError::InvalidType { .. }));
}

#[test]
fn semantic_validation_runs_after_parse() {
    let toml = r#"
[vault]
kdf_memory_cost = 64
"#;

    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    assert!(matches!(errors[0], ConfigError::Validation { .. }));
    assert!(errors[0].to_string().contains("kdf_memory_cost"));
}

#[test]
fn dotted_override_reaches_nested_key() {
    use figment::{providers::Serialized, Figment};

    let config: CofferConfig = Figment::new()
        .merge(Serialized::defaults(CofferConfig::default()))
        .merge(("vault.salt_len", 24))
        .extract()
        .expect("should merge override");

    assert_eq!(config.vault.salt_len, 24);
}

#[test]
#[serial_test::serial]
fn env_vars_override_file_values() {
    let dir = std::env::temp_dir().join(format!("coffer-config-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("coffer.toml");
    std::fs::write(&path, "[log]\nlevel = \"warn\"\n").unwrap();

    // SAFETY: test-only env mutation, serialized with other env tests.
    unsafe { std::env::set_var("COFFER_LOG_LEVEL", "debug") };
    unsafe { std::env::set_var("COFFER_PASSWORD", "must-not-leak") };
    let result = load_and_validate_path(&path);
    unsafe { std::env::remove_var("COFFER_LOG_LEVEL") };
    unsafe { std::env::remove_var("COFFER_PASSWORD") };
    let _ = std::fs::remove_dir_all(&dir);

    let config = result.expect("env override should be valid");
    assert_eq!(config.log.level, "debug");
}

#[test]
#[serial_test::serial]
fn missing_file_falls_back_to_defaults() {
    let config = load_and_validate_path(std::path::Path::new("/nonexistent/coffer.toml"))
        .expect("missing file is skipped");
    assert_eq!(config.vault.salt_len, 16);
}

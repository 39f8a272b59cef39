// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests driving the `coffer` binary against a temporary database.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

struct Workspace {
    dir: tempfile::TempDir,
    config: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("account.db");
        let config = dir.path().join("coffer.toml");
        std::fs::write(
            &config,
            format!(
                "[vault]\nkdf_memory_cost = 8192\nkdf_iterations = 1\nkdf_parallelism = 1\n\n\
                 [storage]\ndatabase_path = \"{}\"\n\n[log]\nlevel = \"warn\"\n",
                escape(&db)
            ),
        )
        .unwrap();
        Self { dir, config }
    }

    fn db_path(&self) -> PathBuf {
        self.dir.path().join("account.db")
    }

    fn run(&self, password: &str, group_password: &str, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_coffer"))
            .arg("--config")
            .arg(&self.config)
            .args(args)
            .env_remove("COFFER_STORAGE_DATABASE_PATH")
            .env("COFFER_PASSWORD", password)
            .env("COFFER_GROUP_PASSWORD", group_password)
            .output()
            .unwrap()
    }
}

fn escape(path: &Path) -> String {
    path.display().to_string().replace('\\', "\\\\")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn group_scoped_config_is_listed_only_after_opening_the_group() {
    let ws = Workspace::new();

    assert_success(&ws.run("hunter22", "", &["sign-up", "--username", "alice"]));
    assert_success(&ws.run(
        "hunter22",
        "finance-pw",
        &["create-group", "--username", "alice", "--name", "Finance"],
    ));
    assert_success(&ws.run(
        "hunter22",
        "",
        &[
            "add-config", "--username", "alice", "--name", "everyday", "--backend", "memory",
        ],
    ));
    assert_success(&ws.run(
        "hunter22",
        "finance-pw",
        &[
            "add-config", "--username", "alice", "--name", "bank", "--group", "Finance",
            "--backend", "memory",
        ],
    ));

    let closed = ws.run(
        "hunter22",
        "",
        &["list-configs", "--username", "alice", "--json"],
    );
    assert_success(&closed);
    let listed: serde_json::Value = serde_json::from_str(&stdout(&closed)).unwrap();
    let names: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["everyday"]);

    let open = ws.run(
        "hunter22",
        "finance-pw",
        &["list-configs", "--username", "alice", "--open-group"],
    );
    assert_success(&open);
    let text = stdout(&open);
    assert!(text.contains("everyday"));
    assert!(text.contains("bank"));
    assert!(text.contains("Finance"));
}

#[test]
fn wrong_password_exits_with_failure() {
    let ws = Workspace::new();
    assert_success(&ws.run("hunter22", "", &["sign-up", "--username", "bob"]));

    let output = ws.run("not-it", "", &["list-configs", "--username", "bob"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("sign-in failed"));
}

#[test]
fn failed_sign_in_still_closes_account_database() {
    let ws = Workspace::new();
    assert_success(&ws.run("hunter22", "", &["sign-up", "--username", "frank"]));

    let output = ws.run("not-it", "", &["list-configs", "--username", "frank"]);
    assert_eq!(output.status.code(), Some(1));

    let wal = ws.dir.path().join("account.db-wal");
    assert!(!wal.exists(), "write-ahead log left behind after a failed command");
}

#[test]
fn failed_group_open_still_closes_account_database() {
    let ws = Workspace::new();
    assert_success(&ws.run("hunter22", "", &["sign-up", "--username", "gina"]));
    assert_success(&ws.run(
        "hunter22",
        "right-pw",
        &["create-group", "--username", "gina", "--name", "Home"],
    ));

    let output = ws.run(
        "hunter22",
        "wrong-pw",
        &[
            "add-config", "--username", "gina", "--name", "nas", "--group", "Home",
            "--backend", "memory",
        ],
    );
    assert_eq!(output.status.code(), Some(1));
    assert!(!ws.dir.path().join("account.db-wal").exists());
}

#[test]
fn wrong_group_password_rejects_grouped_config() {
    let ws = Workspace::new();
    assert_success(&ws.run("hunter22", "", &["sign-up", "--username", "carol"]));
    assert_success(&ws.run(
        "hunter22",
        "right-pw",
        &["create-group", "--username", "carol", "--name", "Work"],
    ));

    let output = ws.run(
        "hunter22",
        "wrong-pw",
        &[
            "add-config", "--username", "carol", "--name", "laptop", "--group", "Work",
            "--backend", "memory",
        ],
    );
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn duplicate_sign_up_fails() {
    let ws = Workspace::new();
    assert_success(&ws.run("hunter22", "", &["sign-up", "--username", "dave"]));
    let output = ws.run("hunter22", "", &["sign-up", "--username", "dave"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn status_reports_user_count() {
    let ws = Workspace::new();

    let before = ws.run("", "", &["status", "--json"]);
    assert_success(&before);
    let status: serde_json::Value = serde_json::from_str(&stdout(&before)).unwrap();
    assert_eq!(status["database_exists"], false);
    assert!(!ws.db_path().exists());

    assert_success(&ws.run("hunter22", "", &["sign-up", "--username", "erin"]));

    let after = ws.run("", "", &["status", "--json"]);
    assert_success(&after);
    let status: serde_json::Value = serde_json::from_str(&stdout(&after)).unwrap();
    assert_eq!(status["database_exists"], true);
    assert_eq!(status["users"], 1);
    assert_eq!(status["kdf_memory_cost"], 8192);
}

#[test]
fn invalid_config_exits_with_failure() {
    let ws = Workspace::new();
    std::fs::write(&ws.config, "[vault]\nsalt_len = 4\n").unwrap();
    let output = ws.run("", "", &["status"]);
    assert_eq!(output.status.code(), Some(1));
}

// crates/cmdstash-cli/tests/cli.rs - End-to-end tests of the cmdstash binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

/// Isolated environment: its own HOME, config dir and store
struct Sandbox {
    temp: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            temp: TempDir::new().unwrap(),
        }
    }

    fn store(&self) -> PathBuf {
        self.temp.path().join("data").join("snippets.toml")
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("cmdstash").unwrap();
        cmd.env("HOME", self.temp.path())
            .env("XDG_CONFIG_HOME", self.temp.path().join("config"))
            .env("CMDSTASH_ALIAS_FILE", self.temp.path().join("aliases.sh"))
            .env("CMDSTASH_SHELL", "/bin/sh")
            .env_remove("CMDSTASH_CONFIG")
            .env_remove("CMDSTASH_STORE")
            .env_remove("CMDSTASH_REMOTE")
            .env_remove("CMDSTASH_LOG")
            .arg("--store")
            .arg(self.store());
        cmd
    }

    fn add(&self, args: &[&str]) -> String {
        self.cmd().arg("new").args(args).assert().success();
        self.ids().pop().unwrap()
    }

    fn ids(&self) -> Vec<String> {
        let output = self.cmd().args(["list", "--json"]).output().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["id"].as_str().unwrap().to_string())
            .collect()
    }
}

#[test]
fn test_new_then_list_json() {
    let sb = Sandbox::new();
    sb.add(&[
        "docker run -p {port=8080}:80 {image}",
        "-d",
        "Run a container",
        "-t",
        "docker",
    ]);

    sb.cmd()
        .args(["list", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"command\": \"docker run -p {port=8080}:80 {image}\""))
        .stdout(predicate::str::contains("\"name\": \"image\""));
    assert!(sb.store().exists());
}

#[test]
fn test_new_reads_command_from_stdin() {
    let sb = Sandbox::new();
    sb.cmd()
        .arg("new")
        .write_stdin("uptime\n")
        .assert()
        .success();
    sb.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("uptime"));
}

#[test]
fn test_exec_dry_run_resolves_values() {
    let sb = Sandbox::new();
    let id = sb.add(&["docker run -p {port=8080}:80 {image}"]);

    sb.cmd()
        .args(["exec", &id, "--dry-run", "-P", "image=nginx"])
        .assert()
        .success()
        .stdout("docker run -p 8080:80 nginx\n");

    // bare trailing values fill parameters in order
    sb.cmd()
        .args(["exec", &id, "--dry-run", "9000", "redis"])
        .assert()
        .success()
        .stdout("docker run -p 9000:80 redis\n");
}

#[test]
fn test_exec_missing_parameter_fails_without_terminal() {
    let sb = Sandbox::new();
    let id = sb.add(&["ssh {user}@{host}"]);

    sb.cmd()
        .args(["exec", &id, "--dry-run", "user=root"])
        .write_stdin("")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("host"));
}

#[cfg(unix)]
#[test]
fn test_exec_runs_through_shell() {
    let sb = Sandbox::new();
    sb.add(&["echo hello-{name}", "-a", "hi"]);

    sb.cmd()
        .args(["exec", "hi", "--yes", "world"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hello-world"));
}

#[cfg(unix)]
#[test]
fn test_exec_forwards_command_exit_status() {
    let sb = Sandbox::new();
    let id = sb.add(&["exit {code=7}"]);

    sb.cmd()
        .args(["exec", &id, "--yes"])
        .assert()
        .code(7)
        .stderr(predicate::str::contains("exit code 7"));
}

#[test]
fn test_exec_refuses_unconfirmed_without_terminal() {
    let sb = Sandbox::new();
    let id = sb.add(&["echo hi"]);

    sb.cmd()
        .args(["exec", &id])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--yes"));
}

#[test]
fn test_show_unknown_id_is_not_found() {
    let sb = Sandbox::new();
    sb.cmd()
        .args(["show", "does-not-exist"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_corrupt_store_is_reported_and_kept() {
    let sb = Sandbox::new();
    std::fs::create_dir_all(sb.store().parent().unwrap()).unwrap();
    std::fs::write(sb.store(), "[snippets\nbroken").unwrap();

    sb.cmd().arg("list").assert().code(4);
    assert_eq!(std::fs::read_to_string(sb.store()).unwrap(), "[snippets\nbroken");
}

#[test]
fn test_invalid_template_is_rejected() {
    let sb = Sandbox::new();
    sb.cmd().args(["new", "echo {unclosed"]).assert().code(2);
    sb.cmd()
        .args(["new", "echo {x}", "-p", "y=1"])
        .assert()
        .code(2);
    assert!(!sb.store().exists());
}

#[test]
fn test_search_edit_param_delete() {
    let sb = Sandbox::new();
    let id = sb.add(&["ping -c 3 {host}", "-d", "Ping a host", "-t", "net"]);
    sb.add(&["df -h", "-t", "disk"]);

    sb.cmd()
        .args(["search", "PING", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(&id));

    sb.cmd()
        .args(["edit", &id, "--command", "ping -c {count} {host}"])
        .assert()
        .success();
    sb.cmd()
        .args(["param", &id, "count", "--default", "5", "--description", "Packets"])
        .assert()
        .success();
    sb.cmd()
        .args(["show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("count = 5"))
        .stdout(predicate::str::contains("Packets"));

    // unique id prefix works
    sb.cmd()
        .args(["exec", &id[..18], "--dry-run", "host=example.com"])
        .assert()
        .success()
        .stdout("ping -c 5 example.com\n");

    sb.cmd().args(["delete", &id, "--yes"]).assert().success();
    assert_eq!(sb.ids().len(), 1);
    sb.cmd().args(["delete", &id, "--yes"]).assert().code(3);
}

#[test]
fn test_edit_without_changes_fails() {
    let sb = Sandbox::new();
    let id = sb.add(&["ls"]);
    sb.cmd().args(["edit", &id]).assert().failure();
}

#[test]
fn test_alias_file_and_print() {
    let sb = Sandbox::new();
    sb.add(&["git status", "-a", "gst"]);
    sb.add(&["ssh {host}", "-a", "go"]);

    let alias_file = sb.temp.path().join("aliases.sh");
    let script = std::fs::read_to_string(&alias_file).unwrap();
    assert!(script.contains("alias gst='git status'"));
    assert!(script.contains("go() {"));

    sb.cmd()
        .args(["alias", "--print"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cmdstash exec"));

    // aliases must be unique
    sb.cmd().args(["new", "git log", "-a", "gst"]).assert().code(2);
}

#[test]
fn test_config_default_and_effective() {
    let sb = Sandbox::new();
    sb.cmd()
        .args(["config", "--default"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[sync]"))
        .stdout(predicate::str::contains("timeout_secs = 30"));

    sb.cmd()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("branch = \"main\""));
}

#[test]
fn test_sync_without_repository_fails() {
    let sb = Sandbox::new();
    sb.add(&["ls"]);
    sb.cmd()
        .arg("sync")
        .assert()
        .code(5)
        .stderr(predicate::str::contains("sync-init"));
}

//! Smoke tests -- verify the binary runs and each subcommand wires up.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Write a config that keeps all state inside `dir` and never touches docker.
fn write_config(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("fleetmedic.toml");
    let config = format!(
        r#"
[storage]
db_path = "{db}"

[containers]
enabled = false

[logging]
level = "warn"
audit_log_path = "{audit}"

[baselines]
error_rate = [0.0, 0.02]
cpu_load = [35.0, 45.0]
"#,
        db = dir.path().join("fleetmedic.db").display(),
        audit = dir.path().join("audit.jsonl").display(),
    );
    std::fs::write(&path, config).unwrap();
    path
}

fn fleetmedic(config: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("fleetmedic").unwrap();
    cmd.arg("--config").arg(config);
    cmd
}

#[test]
fn test_cli_help() {
    Command::cargo_bin("fleetmedic")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Self-healing control core"));
}

#[test]
fn test_cli_version() {
    Command::cargo_bin("fleetmedic")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("fleetmedic"));
}

#[test]
fn test_strategies_json() {
    Command::cargo_bin("fleetmedic")
        .unwrap()
        .args(["strategies", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("restart_unhealthy"))
        .stdout(predicate::str::contains("docker.recycle"));
}

#[test]
fn test_strategies_table() {
    Command::cargo_bin("fleetmedic")
        .unwrap()
        .arg("strategies")
        .assert()
        .success()
        .stdout(predicate::str::contains("throttle_traffic"))
        .stdout(predicate::str::contains("rate_limit"));
}

#[test]
fn test_analyze_uses_configured_baselines() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);

    fleetmedic(&config)
        .args([
            "analyze",
            "--metrics",
            r#"{"error_rate": 0.3, "cpu_load": 95}"#,
            "--context",
            r#"{"services": ["svc-a"], "user": "smoke"}"#,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"degradation\""))
        .stdout(predicate::str::contains("svc-a"));

    let audit = std::fs::read_to_string(dir.path().join("audit.jsonl")).unwrap();
    assert!(audit.contains("self_healing.analyze"));
    assert!(audit.contains("\"actor\":\"smoke\""));
}

#[test]
fn test_analyze_rejects_bad_metrics() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);

    fleetmedic(&config)
        .args(["analyze", "--metrics", "[1, 2]"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid --metrics JSON"));
}

#[test]
fn test_heal_defaults_to_dry_run_and_records_attempt() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);

    fleetmedic(&config)
        .args(["heal", "--strategy", "scale_service"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"dry_run\": true"))
        .stdout(predicate::str::contains("\"persisted\": true"));

    fleetmedic(&config)
        .arg("attempts")
        .assert()
        .success()
        .stdout(predicate::str::contains("scale_service"));
}

#[test]
fn test_heal_without_candidates() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);

    fleetmedic(&config)
        .args(["heal", "--apply"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no_strategy"));

    fleetmedic(&config)
        .arg("attempts")
        .assert()
        .success()
        .stdout(predicate::str::contains("No healing attempts recorded."));
}

#[test]
fn test_replay_learns_across_steps() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);
    let script = dir.path().join("script.jsonl");
    std::fs::write(
        &script,
        r#"# fail once, then succeed
{"op": "heal", "strategy": "purge_stuck", "dry_run": true}
{"op": "heal", "strategy": "purge_stuck", "dry_run": false}
"#,
    )
    .unwrap();

    fleetmedic(&config)
        .arg("replay")
        .arg("--file")
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::contains("queue.purge"))
        .stdout(predicate::str::contains("\"successes\": 1"))
        .stdout(predicate::str::contains("\"attempts\": 2"));
}

#[test]
fn test_missing_config_is_an_error() {
    Command::cargo_bin("fleetmedic")
        .unwrap()
        .args(["--config", "/nonexistent/fleetmedic.toml", "attempts"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read config file"));
}

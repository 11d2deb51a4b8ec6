#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// exp = 1 (1970) and exp = 4102444800 (2100-01-01)
const EXPIRED_TOKEN: &str = "eyJhbGciOiJIUzI1NiJ9.eyJleHAiOjF9.sig";
const FAR_FUTURE_TOKEN: &str = "eyJhbGciOiJIUzI1NiJ9.eyJleHAiOjQxMDI0NDQ4MDB9.sig";

fn okr(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("okr").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("OKR_TOKEN")
        .env_remove("OKR_API_URL")
        .env_remove("OKR_DATA")
        .env("OKR_CONFIG", dir.path().join("okr.yaml"));
    cmd
}

fn add_objective(dir: &TempDir, title: &str) -> String {
    let output = okr(dir)
        .args(["--local", "--json", "objective", "add", "--title", title])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    value["id"].as_str().unwrap().to_string()
}

// ---------------------------------------------------------------------------
// okr demo
// ---------------------------------------------------------------------------

#[test]
fn demo_drops_the_double_submitted_update() {
    let dir = TempDir::new().unwrap();
    okr(&dir)
        .arg("demo")
        .assert()
        .success()
        .stdout(predicate::str::contains("first completed, second dropped"))
        .stdout(predicate::str::contains("completed"))
        .stdout(predicate::str::contains("Grow revenue"))
        .stderr(predicate::str::contains("Atividade atualizada com sucesso"));
}

// ---------------------------------------------------------------------------
// okr objective / activity (--local)
// ---------------------------------------------------------------------------

#[test]
fn objective_add_persists_to_local_data_file() {
    let dir = TempDir::new().unwrap();
    okr(&dir)
        .args(["--local", "objective", "add", "--title", "Grow revenue"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created objective"))
        .stderr(predicate::str::contains("Objetivo criado com sucesso"));

    assert!(dir.path().join("okr-data.yaml").exists());
    okr(&dir)
        .args(["--local", "objective", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Grow revenue"));
}

#[test]
fn activity_progress_rolls_up_to_objective() {
    let dir = TempDir::new().unwrap();
    let id = add_objective(&dir, "Ship v2");

    okr(&dir)
        .args(["--local", "activity", "add", &id, "--title", "Beta", "--progress", "30"])
        .assert()
        .success();
    okr(&dir)
        .args(["--local", "activity", "add", &id, "--title", "GA", "--progress", "70", "--status", "in-progress"])
        .assert()
        .success();

    let output = okr(&dir)
        .args(["--local", "--json", "objective", "list"])
        .output()
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value[0]["progress"], 50);
    assert_eq!(value[0]["activities"][1]["status"], "In Progress");
}

#[test]
fn activity_add_to_missing_objective_fails() {
    let dir = TempDir::new().unwrap();
    okr(&dir)
        .args(["--local", "activity", "add", "missing", "--title", "Orphan"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("add activity failed"))
        .stderr(predicate::str::contains("objective not found: missing"));
}

#[test]
fn activity_progress_over_100_is_rejected() {
    let dir = TempDir::new().unwrap();
    let id = add_objective(&dir, "Ship v2");
    okr(&dir)
        .args(["--local", "activity", "add", &id, "--title", "Beta", "--progress", "150"])
        .assert()
        .failure();
}

#[test]
fn objective_delete_unknown_fails() {
    let dir = TempDir::new().unwrap();
    okr(&dir)
        .args(["--local", "objective", "delete", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("delete objective failed"));
}

// ---------------------------------------------------------------------------
// okr token check
// ---------------------------------------------------------------------------

#[test]
fn token_check_rejects_expired_token() {
    let dir = TempDir::new().unwrap();
    okr(&dir)
        .args(["token", "check", "--token", EXPIRED_TOKEN])
        .assert()
        .failure()
        .stdout(predicate::str::contains("expired"))
        .stderr(predicate::str::contains("Sessão expirada"));
}

#[test]
fn token_check_accepts_valid_token() {
    let dir = TempDir::new().unwrap();
    okr(&dir)
        .args(["--json", "token", "check", "--token", FAR_FUTURE_TOKEN])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""status": "valid""#))
        .stdout(predicate::str::contains("4102444800"));
}

#[test]
fn token_check_without_token_fails() {
    let dir = TempDir::new().unwrap();
    okr(&dir)
        .args(["token", "check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no session token"));
}

// ---------------------------------------------------------------------------
// okr config
// ---------------------------------------------------------------------------

#[test]
fn config_init_then_validate() {
    let dir = TempDir::new().unwrap();
    okr(&dir).args(["config", "init"]).assert().success();
    assert!(dir.path().join("okr.yaml").exists());

    okr(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid"));

    okr(&dir).args(["config", "init"]).assert().failure();
}

#[test]
fn config_validate_flags_zero_safety_timeout() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("okr.yaml"),
        "coordinator:\n  safety_timeout_ms: 0\n",
    )
    .unwrap();

    okr(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[error]"));
}

#[test]
fn config_show_applies_flag_overrides() {
    let dir = TempDir::new().unwrap();
    okr(&dir)
        .args(["--api-url", "http://okr.test/api", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("http://okr.test/api"));
}

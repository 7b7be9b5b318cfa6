// Binary-level checks of the command line surface

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn tracker(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("histopath-tracker").unwrap();
    cmd.current_dir(dir.path())
        .env("HISTOPATH__OBSERVABILITY__JSON_LOGS", "false")
        .env("HISTOPATH__OBSERVABILITY__LOG_LEVEL", "warn")
        .env(
            "HISTOPATH__DATABASE__URL",
            format!("sqlite://{}", dir.path().join("tracker.db").display()),
        );
    cmd
}

#[test]
fn test_no_arguments_shows_usage() {
    let dir = TempDir::new().unwrap();
    tracker(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("HistoPath Tracker"))
        .stdout(predicate::str::contains("histopath-tracker serve"));
}

#[test]
fn test_help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    tracker(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("register"))
        .stdout(predicate::str::contains("advance"))
        .stdout(predicate::str::contains("stages"));
}

#[test]
fn test_stages_prints_catalog() {
    let dir = TempDir::new().unwrap();
    tracker(&dir)
        .arg("stages")
        .assert()
        .success()
        .stdout(predicate::str::contains("Reporting"))
        .stdout(predicate::str::contains("Grossing/Tissue Selection"))
        .stdout(predicate::str::contains("pathologist"));
}

#[test]
fn test_unknown_role_is_rejected_by_parser() {
    let dir = TempDir::new().unwrap();
    tracker(&dir)
        .args([
            "register",
            "--actor-id",
            "x",
            "--actor-role",
            "janitor",
            "--patient-name",
            "A",
            "--patient-id",
            "P",
            "--specimen-type",
            "Biopsy",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("janitor"));
}

#[test]
fn test_registered_specimen_survives_between_runs() {
    let dir = TempDir::new().unwrap();
    tracker(&dir)
        .args([
            "register",
            "--actor-id",
            "rec-1",
            "--actor-role",
            "receptionist",
            "--patient-name",
            "Amina Bello",
            "--patient-id",
            "LAU-1",
            "--specimen-type",
            "Biopsy",
            "--priority",
            "stat",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Specimen registered"));

    tracker(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Amina Bello"))
        .stdout(predicate::str::contains("1 specimen(s)"));

    tracker(&dir)
        .args(["search", "nobody"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No specimens found"));
}

#[test]
fn test_init_config_refuses_to_overwrite() {
    let dir = TempDir::new().unwrap();
    tracker(&dir).arg("init-config").assert().success();
    assert!(dir.path().join("histopath-tracker.toml").exists());

    tracker(&dir).arg("init-config").assert().failure();
    tracker(&dir).args(["init-config", "--force"]).assert().success();
}

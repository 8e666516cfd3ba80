//! CLI integration tests using assert_cmd.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Runs the binary inside `dir` with no user config or sink override in reach.
fn arvtrain(dir: &Path) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("arvtrain").unwrap();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env_remove("ARVTRAIN_SINK_URL")
        .env_remove("RUST_LOG");
    cmd
}

/// A workspace with five identical Memphis houses and a config pointing at it.
fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    let properties: Vec<serde_json::Value> = (0..5)
        .map(|i| {
            serde_json::json!({
                "id": format!("tn-{i}"),
                "displayAddress": format!("{} Poplar Ave, Memphis, TN", 100 + i),
                "usState": "TN",
                "beds": 3,
                "baths": 2,
                "salePrice": 120000,
                "estimatedArv": 200000,
                "estimatedRenovation": 40000
            })
        })
        .collect();
    std::fs::write(
        dir.path().join("properties.json"),
        serde_json::to_string(&properties).unwrap(),
    )
    .unwrap();

    let config = format!(
        r#"data_source = {{ type = "file", path = "{root}/properties.json" }}
progress_dir = "{root}/progress"
history_path = "{root}/progress/history.json"

[sink]
type = "jsonl"
path = "{root}/progress/results.jsonl"
"#,
        root = dir.path().display()
    );
    std::fs::write(dir.path().join("arvtrain.toml"), config).unwrap();
    dir
}

const EXACT_ANSWERS: &str = "200000\n40000\n$200,000\n40,000\n200000\n40000\n200000\n40000\n200000\n40000\n";

fn train_first_unit(dir: &Path) {
    arvtrain(dir)
        .args(["train", "--trainee", "Ann@Example.com", "--seed", "7"])
        .write_stdin(EXACT_ANSWERS)
        .assert()
        .success()
        .stdout(predicate::str::contains("unit 1: First Looks"))
        .stdout(predicate::str::contains("PASSED First Looks"));
}

#[test]
fn score_grades_an_estimate() {
    let dir = TempDir::new().unwrap();
    arvtrain(dir.path())
        .args(["score", "--estimate", "$350,000", "--actual", "340000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ARV: 2.9% off, grade A"));
}

#[test]
fn score_with_renovation_adds_composite() {
    let dir = TempDir::new().unwrap();
    arvtrain(dir.path())
        .args([
            "score",
            "--estimate",
            "156000",
            "--actual",
            "150000",
            "--reno-estimate",
            "30000",
            "--reno-actual",
            "40000",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Renovation: 25.0% off, grade D"))
        .stdout(predicate::str::contains("Overall: B"));
}

#[test]
fn score_rejects_garbage() {
    let dir = TempDir::new().unwrap();
    arvtrain(dir.path())
        .args(["score", "--estimate", "lots", "--actual", "340000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn distractors_lists_five_options() {
    let dir = TempDir::new().unwrap();
    arvtrain(dir.path())
        .args(["distractors", "--value", "287,000", "--seed", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("$285,000"))
        .stdout(predicate::str::contains("$230,000"))
        .stdout(predicate::str::contains("$345,000"))
        .stdout(predicate::str::contains("Correct answer:"));
}

#[test]
fn validate_builtin_catalog() {
    let dir = TempDir::new().unwrap();
    arvtrain(dir.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("ARV Valuation (10 units)"))
        .stdout(predicate::str::contains("Comp Selection (3 units, requires valuation)"))
        .stdout(predicate::str::contains("All curricula valid"));
}

#[test]
fn validate_reports_warnings() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(
        &path,
        r#"
[[curricula]]
id = "loop"
name = "Loop"
requires = "loop"

[[curricula.units]]
name = "Empty"
kind = "quiz"
questions = 0
pass_fraction = 0.5
"#,
    )
    .unwrap();

    arvtrain(dir.path())
        .arg("validate")
        .arg("--curricula")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("requires itself"))
        .stdout(predicate::str::contains("warning(s) found"));
}

#[test]
fn validate_nonexistent_file() {
    let dir = TempDir::new().unwrap();
    arvtrain(dir.path())
        .args(["validate", "--curricula", "nonexistent.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    arvtrain(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created arvtrain.toml"))
        .stdout(predicate::str::contains("Created curricula/default.toml"));

    assert!(dir.path().join("arvtrain.toml").exists());
    assert!(dir.path().join("curricula/default.toml").exists());

    // The generated files are usable as-is.
    arvtrain(dir.path())
        .args(["validate", "--curricula", "curricula"])
        .assert()
        .success()
        .stdout(predicate::str::contains("All curricula valid"));
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();
    arvtrain(dir.path()).arg("init").assert().success();
    arvtrain(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn missing_explicit_config_fails() {
    let dir = TempDir::new().unwrap();
    arvtrain(dir.path())
        .args(["--config", "nope.toml", "progress", "--trainee", "ann@example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn progress_starts_with_first_unit_open() {
    let dir = workspace();
    arvtrain(dir.path())
        .args(["progress", "--trainee", "ann@example.com"])
        .assert()
        .success()
        .stdout(predicate::str::contains("First Looks"))
        .stdout(predicate::str::contains("open"))
        .stdout(predicate::str::contains("requires valuation"));
}

#[test]
fn train_requires_a_trainee() {
    let dir = workspace();
    arvtrain(dir.path())
        .arg("train")
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no trainee given"));
}

#[test]
fn train_passes_first_unit_and_records_it() {
    let dir = workspace();
    train_first_unit(dir.path());

    let progress = dir.path().join("progress/ann%40example.com.json");
    assert!(progress.exists());
    let results = std::fs::read_to_string(dir.path().join("progress/results.jsonl")).unwrap();
    assert_eq!(results.lines().count(), 1);
    assert!(results.contains("\"trainee\":\"ann@example.com\""));

    arvtrain(dir.path())
        .args(["progress", "--trainee", "ann@example.com"])
        .assert()
        .success()
        .stdout(predicate::str::contains("done"));

    arvtrain(dir.path())
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 session(s) on record"));
}

#[test]
fn train_stops_on_quit() {
    let dir = workspace();
    arvtrain(dir.path())
        .args(["train", "--trainee", "ann@example.com", "--seed", "1"])
        .write_stdin("q\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("No answers given"));
    assert!(!dir.path().join("progress/ann%40example.com.json").exists());
}

#[test]
fn partial_attempt_does_not_pass() {
    let dir = workspace();
    arvtrain(dir.path())
        .args(["train", "--trainee", "ann@example.com", "--seed", "1"])
        .write_stdin("200000\n40000\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not passed First Looks"));
    assert!(!dir.path().join("progress/ann%40example.com.json").exists());
}

#[test]
fn invalid_estimates_are_reasked() {
    let dir = workspace();
    let input = format!("abc\n0\n{EXACT_ANSWERS}");
    arvtrain(dir.path())
        .args(["train", "--trainee", "ann@example.com", "--seed", "2"])
        .write_stdin(input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Enter a positive dollar amount"))
        .stdout(predicate::str::contains("PASSED First Looks"));
}

#[test]
fn locked_unit_is_refused() {
    let dir = workspace();
    arvtrain(dir.path())
        .args(["train", "--trainee", "ann@example.com", "--unit", "3"])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("locked"));

    arvtrain(dir.path())
        .args(["train", "--trainee", "ann@example.com", "--curriculum", "sales"])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("locked until valuation is certified"));
}

#[test]
fn short_data_set_fails_before_questions() {
    let dir = workspace();
    arvtrain(dir.path())
        .args([
            "train",
            "--trainee",
            "ann@example.com",
            "--region",
            "GA",
        ])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("insufficient"));
}

#[test]
fn reset_requires_certification() {
    let dir = workspace();
    arvtrain(dir.path())
        .args(["reset", "--trainee", "ann@example.com", "--curriculum", "valuation"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not certified"));
}

#[test]
fn unknown_curriculum_fails() {
    let dir = workspace();
    arvtrain(dir.path())
        .args(["train", "--trainee", "ann@example.com", "--curriculum", "flipping"])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("flipping"));
}

#[test]
fn leaderboard_ranks_logged_results() {
    let dir = workspace();
    train_first_unit(dir.path());

    arvtrain(dir.path())
        .arg("leaderboard")
        .assert()
        .success()
        .stdout(predicate::str::contains("No qualifying results"));

    arvtrain(dir.path())
        .args(["leaderboard", "--min-questions", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ann@example.com"))
        .stdout(predicate::str::contains("0.0%"));
}

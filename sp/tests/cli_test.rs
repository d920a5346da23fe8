//! Tests for the `sp` binary

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use chrono::Utc;
use predicates::prelude::*;
use studyplan::artifacts::{ArtifactKind, DebugArtifactStore};
use studyplan::domain::{ExamStatus, GenerationRequest, SkillLevel, SubjectAnswer, SurveyAnswers};
use studyplan::state::{FileSnapshotStore, SnapshotStore};
use tempfile::TempDir;

struct Env {
    temp: TempDir,
    config: PathBuf,
}

impl Env {
    fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let root = temp.path();
        let config = root.join("studyplan.yml");
        std::fs::write(
            &config,
            format!(
                "log-level: debug\n\
                 llm:\n  api-key-env: STUDYPLAN_CLI_TEST_KEY_UNSET\n\
                 artifacts:\n  dir: {}\n\
                 storage:\n  db-path: {}\n  session-dir: {}\n",
                root.join("debug").display(),
                root.join("plans.db").display(),
                root.join("sessions").display(),
            ),
        )
        .expect("Failed to write config");
        Self { temp, config }
    }

    fn root(&self) -> &Path {
        self.temp.path()
    }

    fn sp(&self) -> Command {
        let mut cmd = Command::cargo_bin("sp").expect("Failed to find sp binary");
        cmd.env("XDG_DATA_HOME", self.root().join("data"))
            .env("XDG_CONFIG_HOME", self.root().join("config"))
            .env("NO_COLOR", "1")
            .env_remove("STUDYPLAN_CLI_TEST_KEY_UNSET")
            .arg("--config")
            .arg(&self.config);
        cmd
    }

    fn artifacts(&self) -> DebugArtifactStore {
        DebugArtifactStore::open_dir(self.root().join("debug")).expect("Failed to open artifacts")
    }
}

fn survey() -> SurveyAnswers {
    SurveyAnswers {
        exam_level: "advanced".to_string(),
        exam_status: ExamStatus::FirstAttempt,
        subjects: vec![SubjectAnswer::included("Mathematics", SkillLevel::Advanced)],
        weekly_hours: 12,
        daily_hours: 3,
        plan_days: 14,
        notes: None,
    }
}

#[test]
fn test_status_of_fresh_session_is_idle() {
    let env = Env::new();
    env.sp()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"idle\""))
        .stdout(predicate::str::contains("\"progress\": 0"));
}

#[test]
fn test_status_reports_persisted_snapshot() {
    let env = Env::new();
    let mut request = GenerationRequest::begin(survey(), Utc::now());
    request.progress = 37;
    FileSnapshotStore::for_session(env.root().join("sessions"), "exam")
        .unwrap()
        .save(&request)
        .unwrap();

    env.sp()
        .args(["status", "--session", "exam"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"generating\""))
        .stdout(predicate::str::contains("\"progress\": 37"));

    env.sp().args(["reset", "--session", "exam"]).assert().success();
    env.sp()
        .args(["status", "--session", "exam"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"idle\""));
}

#[test]
fn test_artifacts_list_cat_rm() {
    let env = Env::new();
    let name = env.artifacts().write(ArtifactKind::Prompt, b"the prompt text").unwrap();

    env.sp()
        .args(["artifacts", "list", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("\"name\":\"{name}\"")))
        .stdout(predicate::str::contains("\"type\":\"prompt\""))
        .stdout(predicate::str::contains("\"size\":15"));

    env.sp()
        .args(["artifacts", "cat", &name])
        .assert()
        .success()
        .stdout("the prompt text");

    env.sp().args(["artifacts", "rm", &name]).assert().success();
    assert!(env.artifacts().list().unwrap().is_empty());

    env.sp()
        .args(["artifacts", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No debug artifacts"));
}

#[test]
fn test_artifacts_reject_path_traversal() {
    let env = Env::new();
    std::fs::write(env.root().join("secret.txt"), "do not read").unwrap();

    env.sp()
        .args(["artifacts", "cat", "../secret.txt"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("do not read").not());

    env.sp().args(["artifacts", "rm", "../secret.txt"]).assert().failure();
    assert!(env.root().join("secret.txt").exists());
}

#[test]
fn test_generate_without_api_key_fails_cleanly() {
    let env = Env::new();
    let survey_path = env.root().join("survey.yml");
    std::fs::write(&survey_path, serde_yaml::to_string(&survey()).unwrap()).unwrap();

    env.sp()
        .args(["generate", "--survey"])
        .arg(&survey_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to create LLM client"));
}

#[test]
fn test_generate_rejects_missing_survey_file() {
    let env = Env::new();
    env.sp()
        .args(["generate", "--survey", "/nonexistent/survey.yml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read survey"));
}

#[test]
fn test_plan_show_unknown_id() {
    let env = Env::new();
    env.sp()
        .args(["plan", "show", "0190f0f0-0000-7000-8000-000000000000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Plan not found"));
}

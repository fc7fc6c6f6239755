#![allow(dead_code)]

use assert_cmd::Command;
use serde_json::Value;
use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime};
use tempfile::TempDir;

#[derive(Debug)]
pub struct TmetaRun {
    pub stdout: String,
    pub stderr: String,
    pub status: std::process::ExitStatus,
    pub duration: Duration,
    pub log_path: PathBuf,
}

impl TmetaRun {
    pub fn json(&self) -> Value {
        serde_json::from_str(&extract_json_payload(&self.stdout))
            .unwrap_or_else(|e| panic!("invalid json ({e}): {}", self.stdout))
    }

    pub fn error_json(&self) -> Value {
        serde_json::from_str(&extract_json_payload(&self.stderr))
            .unwrap_or_else(|e| panic!("invalid error json ({e}): {}", self.stderr))
    }
}

pub struct TmetaWorkspace {
    pub temp_dir: TempDir,
    pub root: PathBuf,
    pub log_dir: PathBuf,
}

impl TmetaWorkspace {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir");
        let root = temp_dir.path().to_path_buf();
        let log_dir = root.join("logs");
        fs::create_dir_all(&log_dir).expect("log dir");
        Self {
            temp_dir,
            root,
            log_dir,
        }
    }

    /// Initialized workspace with an `owner` account acting by default.
    pub fn initialized() -> Self {
        let workspace = Self::new();
        let init = run_tmeta(&workspace, ["init"], "init");
        assert!(init.status.success(), "init failed: {}", init.stderr);
        let user = run_tmeta(&workspace, ["user", "add", "owner"], "user_owner");
        assert!(user.status.success(), "user add failed: {}", user.stderr);
        workspace
    }
}

pub fn run_tmeta<I, S>(workspace: &TmetaWorkspace, args: I, label: &str) -> TmetaRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    run_tmeta_with_env(
        workspace,
        args,
        std::iter::empty::<(String, String)>(),
        label,
    )
}

pub fn run_tmeta_with_env<I, S, E, K, V>(
    workspace: &TmetaWorkspace,
    args: I,
    env_vars: E,
    label: &str,
) -> TmetaRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
    E: IntoIterator<Item = (K, V)>,
    K: AsRef<OsStr>,
    V: AsRef<OsStr>,
{
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("tmeta"));
    cmd.current_dir(&workspace.root);
    cmd.env_remove("TRACKER_DIR");
    cmd.env_remove("TRACKER_ACTOR");
    cmd.env_remove("TRACKER_PINS_MAX_PER_CONTAINER");
    cmd.env("USER", "owner");
    cmd.env("NO_COLOR", "1");
    cmd.env("RUST_LOG", "tracker_meta=debug");
    cmd.env("HOME", &workspace.root);
    cmd.args(args);
    cmd.envs(env_vars);

    let start = Instant::now();
    let output = cmd.output().expect("run tmeta");
    let duration = start.elapsed();

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let log_path = workspace.log_dir.join(format!("{label}.log"));
    let log_body = format!(
        "label: {label}\nstarted: {:?}\nduration: {:?}\nstatus: {}\nargs: {:?}\ncwd: {}\n\nstdout:\n{}\n\nstderr:\n{}\n",
        SystemTime::now(),
        duration,
        output.status,
        cmd.get_args().collect::<Vec<_>>(),
        workspace.root.display(),
        stdout,
        stderr
    );
    fs::write(&log_path, log_body).expect("write log");

    TmetaRun {
        stdout,
        stderr,
        status: output.status,
        duration,
        log_path,
    }
}

/// Strip log lines preceding a JSON document.
pub fn extract_json_payload(output: &str) -> String {
    let lines: Vec<&str> = output.lines().collect();
    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') || trimmed.starts_with('{') {
            return lines[idx..].join("\n").trim().to_string();
        }
    }
    output.trim().to_string()
}

/// Run a command with `--json`, assert success and parse stdout.
pub fn run_json(workspace: &TmetaWorkspace, args: &[&str], label: &str) -> Value {
    let mut full: Vec<&str> = args.to_vec();
    full.push("--json");
    let run = run_tmeta(workspace, full, label);
    assert!(
        run.status.success(),
        "{label} failed: {}\nlog: {}",
        run.stderr,
        run.log_path.display()
    );
    run.json()
}

/// ID field of a JSON object.
pub fn id_of(value: &Value) -> i64 {
    value["id"]
        .as_i64()
        .unwrap_or_else(|| panic!("missing id in {value}"))
}

/// Create organization `acme` with container `tracker`; returns the container ID.
pub fn seed_container(workspace: &TmetaWorkspace) -> i64 {
    run_json(workspace, &["user", "add", "acme", "--org"], "seed_org");
    let container = run_json(workspace, &["container", "add", "acme", "tracker"], "seed_container");
    id_of(&container)
}

/// Create an item in `container`; returns its ID.
pub fn seed_item(workspace: &TmetaWorkspace, container: i64, kind: &str, title: &str) -> i64 {
    let container = container.to_string();
    let item = run_json(
        workspace,
        &["item", "add", &container, title, "--kind", kind],
        &format!("seed_item_{}", title.replace(' ', "_")),
    );
    id_of(&item)
}

// tests/end_to_end.rs
#![cfg(unix)]

mod common;
use crate::common::{init_tracing, wait_until, with_timeout_secs};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use devloop::run_with_settings;
use devloop_test_utils::builders::SettingsBuilder;
use devloop_test_utils::scripted::write_fake_toolchain;

struct Project {
    _dir: tempfile::TempDir,
    root: PathBuf,
}

impl Project {
    fn new() -> Self {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        for sub in ["tools", "bin", "ui"] {
            fs::create_dir(root.join(sub)).unwrap();
        }
        Self { _dir: dir, root }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    fn settings(&self, program: &str) -> SettingsBuilder {
        let tool = write_fake_toolchain(&self.path("tools"), program);
        SettingsBuilder::new(&self.path("main.go").display().to_string())
            .toolchain(tool)
            .bin_dir(self.path("bin"))
    }
}

fn line_count(path: &Path) -> usize {
    fs::read_to_string(path)
        .map(|s| s.lines().count())
        .unwrap_or(0)
}

#[tokio::test]
async fn run_once_returns_ok_when_the_program_exits_cleanly() {
    let project = Project::new();
    let marker = project.path("ran");
    let program = format!("touch '{}'\nexit 0\n", marker.display());

    let settings = project.settings(&program).arg("-addr").build();
    with_timeout_secs(20, run_with_settings(settings)).await.unwrap();

    assert!(marker.exists());
    assert!(project.path("bin/main").exists());
}

#[tokio::test]
async fn program_arguments_are_passed_through() {
    let project = Project::new();
    let out = project.path("args.txt");
    let program = format!("echo \"$@\" > '{}'\nexit 0\n", out.display());

    let settings = project
        .settings(&program)
        .arg("-http")
        .arg(":8844")
        .build();
    with_timeout_secs(20, run_with_settings(settings)).await.unwrap();

    assert_eq!(fs::read_to_string(out).unwrap().trim(), "-http :8844");
}

#[tokio::test]
async fn failing_exit_is_reported_as_unexpected() {
    let project = Project::new();
    let settings = project.settings("exit 3\n").build();

    let err = with_timeout_secs(20, run_with_settings(settings))
        .await
        .unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("unexpected process exit"), "{msg}");
}

#[tokio::test]
async fn failing_first_build_reports_the_compiler_output() {
    let project = Project::new();
    let settings = project.settings("exit 0\n").build();
    fs::write(project.path("tools/fail-build"), "").unwrap();

    let err = with_timeout_secs(20, run_with_settings(settings))
        .await
        .unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("initial build error"), "{msg}");
    assert!(msg.contains("syntax error"), "{msg}");
}

#[tokio::test]
async fn watched_change_rebuilds_and_restarts() {
    let project = Project::new();
    let starts = project.path("starts");
    let stop = project.path("stop");
    // Runs until `stop` appears; dies to the interrupt sent on replacement.
    let program = format!(
        "echo started >> '{starts}'\nwhile [ ! -f '{stop}' ]; do sleep 0.05; done\nexit 0\n",
        starts = starts.display(),
        stop = stop.display(),
    );

    let settings = project
        .settings(&program)
        .watch_dir(project.path("ui"))
        .build();
    let run = tokio::spawn(run_with_settings(settings));

    wait_until(|| line_count(&starts) == 1).await;
    // Changes that do not match the pattern are ignored.
    fs::write(project.path("ui/readme.txt"), "notes").unwrap();
    fs::write(project.path("ui/root.vugu"), "<div></div>").unwrap();
    wait_until(|| line_count(&starts) == 2).await;

    fs::write(&stop, "").unwrap();
    with_timeout_secs(20, run).await.unwrap().unwrap();
    assert_eq!(line_count(&starts), 2);
}

#[tokio::test]
async fn generate_runs_in_its_directory_before_the_build() {
    let project = Project::new();
    let settings = project
        .settings("exit 0\n")
        .generate_dir(project.path("ui"))
        .build();

    with_timeout_secs(20, run_with_settings(settings)).await.unwrap();

    let log = fs::read_to_string(project.path("tools/generate.log")).unwrap();
    assert_eq!(log.trim(), project.path("ui").display().to_string());
}

#[tokio::test]
async fn excluded_paths_are_ignored_and_stubborn_programs_are_replaced() {
    let project = Project::new();
    fs::create_dir(project.path("ui/generated")).unwrap();
    let starts = project.path("starts");
    let stop = project.path("stop");
    // Ignores the interrupt, so every replacement ends in a kill.
    let program = format!(
        "trap '' INT\necho started >> '{starts}'\n\
         while [ ! -f '{stop}' ]; do sleep 0.05; done\nexit 0\n",
        starts = starts.display(),
        stop = stop.display(),
    );

    let settings = project
        .settings(&program)
        .watch_dir(project.path("ui"))
        .watch_pattern(r"\.(vugu|css)$")
        .exclude("generated/**")
        .stop_timeout(Duration::from_millis(300))
        .build();
    let run = tokio::spawn(run_with_settings(settings));

    wait_until(|| line_count(&starts) == 1).await;
    fs::write(project.path("ui/generated/out.vugu"), "<div></div>").unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(line_count(&starts), 1, "excluded change restarted the program");

    fs::write(project.path("ui/site.css"), "body {}").unwrap();
    wait_until(|| line_count(&starts) == 2).await;

    fs::write(&stop, "").unwrap();
    with_timeout_secs(20, run).await.unwrap().unwrap();
}

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 crun contributors

//! End-to-end tests of the crun binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn project(config: &str) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("project.toml"), config).unwrap();
    dir
}

fn crun(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("crun").unwrap();
    cmd.current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("CRUN_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_interpolates_environment_and_positionals() {
    let dir = project(
        r#"
[greet]
command = "echo {$GREETING} {#1}"

[greet.environment]
GREETING = "hello"
"#,
    );

    crun(dir.path())
        .args(["greet", "world"])
        .assert()
        .success()
        .stdout("hello world\n");
}

#[test]
fn test_pipeline_stops_at_first_failure() {
    let dir = project(
        r#"
[a]
command = "true"

[b]
command = "exit 3"

[c]
command = "touch marker"

[ci]
pipeline = ["a", "b", "c"]
"#,
    );

    crun(dir.path())
        .arg("ci")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("step 2 of 3"));

    assert!(!dir.path().join("marker").exists());
}

#[test]
fn test_unknown_member_runs_nothing() {
    let dir = project(
        r#"
[a]
command = "touch marker"

[ci]
pipeline = ["a", "nope"]
"#,
    );

    crun(dir.path())
        .arg("ci")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("nope"));

    assert!(!dir.path().join("marker").exists());
}

#[test]
fn test_gated_member_is_skipped() {
    let dir = project(
        r#"
[check]
command = "false"

[optional]
command = "touch optional"
run_if = "check"

[last]
command = "touch last"

[ci]
pipeline = ["optional", "last"]
"#,
    );

    crun(dir.path()).arg("ci").assert().success();

    assert!(!dir.path().join("optional").exists());
    assert!(dir.path().join("last").exists());
}

#[test]
fn test_unknown_job() {
    let dir = project("[build]\ncommand = \"touch built\"\n");

    crun(dir.path())
        .arg("deploy")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("deploy"));

    assert!(!dir.path().join("built").exists());
}

#[test]
fn test_lists_jobs_without_default() {
    let dir = project("[build]\ncommand = \"make\"\naliases = [\"b\"]\n\n[test]\ncommand = \"make test\"\n");

    crun(dir.path())
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Available jobs")
                .and(predicate::str::contains("build (b)"))
                .and(predicate::str::contains("test"))
                .and(predicate::str::contains("_versionbump")),
        );
}

#[test]
fn test_default_job_runs() {
    let dir = project("default_job = \"hi\"\n\n[hi]\ncommand = \"echo default\"\n");

    crun(dir.path()).assert().success().stdout("default\n");
}

#[test]
fn test_run_if_gate_blocks_job() {
    let dir = project(
        r#"
[check]
command = "false"

[deploy]
command = "touch deployed"
run_if = "check"
"#,
    );

    crun(dir.path()).arg("deploy").assert().code(1);
    assert!(!dir.path().join("deployed").exists());
}

#[test]
fn test_options_become_flags() {
    let dir = project("[show]\ncommand = \"echo\"\n\n[show.options]\ncolor = false\n");

    crun(dir.path())
        .args(["show", "--options.tree", "--options.level=3", "--options.color", "false"])
        .assert()
        .success()
        .stdout("--tree --level=3\n");
}

#[test]
fn test_double_dash_keeps_tokens_positional() {
    let dir = project("[show]\ncommand = \"echo {#1}\"\n");

    crun(dir.path())
        .args(["show", "--", "--options.x"])
        .assert()
        .success()
        .stdout("--options.x\n");
}

#[test]
fn test_unresolved_placeholder_exit_code() {
    let dir = project("[show]\ncommand = \"echo {missing}\"\n");

    crun(dir.path())
        .arg("show")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("missing"));
}

#[test]
fn test_versionbump_builtin() {
    let dir = project("");
    fs::write(
        dir.path().join("setup.py"),
        "setup(\n    name=\"x\",\n    version=\"1.2.3\",\n)\n",
    )
    .unwrap();

    crun(dir.path())
        .args(["_versionbump", "--options.minor"])
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(dir.path().join("setup.py")).unwrap(),
        "setup(\n    name=\"x\",\n    version=\"1.3.0\",\n)\n"
    );
}

#[test]
fn test_base_inheritance_and_discovery_from_subdirectory() {
    let dir = project(
        r#"
base = "shared/base.toml"

[hello.environment]
WHO = "derived"
"#,
    );
    fs::create_dir_all(dir.path().join("shared")).unwrap();
    fs::write(
        dir.path().join("shared/base.toml"),
        "[hello]\ncommand = \"echo {$WHO} > out.txt\"\n\n[hello.environment]\nWHO = \"base\"\n",
    )
    .unwrap();
    let nested = dir.path().join("src/deep");
    fs::create_dir_all(&nested).unwrap();

    crun(&nested).arg("hello").assert().success();

    assert_eq!(
        fs::read_to_string(dir.path().join("out.txt")).unwrap(),
        "derived\n"
    );
}

#[test]
fn test_stdout_capture() {
    let dir = project("[log]\ncommand = \"echo captured\"\nstdout = \"log.txt\"\n");

    crun(dir.path())
        .arg("log")
        .assert()
        .success()
        .stdout("");

    assert_eq!(
        fs::read_to_string(dir.path().join("log.txt")).unwrap(),
        "captured\n"
    );
}

#[test]
fn test_missing_config_file() {
    let dir = tempfile::tempdir().unwrap();

    crun(dir.path())
        .args(["--config", "crun-no-such-project.toml", "build"])
        .assert()
        .code(2);
}

//! End-to-end tests for the `gomerge run` command.
//!
//! These tests invoke the binary directly with the manifest resolver against
//! the workspace built by [`common::TestFixture`].

mod common;
use common::prelude::*;

#[test]
fn test_run_help() {
    let mut cmd = cargo_bin_cmd!("gomerge");
    cmd.arg("run")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--output-dir"))
        .stdout(predicate::str::contains("--pkg"))
        .stdout(predicate::str::contains("--resolver"))
        .stdout(predicate::str::contains("GOMERGE_CONFIG"));
}

#[test]
fn test_run_requires_output_dir_and_pkg() {
    let fixture = TestFixture::new().with_config(configs::HELLO);
    fixture
        .command()
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--output-dir"));
}

#[test]
fn test_run_success() {
    let fixture = TestFixture::new().with_config(configs::HELLO);

    fixture
        .engine_command("run", "main")
        .assert()
        .success()
        .stdout(predicate::str::contains("[OK] Repackaged 1 programs"))
        .stdout(predicate::str::contains(
            "hello -> example.com/project/gen/internal/example.com/hello",
        ))
        .stdout(predicate::str::contains("merged_programs.go"));

    fixture
        .child("project/gen/merged_programs.go")
        .assert(predicate::str::contains("\"hello\": func() { hello.MergedMain() },"));
    fixture
        .child("project/gen/internal/example.com/hello/main.go")
        .assert(predicate::str::contains("func MergedMain()"));
    fixture
        .child("project/gen/internal/merged_flag/flag.go")
        .assert(predicate::path::is_file());
}

#[test]
fn test_run_quiet() {
    let fixture = TestFixture::new().with_config(configs::HELLO);

    fixture
        .engine_command("run", "main")
        .arg("--quiet")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_run_config_from_env() {
    let fixture = TestFixture::new().with_file("project/programs.yml", configs::HELLO_TWICE);

    fixture
        .engine_command("run", "main")
        .env("GOMERGE_CONFIG", "programs.yml")
        .assert()
        .success()
        .stdout(predicate::str::contains("Repackaged 2 programs"));
}

#[test]
fn test_run_missing_config() {
    let fixture = TestFixture::new();

    fixture
        .engine_command("run", "main")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration file not found"))
        .stderr(predicate::str::contains("hint:"));
}

#[test]
fn test_run_invalid_config() {
    let fixture = TestFixture::new().with_config(configs::INVALID_YAML);

    fixture
        .engine_command("run", "main")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid configuration in"));
}

#[test]
fn test_run_missing_output_dir() {
    let fixture = TestFixture::new().with_config(configs::HELLO);

    fixture
        .command()
        .args(["run", "--output-dir", "missing", "--pkg", "main", "--resolver", "manifest"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Output directory not found"));
}

#[test]
fn test_run_unknown_package() {
    let fixture = TestFixture::new().with_config(configs::UNKNOWN);

    fixture
        .engine_command("run", "main")
        .assert()
        .failure()
        .stderr(predicate::str::contains("repackaging failed for command ghost"))
        .stderr(predicate::str::contains("example.com/ghost"));
    fixture
        .child("project/gen/merged_programs.go")
        .assert(predicate::path::missing());
}

#[test]
fn test_run_invalid_namespace() {
    let fixture = TestFixture::new().with_config(configs::HELLO);

    fixture
        .engine_command("run", "func")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a valid Go package name"));
}

#[test]
fn test_run_without_goroot() {
    let fixture = TestFixture::new().with_config(configs::HELLO);

    fixture
        .engine_command("run", "main")
        .env_remove("GOROOT")
        .assert()
        .failure()
        .stderr(predicate::str::contains("hint: Set GOROOT"));
}

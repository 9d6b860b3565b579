//! Integration tests for the repackaging engine.
//!
//! These tests drive [`gomerge::phases::orchestrator`] through the library API
//! against the on-disk workspace built by [`common::TestFixture`], resolving
//! modules with the manifest resolver so no Go toolchain is needed.
//!
//! The test at the end of this file runs the merged output with a real `go`
//! command and is only enabled with the `integration-tests` feature:
//!
//! ```bash
//! cargo test --test integration_test --features integration-tests
//! ```

mod common;

use common::prelude::*;
use gomerge::config;
use gomerge::error::Error;
use gomerge::module::{CachedOracle, GoListOracle, ManifestOracle};
use gomerge::phases::orchestrator;
use std::fs;

fn oracle(fixture: &TestFixture) -> CachedOracle<ManifestOracle> {
    CachedOracle::new(
        ManifestOracle::from_env()
            .with_goroot(fixture.goroot())
            .with_mod_cache(fixture.mod_cache()),
    )
}

#[test]
fn test_run_produces_relocated_tree() {
    let fixture = TestFixture::new();
    let config = config::parse(configs::HELLO).unwrap();

    let report = orchestrator::run(&config, &fixture.output_dir(), "main", &oracle(&fixture)).unwrap();

    assert_eq!(report.import_prefix, "example.com/project/gen/internal");
    assert_eq!(
        report.commands["hello"],
        "example.com/project/gen/internal/example.com/hello"
    );
    assert_eq!(report.modules.len(), 1);
    assert!(report.singleton_copied);

    let internal = fixture.output_dir().join("internal");
    assert!(internal.join("example.com/hello/main.go").is_file());
    assert!(internal.join("example.com/hello/lib/lib.go").is_file());
    assert!(internal.join("merged_flag/flag.go").is_file());

    // Tests, nested modules and vendored code stay behind.
    assert!(!internal.join("example.com/hello/main_test.go").exists());
    assert!(!internal.join("example.com/hello/tools").exists());
    assert!(!internal.join("example.com/hello/vendor").exists());
    assert!(!internal.join("merged_flag/flag_test.go").exists());
    // go.mod is not Go source.
    assert!(!internal.join("example.com/hello/go.mod").exists());
}

#[test]
fn test_run_rewrites_program_source() {
    let fixture = TestFixture::new();
    let config = config::parse(configs::HELLO).unwrap();
    orchestrator::run(&config, &fixture.output_dir(), "main", &oracle(&fixture)).unwrap();

    let expected = common::HELLO_MAIN
        .replace("package main", "package merged")
        .replace(
            "\"flag\"",
            "\"example.com/project/gen/internal/merged_flag\"",
        )
        .replace(
            "\"example.com/hello/lib\"",
            "\"example.com/project/gen/internal/example.com/hello/lib\"",
        )
        .replace("func main()", "func MergedMain()");
    assert_eq!(fixture.read_output("internal/example.com/hello/main.go"), expected);

    // Packages other than main keep their name; standard imports are untouched.
    let lib = fixture.read_output("internal/example.com/hello/lib/lib.go");
    assert!(lib.starts_with("package lib\n"));
    assert!(lib.contains("import \"fmt\""));

    // The flag copy is verbatim.
    assert_eq!(
        fixture.read_output("internal/merged_flag/flag.go"),
        "package flag\n\nfunc Parse() {}\n"
    );
}

#[test]
fn test_run_writes_executable_dispatch() {
    let fixture = TestFixture::new();
    let config = config::parse(configs::HELLO_TWICE).unwrap();
    orchestrator::run(&config, &fixture.output_dir(), "main", &oracle(&fixture)).unwrap();

    let dispatch = fixture.read_output("merged_programs.go");
    assert!(dispatch.starts_with("// Code generated by gomerge. DO NOT EDIT.\n\npackage main\n"));
    assert!(dispatch.contains("\t\"fmt\"\n"));
    assert!(dispatch.contains("\thello \"example.com/project/gen/internal/example.com/hello\"\n"));
    assert!(dispatch.contains("\t\"hello\": func() { hello.MergedMain() },\n"));
    assert!(dispatch.contains("\t\"hi\":    func() { hello.MergedMain() },\n"));
    assert!(dispatch.contains("func Run(name string, args []string) bool {"));
    assert!(dispatch.contains("func main() {"));
}

#[test]
fn test_library_namespace_has_no_main() {
    let fixture = TestFixture::new();
    let config = config::parse(configs::HELLO).unwrap();
    orchestrator::run(&config, &fixture.output_dir(), "programs", &oracle(&fixture)).unwrap();

    let dispatch = fixture.read_output("merged_programs.go");
    assert!(dispatch.contains("package programs\n"));
    assert!(!dispatch.contains("\"fmt\""));
    assert!(!dispatch.contains("func main()"));
}

#[test]
fn test_run_is_idempotent() {
    let fixture = TestFixture::new();
    let config = config::parse(configs::HELLO).unwrap();
    let oracle = oracle(&fixture);

    orchestrator::run(&config, &fixture.output_dir(), "main", &oracle).unwrap();
    let first = gomerge::checksum::Checksums::for_dir(&fixture.output_dir()).unwrap();
    orchestrator::run(&config, &fixture.output_dir(), "main", &oracle).unwrap();
    let second = gomerge::checksum::Checksums::for_dir(&fixture.output_dir()).unwrap();

    assert!(first.diff(&second).is_empty(), "{}", first.diff(&second));
}

#[test]
fn test_verify_after_run_is_clean() {
    let fixture = TestFixture::new();
    let config = config::parse(configs::HELLO).unwrap();
    let oracle = oracle(&fixture);

    let stale = orchestrator::verify(&config, &fixture.output_dir(), "main", &oracle).unwrap();
    assert!(!stale.is_up_to_date());
    assert!(!fixture.output_dir().join("internal").exists());

    orchestrator::run(&config, &fixture.output_dir(), "main", &oracle).unwrap();
    fixture
        .child("project/gen/internal/example.com/hello/extra.go")
        .write_str("package merged\n")
        .unwrap();

    let report = orchestrator::verify(&config, &fixture.output_dir(), "main", &oracle).unwrap();
    assert_eq!(
        report.diff.removed,
        vec!["internal/example.com/hello/extra.go".to_string()]
    );
    assert!(fixture
        .output_dir()
        .join("internal/example.com/hello/extra.go")
        .exists());
}

#[test]
fn test_unknown_package_fails_with_context() {
    let fixture = TestFixture::new();
    let config = config::parse(configs::UNKNOWN).unwrap();

    let err = orchestrator::run(&config, &fixture.output_dir(), "main", &oracle(&fixture))
        .unwrap_err();
    assert_eq!(err.to_string(), "repackaging failed for command ghost");
    assert!(matches!(err.root_cause(), Error::PackageNotFound { .. }));
    // The dispatch file is only written after every program succeeded.
    assert!(!fixture.output_dir().join("merged_programs.go").exists());
}

#[test]
fn test_library_package_is_not_a_program() {
    let fixture = TestFixture::new();
    let config = config::parse(configs::NOT_A_MAIN).unwrap();

    let err = orchestrator::run(&config, &fixture.output_dir(), "main", &oracle(&fixture))
        .unwrap_err();
    assert!(matches!(err.root_cause(), Error::MissingEntryPoint { .. }));
}

#[test]
fn test_entry_point_collision_stops_before_dispatch() {
    let fixture = TestFixture::new()
        .with_file(
            "project/go.mod",
            "module example.com/project\n\ngo 1.21\n\nrequire (\n\texample.com/dep v1.0.0\n\texample.com/hello v0.0.0-00010101000000-000000000000\n\texample.com/zzz v0.0.0-00010101000000-000000000000\n)\n\nreplace example.com/hello => ../hello\n\nreplace example.com/zzz => ../zzz\n",
        )
        .with_file("zzz/go.mod", "module example.com/zzz\n\ngo 1.21\n")
        .with_file(
            "zzz/main.go",
            "package main\n\nfunc MergedMain() {}\n\nfunc main() { MergedMain() }\n",
        );
    let config = config::parse(
        "packages:\n  hello:\n    main: example.com/hello\n  zzz:\n    main: example.com/zzz\n",
    )
    .unwrap();

    let err = orchestrator::run(&config, &fixture.output_dir(), "main", &oracle(&fixture))
        .unwrap_err();

    assert_eq!(err.to_string(), "repackaging failed for command zzz");
    assert!(matches!(err.root_cause(), Error::NameCollision { .. }));
    // The first command's relocated tree is left in place.
    assert!(fixture
        .output_dir()
        .join("internal/example.com/hello/main.go")
        .is_file());
    assert!(!fixture.output_dir().join("merged_programs.go").exists());
}

#[test]
fn test_keep_flag_import() {
    let fixture = TestFixture::new();
    let config = config::parse(configs::KEEP_FLAG).unwrap();

    let report = orchestrator::run(&config, &fixture.output_dir(), "main", &oracle(&fixture)).unwrap();
    assert!(!report.singleton_copied);
    let main = fixture.read_output("internal/example.com/hello/main.go");
    assert!(main.contains("\t\"flag\"\n"));
    assert!(main.contains("func MergedMain()"));
}

/// Runs the merged program with the installed Go toolchain, resolving
/// modules through `go list`.
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_merged_program_runs_with_go() {
    let fixture = TestFixture::new()
        .with_file(
            "project/go.mod",
            "module example.com/project\n\ngo 1.21\n\nrequire example.com/hello v0.0.0-00010101000000-000000000000\n\nreplace example.com/hello => ../hello\n",
        )
        .with_file("hello/go.mod", "module example.com/hello\n\ngo 1.21\n")
        .with_file(
            "hello/main.go",
            "package main\n\nimport (\n\t\"flag\"\n\n\t\"example.com/hello/lib\"\n)\n\nvar name = flag.String(\"name\", \"Hi\", \"greeting\")\n\nfunc main() {\n\tflag.Parse()\n\tlib.Greet(*name)\n}\n",
        );
    fs::remove_dir_all(fixture.path().join("hello/vendor")).unwrap();
    let config = config::parse(configs::HELLO).unwrap();

    orchestrator::run(
        &config,
        &fixture.output_dir(),
        "main",
        &CachedOracle::new(GoListOracle::new()),
    )
    .unwrap();

    let output = std::process::Command::new("go")
        .args(["run", "./gen", "hello"])
        .current_dir(fixture.project())
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(String::from_utf8_lossy(&output.stdout), "Hi\n");
}

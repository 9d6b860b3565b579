//! Shared test utilities for integration and E2E tests.
//!
//! The fixture lays out a small Go workspace on disk, with no Go toolchain
//! needed, that exercises every resolution path of the manifest resolver:
//!
//! ```text
//! <tmp>/
//!   project/            module example.com/project
//!     go.mod            requires hello (replaced by ../hello) and example.com/dep
//!     gen/              output directory
//!   hello/              module example.com/hello
//!     main.go           package main, imports flag, ./lib and example.com/dep
//!     main_test.go
//!     lib/lib.go
//!     tools/            nested module example.com/hello/tools
//!     vendor/           vendored copy of example.com/dep
//!   cache/              module cache holding example.com/dep@v1.0.0
//!   goroot/src/flag/    stand-in for the standard library flag package
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_config(configs::HELLO);
//!     fixture.command().arg("run").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    #[allow(unused_imports)]
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::configs;
    pub use super::TestFixture;
}

/// Configuration files used across the tests.
#[allow(dead_code)]
pub mod configs {
    /// One program.
    pub const HELLO: &str = r#"
packages:
  hello:
    main: example.com/hello
"#;

    /// Two commands backed by the same program.
    pub const HELLO_TWICE: &str = r#"
packages:
  hello:
    main: example.com/hello
  hi:
    main: example.com/hello
"#;

    /// A program that keeps importing the standard flag package.
    pub const KEEP_FLAG: &str = r#"
packages:
  hello:
    main: example.com/hello
    keep-flag-import: true
"#;

    /// A library package registered as a program.
    pub const NOT_A_MAIN: &str = r#"
packages:
  lib:
    main: example.com/hello/lib
"#;

    /// A package no module provides.
    pub const UNKNOWN: &str = r#"
packages:
  ghost:
    main: example.com/ghost
"#;

    pub const INVALID_YAML: &str = "packages: [unterminated";
}

/// Source of the fixture's main program.
pub const HELLO_MAIN: &str = r#"package main

import (
	"flag"

	"example.com/dep"
	"example.com/hello/lib"
)

var name = flag.String("name", "Hi", "greeting")

func main() {
	flag.Parse()
	lib.Greet(dep.Decorate(*name))
}
"#;

/// A temporary Go workspace with a project module and one program module.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create the workspace described in the module documentation.
    pub fn new() -> Self {
        let fixture = Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        };
        fixture
            .with_file(
                "project/go.mod",
                "module example.com/project\n\ngo 1.21\n\nrequire (\n\texample.com/dep v1.0.0\n\texample.com/hello v0.0.0-00010101000000-000000000000\n)\n\nreplace example.com/hello => ../hello\n",
            )
            .with_file("project/gen/.keep", "")
            .with_file("hello/go.mod", "module example.com/hello\n\ngo 1.21\n\nrequire example.com/dep v1.0.0\n")
            .with_file("hello/main.go", HELLO_MAIN)
            .with_file("hello/main_test.go", "package main\n\nimport \"testing\"\n\nfunc TestMain(t *testing.T) {}\n")
            .with_file(
                "hello/lib/lib.go",
                "package lib\n\nimport \"fmt\"\n\n// Greet prints greeting.\nfunc Greet(greeting string) { fmt.Println(greeting) }\n",
            )
            .with_file("hello/tools/go.mod", "module example.com/hello/tools\n")
            .with_file("hello/tools/tool.go", "package tools\n")
            .with_file("hello/vendor/example.com/dep/dep.go", "package dep\n")
            .with_file("hello/vendor/modules.txt", "# example.com/dep v1.0.0\n## explicit\nexample.com/dep\n")
            .with_file(
                "cache/example.com/dep@v1.0.0/dep.go",
                "package dep\n\n// Decorate returns s unchanged.\nfunc Decorate(s string) string { return s }\n",
            )
            .with_file("cache/example.com/dep@v1.0.0/go.mod", "module example.com/dep\n")
            .with_file("goroot/src/flag/flag.go", "package flag\n\nfunc Parse() {}\n")
            .with_file("goroot/src/flag/flag_test.go", "package flag\n")
            .with_file("goroot/src/fmt/print.go", "package fmt\n")
    }

    /// Write `gomerge.yml` into the project directory.
    #[allow(dead_code)]
    pub fn with_config(self, content: &str) -> Self {
        self.with_file("project/gomerge.yml", content)
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Get the path to the temporary directory.
    #[allow(dead_code)]
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn project(&self) -> PathBuf {
        self.temp_dir.path().join("project")
    }

    #[allow(dead_code)]
    pub fn output_dir(&self) -> PathBuf {
        self.project().join("gen")
    }

    #[allow(dead_code)]
    pub fn goroot(&self) -> PathBuf {
        self.temp_dir.path().join("goroot")
    }

    #[allow(dead_code)]
    pub fn mod_cache(&self) -> PathBuf {
        self.temp_dir.path().join("cache")
    }

    /// Create a child path in the temp directory.
    #[allow(dead_code)]
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Read a file below the output directory.
    #[allow(dead_code)]
    pub fn read_output(&self, path: &str) -> String {
        std::fs::read_to_string(self.output_dir().join(path))
            .unwrap_or_else(|e| panic!("Failed to read {}: {}", path, e))
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl TestFixture {
    /// A `gomerge` command running in the project directory with the
    /// manifest resolver pointed at the fixture's GOROOT and module cache.
    #[allow(dead_code)]
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("gomerge");
        cmd.current_dir(self.project())
            .env("GOROOT", self.goroot())
            .env("GOMODCACHE", self.mod_cache())
            .env_remove("GOMERGE_CONFIG")
            .env("NO_COLOR", "1");
        cmd
    }

    /// [`command`](Self::command) with `<subcommand> --output-dir gen --pkg <pkg>
    /// --resolver manifest` already applied.
    #[allow(dead_code)]
    pub fn engine_command(&self, subcommand: &str, pkg: &str) -> assert_cmd::Command {
        let mut cmd = self.command();
        cmd.arg(subcommand)
            .arg("--output-dir")
            .arg("gen")
            .arg("--pkg")
            .arg(pkg)
            .arg("--resolver")
            .arg("manifest");
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_layout() {
        let fixture = TestFixture::new();
        assert!(fixture.project().join("go.mod").exists());
        assert!(fixture.output_dir().is_dir());
        assert!(fixture.goroot().join("src/flag/flag.go").exists());
    }

    #[test]
    fn test_configs_are_valid() {
        for config in [
            configs::HELLO,
            configs::HELLO_TWICE,
            configs::KEEP_FLAG,
            configs::NOT_A_MAIN,
            configs::UNKNOWN,
        ] {
            gomerge::config::parse(config).unwrap();
        }
        assert!(gomerge::config::parse(configs::INVALID_YAML).is_err());
    }
}

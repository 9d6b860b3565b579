//! # gomerge
//!
//! This library merges several independently built Go programs into one
//! package, so that each program can be invoked in-process as a library call
//! instead of as a separate executable. It is used by the `gomerge`
//! command-line tool but can be driven directly.
//!
//! ## Quick Example
//!
//! ```
//! use gomerge::config;
//! use gomerge::phases::dispatch::build_dispatch;
//! use std::collections::BTreeMap;
//!
//! let config = config::parse(
//!     r#"
//! packages:
//!   hello:
//!     main: example.com/hello
//! "#,
//! )
//! .unwrap();
//! assert_eq!(config.len(), 1);
//!
//! let mut commands = BTreeMap::new();
//! commands.insert(
//!     "hello".to_string(),
//!     "example.com/project/gen/internal/example.com/hello".to_string(),
//! );
//! let table = build_dispatch("main", &commands).unwrap();
//! assert!(table.render().contains("hello.MergedMain()"));
//! ```
//!
//! ## Core Concepts
//!
//! - **Configuration (`config`)**: the command name to package mapping read
//!   from `gomerge.yml`.
//! - **Module resolution (`module`)**: the [`ModuleOracle`](module::ModuleOracle)
//!   trait answers every "which module owns this" question, backed by `go list`
//!   or by reading `go.mod` files directly, and memoized per run.
//! - **Go source (`syntax`)**: an immutable, span-annotated view of a Go file
//!   that is transformed by applying edits, preserving formatting.
//! - **Phases (`phases`)**: locate, copy, rewrite, promote and dispatch.
//! - **Checksums (`checksum`)**: snapshots used to verify generated output.
//!
//! ## Execution Flow
//!
//! The main entry point is [`phases::orchestrator::run`]. For each program, in
//! sorted command order, it:
//!
//! 1.  **Locates** the module containing the program's main package.
//! 2.  **Copies** the module's non-test Go source under `<output>/internal`.
//! 3.  **Rewrites** imports across the relocation root so the module's
//!     packages, and its private copy of `flag`, resolve in their new home.
//! 4.  **Promotes** `func main` to `func MergedMain`.
//!
//! Finally it writes `merged_programs.go`, which maps each command name to
//! its promoted entry point.

pub mod checksum;
pub mod config;
pub mod defaults;
pub mod error;
pub mod module;
pub mod output;
pub mod phases;
pub mod suggestions;
pub mod syntax;

#[cfg(test)]
mod naming_proptest;

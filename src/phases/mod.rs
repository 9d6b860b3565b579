//! Implementation of the phases of a repackaging run.
//!
//! ## Overview
//!
//! A run processes each configured program in sorted command order:
//! 1. Locate - Resolve the program's main package to its module and source directory
//! 2. Copy - Relocate the module's non-test Go source under the relocation root
//! 3. Rewrite - Point references at their relocated targets across the whole relocation root
//! 4. Promote - Turn `func main` of each relocated `package main` into a callable function
//!
//! Once every program has been processed:
//! 5. Dispatch - Generate the table mapping command names to the promoted functions
//!
//! The `orchestrator` runs the phases in order; every phase consults the same
//! [`ModuleOracle`](crate::module::ModuleOracle) for module boundaries.

pub mod copy;
pub mod dispatch;
pub mod entry;
pub mod locate;
pub mod orchestrator;
pub mod rewrite;

pub use copy::copy_module;
pub use dispatch::{build_dispatch, DispatchTable};
pub use entry::promote_entry_point;
pub use locate::{locate, locate_program, Program};
pub use orchestrator::{run, verify, RunReport, VerifyReport};
pub use rewrite::{rewrite_tree, RewriteOptions, RewriteReport};

//! # gomerge CLI
//!
//! This is the binary entry point for the `gomerge` command-line tool.
//!
//! Its responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Setting up logging and output preferences.
//! - Executing the selected command and reporting errors with their causes.
//!
//! The repackaging engine lives in the `gomerge` library crate; the binary is a
//! thin wrapper around it.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}

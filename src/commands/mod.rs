//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the `gomerge`
//! command-line tool. Each subcommand is defined in its own file.
//!
//! ## Structure
//!
//! Each command module contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and performs the
//!   command's logic by calling into the `gomerge` library.
//!
//! `run` and `verify` share [`EngineArgs`], which selects the configuration,
//! the output directory, the generated package name and the module resolver.

pub mod completions;
pub mod run;
pub mod verify;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, ValueEnum};

use gomerge::config::{self, Config};
use gomerge::defaults;
use gomerge::error::Error;
use gomerge::module::{CachedOracle, GoListOracle, ManifestOracle, ModuleOracle};
use gomerge::suggestions;

/// How module information is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Resolver {
    /// Ask the `go` command (`go list`)
    Go,
    /// Read go.mod, vendor/modules.txt, the module cache and GOROOT directly
    Manifest,
}

/// Arguments shared by the commands that run the repackaging engine.
#[derive(Args, Debug, Clone)]
pub struct EngineArgs {
    /// Configuration file listing the programs to merge
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "GOMERGE_CONFIG",
        default_value = defaults::CONFIG_FILE
    )]
    pub config: PathBuf,

    /// Directory in which the merged output is written
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Package name of the generated dispatch file
    #[arg(short, long, value_name = "NAME")]
    pub pkg: String,

    /// Module resolver
    #[arg(long, value_enum, default_value_t = Resolver::Go)]
    pub resolver: Resolver,
}

impl EngineArgs {
    /// Load and validate the configuration file.
    pub fn load_config(&self) -> Result<Config> {
        if !self.config.exists() {
            return Err(suggestions::config_not_found(&self.config));
        }
        config::from_file(&self.config).map_err(engine_error)
    }

    /// Fail early, with a hint, when the output directory is missing.
    pub fn check_output_dir(&self) -> Result<()> {
        if !self.output_dir.is_dir() {
            return Err(suggestions::output_dir_not_found(&self.output_dir));
        }
        Ok(())
    }

    /// The memoizing oracle for the selected resolver.
    pub fn oracle(&self) -> Box<dyn ModuleOracle> {
        match self.resolver {
            Resolver::Go => Box::new(CachedOracle::new(GoListOracle::new())),
            Resolver::Manifest => Box::new(CachedOracle::new(ManifestOracle::from_env())),
        }
    }
}

/// Convert an engine error for display, appending a hint when one applies.
pub fn engine_error(error: Error) -> anyhow::Error {
    match suggestions::hint_for(&error) {
        Some(hint) => anyhow::anyhow!("{:#}\n\n{}", anyhow::Error::new(error), hint),
        None => anyhow::Error::new(error),
    }
}

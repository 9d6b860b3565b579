//! # Configuration Schema and Parsing
//!
//! This module defines the configuration consumed by a repackaging run: an
//! ordered, uniquely keyed mapping from command name to the package reference
//! of the Go program that implements the command.
//!
//! ## File Format
//!
//! ```yaml
//! packages:
//!   gofmt:
//!     main: cmd/gofmt
//!   hello:
//!     main: example.com/hello
//!     keep-flag-import: true
//! ```
//!
//! `main` is an import path (or a path relative to the output directory) of a
//! `main` package. `keep-flag-import` opts a program out of receiving the
//! private copy of the `flag` package.
//!
//! ## Validation
//!
//! A [`Config`] can only be built through [`Config::new`] or [`parse`], both
//! of which reject an empty mapping, blank names, blank package references
//! and duplicate names. Iteration is always in sorted name order.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One command to be merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSpec {
    /// Command name used as the dispatch key.
    pub name: String,
    /// Package reference of the program's `main` package.
    pub package_ref: String,
    /// Leave the program's `flag` imports pointing at the standard library.
    pub keep_flag_import: bool,
}

impl ProgramSpec {
    pub fn new(name: impl Into<String>, package_ref: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            package_ref: package_ref.into(),
            keep_flag_import: false,
        }
    }

    /// Builder-style setter for `keep_flag_import`.
    pub fn keep_flag_import(mut self, keep: bool) -> Self {
        self.keep_flag_import = keep;
        self
    }
}

/// Validated set of programs, keyed and ordered by command name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    programs: BTreeMap<String, ProgramSpec>,
}

impl Config {
    /// Build a configuration, rejecting empty input, blank fields and
    /// duplicate names.
    pub fn new<I>(programs: I) -> Result<Self>
    where
        I: IntoIterator<Item = ProgramSpec>,
    {
        let mut map = BTreeMap::new();
        for program in programs {
            if program.name.trim().is_empty() {
                return Err(Error::Config {
                    message: "config cannot contain a blank command name".to_string(),
                });
            }
            if program.package_ref.trim().is_empty() {
                return Err(Error::Config {
                    message: format!(
                        "config for command {} has a blank main package",
                        program.name
                    ),
                });
            }
            if map.contains_key(&program.name) {
                return Err(Error::Config {
                    message: format!("duplicate command name: {}", program.name),
                });
            }
            map.insert(program.name.clone(), program);
        }

        if map.is_empty() {
            return Err(Error::Config {
                message: "configuration does not contain any packages".to_string(),
            });
        }

        Ok(Self { programs: map })
    }

    /// Programs in sorted command-name order.
    pub fn programs(&self) -> impl Iterator<Item = &ProgramSpec> {
        self.programs.values()
    }

    /// Look up a program by command name.
    pub fn get(&self, name: &str) -> Option<&ProgramSpec> {
        self.programs.get(name)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}

/// On-disk representation of a configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    packages: BTreeMap<String, RawProgram>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawProgram {
    /// Package reference of the main package.
    #[serde(default)]
    main: String,
    #[serde(default, rename = "keep-flag-import")]
    keep_flag_import: bool,
}

/// Parses a YAML string into a [`Config`].
///
/// Duplicate keys are rejected by the YAML deserializer itself.
pub fn parse(yaml_content: &str) -> Result<Config> {
    let raw: RawConfig = serde_yaml::from_str(yaml_content)?;
    Config::new(raw.packages.into_iter().map(|(name, program)| ProgramSpec {
        name,
        package_ref: program.main,
        keep_flag_import: program.keep_flag_import,
    }))
}

/// Parse a [`Config`] from a YAML file path.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::io(format!("failed to read file {}", path.display()), e))?;
    parse(&content).map_err(|e| Error::Context {
        context: format!("invalid configuration in {}", path.display()),
        source: Box::new(e),
    })
}

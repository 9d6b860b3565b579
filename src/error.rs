//! # Error Handling
//!
//! This module defines the centralized error type for the repackaging engine.
//! It uses `thiserror` to build a single `Error` enum whose variants follow the
//! failure taxonomy of a run:
//!
//! - **Configuration errors**: empty, duplicate or blank entries, an invalid
//!   namespace name. These are detected before the filesystem is touched.
//! - **Resolution errors**: a package or module cannot be located by any
//!   strategy.
//! - **Boundary errors**: the owner of an import cannot be determined.
//! - **Structural errors**: a missing or colliding entry point, or source that
//!   cannot be scanned.
//! - **I/O errors**: filesystem and external-process failures.
//!
//! Every failure is fatal for the run. Errors raised deep in the pipeline are
//! wrapped with [`Error::Context`] by each intervening operation (see
//! [`ResultExt`]), so the causal chain reads from "repackaging failed for
//! command X" down to the specific file or path.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for repackaging operations
#[derive(Error, Debug)]
pub enum Error {
    /// The configuration is invalid.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A package reference resolved to a package without Go files.
    #[error("no Go files in package {package} resolved from directory {}", dir.display())]
    NoGoFiles { package: String, dir: PathBuf },

    /// The module owning a package could not be determined.
    #[error("unable to determine module for package {package} resolved from directory {}", dir.display())]
    UnknownModule { package: String, dir: PathBuf },

    /// No resolution strategy produced an on-disk directory for a module.
    #[error("could not determine directory of module {module}: {message}")]
    ModuleDirNotFound { module: String, message: String },

    /// An import path does not resolve to any package.
    #[error("package {package} not found from directory {}", dir.display())]
    PackageNotFound { package: String, dir: PathBuf },

    /// A directory is not inside any module.
    #[error("directory {} is not inside a module", dir.display())]
    NoModule { dir: PathBuf },

    /// A program resolved to the project's own module.
    #[error("module for package {package} was reported as {module}, which is the same as the project module: repackaging non-modules is not supported")]
    NotAModule { package: String, module: String },

    /// The location of the Go standard library is unknown.
    #[error("cannot locate standard library package {package}: GOROOT is not known")]
    GoRootUnknown { package: String },

    /// The owner of an import could not be classified.
    #[error("cannot classify import {import} in {}", file.display())]
    Unclassified {
        import: String,
        file: PathBuf,
        #[source]
        source: Box<Error>,
    },

    /// No entry point was found where one was required.
    #[error("no entry point in repackaged unit: {location}")]
    MissingEntryPoint { location: String },

    /// Renaming the entry point would clash with an existing function.
    #[error("cannot rename function {function} to {target} in {}: a function with the new name already exists", file.display())]
    NameCollision {
        function: String,
        target: String,
        file: PathBuf,
    },

    /// A Go source file could not be scanned.
    #[error("failed to parse {}: {message}", path.display())]
    Syntax { path: PathBuf, message: String },

    /// A `go.mod` or `vendor/modules.txt` file is malformed.
    #[error("invalid manifest {}:{line}: {message}", path.display())]
    GoMod {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// A filesystem operation failed.
    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Walking a directory tree failed.
    #[error("directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// The `go` command failed.
    #[error("command `{command}` failed in {}: {stderr}", dir.display())]
    GoCommand {
        command: String,
        dir: PathBuf,
        stderr: String,
    },

    /// Output of the `go` command could not be decoded.
    #[error("failed to decode JSON from {context}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// An error annotated with the operation that was in progress.
    #[error("{context}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Build an [`Error::Io`] with a description of the failed operation.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }

    /// Return the innermost error of a context chain.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Context { source, .. } | Error::Unclassified { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Attach operation context to an engine error.
pub trait ResultExt<T> {
    /// Wrap the error, if any, with the lazily built context message.
    fn context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|source| Error::Context {
            context: f().into(),
            source: Box::new(source),
        })
    }
}

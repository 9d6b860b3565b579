//! # Error Suggestions
//!
//! Helpers that build CLI errors with hints on how to fix them. Errors should
//! tell users what went wrong AND what to try next.
//!
//! ```rust,ignore
//! // Instead of:
//! anyhow::bail!("Configuration file not found: {}", path.display());
//!
//! // Use:
//! return Err(suggestions::config_not_found(path));
//! ```

use std::path::Path;

use crate::error::Error;

/// The configuration file does not exist.
pub fn config_not_found(path: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "Configuration file not found: {path}\n\n\
         hint: Create a gomerge.yml file listing the programs to merge\n\
         hint: Use -c/--config to specify a different path\n\
         hint: Set the GOMERGE_CONFIG environment variable",
        path = path.display()
    )
}

/// The output directory does not exist.
pub fn output_dir_not_found(path: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "Output directory not found: {path}\n\n\
         hint: Create the directory inside the Go module that will import the merged programs",
        path = path.display()
    )
}

/// Verify mode found differences.
pub fn stale_output(path: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "Generated code in {path} is out of date\n\n\
         hint: Run 'gomerge run' with the same flags to regenerate it",
        path = path.display()
    )
}

/// Extra hint for an engine error, if one applies.
pub fn hint_for(error: &Error) -> Option<&'static str> {
    match error.root_cause() {
        Error::GoCommand { .. } => {
            Some("hint: Make sure the go command is installed, or use --resolver manifest")
        }
        Error::GoRootUnknown { .. } => {
            Some("hint: Set GOROOT so the flag package can be copied, or use --resolver go")
        }
        Error::NoModule { .. } | Error::NotAModule { .. } => {
            Some("hint: Programs must live in modules required by the go.mod enclosing the output directory")
        }
        Error::NameCollision { .. } => {
            Some("hint: Rename the existing MergedMain function in the program")
        }
        _ => None,
    }
}

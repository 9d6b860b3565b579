//! Module oracle backed by the `go list` command.
//!
//! Every query runs `go list` with `-json` in the context directory and
//! decodes its output. The command is read-only: it is never asked to download
//! or to update `go.mod`.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;

use super::{ModuleInfo, ModuleOracle, ModulePath, ModuleRecord, Package};
use crate::error::{Error, Result};

/// Package name `go list` reports for files outside any module.
const COMMAND_LINE_ARGUMENTS: &str = "command-line-arguments";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ListedPackage {
    import_path: String,
    dir: String,
    go_files: Vec<String>,
    standard: bool,
    module: Option<ListedModule>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ListedModule {
    path: String,
    dir: String,
    main: bool,
    replace: Option<Box<ListedModule>>,
}

/// Oracle that asks the Go toolchain.
#[derive(Debug, Clone)]
pub struct GoListOracle {
    go: PathBuf,
}

impl Default for GoListOracle {
    fn default() -> Self {
        Self {
            go: PathBuf::from("go"),
        }
    }
}

impl GoListOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific `go` executable instead of the one on `PATH`.
    pub fn with_go_binary(mut self, go: impl Into<PathBuf>) -> Self {
        self.go = go.into();
        self
    }

    /// Run `go <args>` in `dir`. When `check_status` is false a failing exit
    /// status is tolerated and whatever was written to stdout is returned.
    fn go(&self, args: &[&str], dir: &Path, check_status: bool) -> Result<Vec<u8>> {
        let command = format!("go {}", args.join(" "));
        log::trace!("running `{}` in {}", command, dir.display());

        let output = Command::new(&self.go)
            .args(args)
            .current_dir(dir)
            .output()
            .map_err(|e| Error::GoCommand {
                command: command.clone(),
                dir: dir.to_path_buf(),
                stderr: e.to_string(),
            })?;

        if check_status && !output.status.success() {
            return Err(Error::GoCommand {
                command,
                dir: dir.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }

    fn list_package(&self, pattern: &str, dir: &Path) -> Result<ListedPackage> {
        let stdout = self.go(&["list", "-json", pattern], dir, true)?;
        let mut packages = decode_stream::<ListedPackage>(&stdout, pattern)?;
        if packages.len() != 1 {
            return Err(Error::PackageNotFound {
                package: pattern.to_string(),
                dir: dir.to_path_buf(),
            });
        }
        Ok(packages.remove(0))
    }
}

/// Decode the concatenated JSON objects `go list -json` prints.
fn decode_stream<T: for<'de> Deserialize<'de>>(bytes: &[u8], context: &str) -> Result<Vec<T>> {
    serde_json::Deserializer::from_slice(bytes)
        .into_iter::<T>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|source| Error::Json {
            context: format!("go list output for {}", context),
            source,
        })
}

fn non_empty(value: &str) -> Option<PathBuf> {
    (!value.is_empty()).then(|| PathBuf::from(value))
}

impl ModuleOracle for GoListOracle {
    fn load_package(&self, pattern: &str, dir: &Path) -> Result<Package> {
        let listed = self.list_package(pattern, dir)?;
        let package_dir = PathBuf::from(&listed.dir);

        let mut go_files: Vec<PathBuf> = listed
            .go_files
            .iter()
            .map(|f| package_dir.join(f))
            .collect();
        go_files.sort();

        let module = listed.module.filter(|m| !m.path.is_empty()).map(|m| {
            let replace_dir = m.replace.as_ref().and_then(|r| non_empty(&r.dir));
            ModuleRecord {
                path: ModulePath::new(m.path),
                dir: non_empty(&m.dir),
                replace_dir,
            }
        });

        Ok(Package {
            import_path: listed.import_path,
            dir: package_dir,
            go_files,
            standard: listed.standard,
            module,
        })
    }

    fn module_dir(&self, module: &ModulePath, dir: &Path) -> Result<Option<PathBuf>> {
        // Only stdout is meaningful here: with -e the command reports
        // problems inside the JSON rather than failing.
        let stdout = self.go(&["list", "-e", "-json", module.as_str()], dir, false)?;
        let packages = decode_stream::<ListedPackage>(&stdout, module.as_str())?;
        Ok(packages.into_iter().find_map(|p| non_empty(&p.dir)))
    }

    fn main_module(&self, dir: &Path) -> Result<ModuleInfo> {
        let stdout = self.go(&["list", "-mod=readonly", "-m", "-json"], dir, true)?;
        let modules = decode_stream::<ListedModule>(&stdout, "main module")?;
        let main = modules
            .into_iter()
            .find(|m| m.main || !m.path.is_empty())
            .filter(|m| m.path != COMMAND_LINE_ARGUMENTS && !m.dir.is_empty())
            .ok_or_else(|| Error::NoModule {
                dir: dir.to_path_buf(),
            })?;
        Ok(ModuleInfo {
            path: ModulePath::new(main.path),
            dir: PathBuf::from(main.dir),
        })
    }

    fn module_for_directory(&self, dir: &Path) -> Result<ModulePath> {
        let listed = self.list_package(".", dir)?;
        listed
            .module
            .map(|m| m.path)
            .filter(|p| !p.is_empty() && p != COMMAND_LINE_ARGUMENTS)
            .map(ModulePath::new)
            .ok_or_else(|| Error::NoModule {
                dir: dir.to_path_buf(),
            })
    }

    fn standard_package_dir(&self, import_path: &str) -> Result<PathBuf> {
        let cwd = std::env::current_dir()
            .map_err(|e| Error::io("failed to determine current directory", e))?;
        let listed = self.list_package(import_path, &cwd)?;
        if !listed.standard {
            return Err(Error::GoRootUnknown {
                package: import_path.to_string(),
            });
        }
        Ok(PathBuf::from(listed.dir))
    }
}

//! Fixed names used by the repackaging engine.
//!
//! These values determine the shape of the generated output and are shared by
//! the engine phases, the CLI and the tests.

use std::path::PathBuf;

/// Package name given to every repackaged `main` package.
pub const MERGED_PACKAGE: &str = "merged";

/// Name the `main` function of a repackaged program is renamed to.
pub const MERGED_MAIN: &str = "MergedMain";

/// Name of the process entry-point function.
pub const ENTRY_POINT: &str = "main";

/// Name of the package that holds a process entry point.
pub const MAIN_PACKAGE: &str = "main";

/// Directory inside the output directory that holds all relocated modules.
pub const RELOCATION_ROOT: &str = "internal";

/// Standard library package whose global state must not be shared.
pub const SINGLETON_PACKAGE: &str = "flag";

/// Directory (under the relocation root) holding the private singleton copy.
pub const SINGLETON_COPY_DIR: &str = "merged_flag";

/// File name of the generated dispatch unit.
pub const DISPATCH_FILE: &str = "merged_programs.go";

/// Name of directories holding vendored dependencies.
pub const VENDOR_DIR: &str = "vendor";

/// Default configuration file name.
pub const CONFIG_FILE: &str = "gomerge.yml";

/// Returns the default Go module cache directory.
///
/// Follows the `go` command: `$GOMODCACHE`, else the first entry of `$GOPATH`
/// with `pkg/mod` appended, else `~/go/pkg/mod`.
pub fn default_mod_cache() -> PathBuf {
    if let Some(cache) = std::env::var_os("GOMODCACHE").filter(|v| !v.is_empty()) {
        return PathBuf::from(cache);
    }
    if let Some(gopath) = std::env::var_os("GOPATH") {
        if let Some(first) = std::env::split_paths(&gopath).next() {
            if !first.as_os_str().is_empty() {
                return first.join("pkg").join("mod");
            }
        }
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("go")
        .join("pkg")
        .join("mod")
}

/// Returns `$GOROOT` when it is set.
pub fn default_goroot() -> Option<PathBuf> {
    std::env::var_os("GOROOT")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

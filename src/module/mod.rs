//! # Module Resolution
//!
//! Every decision about *which module owns what* goes through one
//! [`ModuleOracle`]. The Module Locator, the Tree Copier and the Reference
//! Rewriter all ask the same oracle, so they cannot disagree about where a
//! module boundary lies.
//!
//! ## Design
//!
//! The trait mirrors the queries a Go build performs:
//!
//! - **`load_package`**: resolve an import path (or directory path) from a
//!   context directory to its package: directory, Go files and owning module.
//! - **`module_dir`**: find the on-disk directory of a module by path.
//! - **`main_module`**: the module a directory belongs to, with its root.
//! - **`module_for_directory`**: the module path owning a source directory,
//!   including directories inside `vendor/`.
//! - **`standard_package_dir`**: where a standard library package lives.
//!
//! Implementations:
//!
//! - [`GoListOracle`] runs the read-only `go list` command for each query.
//! - [`ManifestOracle`] reads `go.mod`, `vendor/modules.txt`, the module
//!   cache and `GOROOT` directly and needs no Go toolchain.
//! - [`CachedOracle`] memoizes any oracle for the duration of a run.

pub mod gomod;
pub mod golist;
pub mod manifest;

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::Result;

pub use golist::GoListOracle;
pub use manifest::ManifestOracle;

/// Canonical path identifying a module, e.g. `github.com/foo/bar/v2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModulePath(String);

impl ModulePath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The module path as a relative directory path, one component per
    /// `/`-separated element (a `/vN` suffix becomes a directory too).
    pub fn to_rel_path(&self) -> PathBuf {
        self.0.split('/').filter(|s| !s.is_empty()).collect()
    }

    /// Whether `import_path` names this module or a package inside it by path
    /// alone. This is only a candidate test; ownership is decided by the
    /// oracle, because a nested module may share the prefix.
    pub fn is_prefix_of(&self, import_path: &str) -> bool {
        import_path == self.0
            || import_path
                .strip_prefix(self.0.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModulePath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

/// Identity and on-disk location of a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub path: ModulePath,
    pub dir: PathBuf,
}

/// Module information reported alongside a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRecord {
    pub path: ModulePath,
    /// Directory the module's source is read from, when the query knows it.
    /// Absent for vendored modules.
    pub dir: Option<PathBuf>,
    /// Local directory substituted for the module by a `replace` directive.
    pub replace_dir: Option<PathBuf>,
}

/// A resolved package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub import_path: String,
    pub dir: PathBuf,
    /// Absolute paths of the package's non-test Go files, sorted.
    pub go_files: Vec<PathBuf>,
    pub standard: bool,
    pub module: Option<ModuleRecord>,
}

/// Whether an import path has the shape of a standard library path: its first
/// element contains no dot.
pub fn looks_standard(import_path: &str) -> bool {
    let first = import_path.split('/').next().unwrap_or_default();
    !first.is_empty() && !first.contains('.') && !import_path.starts_with('.')
}

/// Whether a package reference is a filesystem path rather than an import path.
pub fn is_filesystem_ref(package_ref: &str) -> bool {
    package_ref == "."
        || package_ref == ".."
        || package_ref.starts_with("./")
        || package_ref.starts_with("../")
        || Path::new(package_ref).is_absolute()
}

/// Resolution queries shared by every phase of a run.
pub trait ModuleOracle {
    /// Resolve `pattern` (an import path or directory) from `dir`.
    fn load_package(&self, pattern: &str, dir: &Path) -> Result<Package>;

    /// Directory of the module `module` as seen from `dir`, if one is known.
    fn module_dir(&self, module: &ModulePath, dir: &Path) -> Result<Option<PathBuf>>;

    /// The module containing `dir`.
    fn main_module(&self, dir: &Path) -> Result<ModuleInfo>;

    /// Module path owning the source directory `dir`.
    fn module_for_directory(&self, dir: &Path) -> Result<ModulePath>;

    /// Directory of the standard library package `import_path`.
    fn standard_package_dir(&self, import_path: &str) -> Result<PathBuf>;

    /// Whether `import_path`, imported from `dir`, is a standard library
    /// package. Paths inside the main module are never standard, even when
    /// the main module has a dotless path.
    fn is_standard(&self, import_path: &str, dir: &Path) -> Result<bool> {
        if !looks_standard(import_path) {
            return Ok(false);
        }
        let main = self.main_module(dir)?;
        Ok(!main.path.is_prefix_of(import_path))
    }
}

impl<T: ModuleOracle + ?Sized> ModuleOracle for &T {
    fn load_package(&self, pattern: &str, dir: &Path) -> Result<Package> {
        (**self).load_package(pattern, dir)
    }

    fn module_dir(&self, module: &ModulePath, dir: &Path) -> Result<Option<PathBuf>> {
        (**self).module_dir(module, dir)
    }

    fn main_module(&self, dir: &Path) -> Result<ModuleInfo> {
        (**self).main_module(dir)
    }

    fn module_for_directory(&self, dir: &Path) -> Result<ModulePath> {
        (**self).module_for_directory(dir)
    }

    fn standard_package_dir(&self, import_path: &str) -> Result<PathBuf> {
        (**self).standard_package_dir(import_path)
    }

    fn is_standard(&self, import_path: &str, dir: &Path) -> Result<bool> {
        (**self).is_standard(import_path, dir)
    }
}

/// Memoizing wrapper: each distinct query reaches the inner oracle once.
/// Errors are not cached.
pub struct CachedOracle<O> {
    inner: O,
    packages: Memo<(String, PathBuf), Package>,
    module_dirs: Memo<(ModulePath, PathBuf), Option<PathBuf>>,
    main_modules: Memo<PathBuf, ModuleInfo>,
    directory_modules: Memo<PathBuf, ModulePath>,
    standard_dirs: Memo<String, PathBuf>,
}

impl<O: ModuleOracle> CachedOracle<O> {
    pub fn new(inner: O) -> Self {
        Self {
            inner,
            packages: Memo::default(),
            module_dirs: Memo::default(),
            main_modules: Memo::default(),
            directory_modules: Memo::default(),
            standard_dirs: Memo::default(),
        }
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }
}

impl<O: ModuleOracle> ModuleOracle for CachedOracle<O> {
    fn load_package(&self, pattern: &str, dir: &Path) -> Result<Package> {
        self.packages
            .get_or_try((pattern.to_string(), dir.to_path_buf()), || {
                self.inner.load_package(pattern, dir)
            })
    }

    fn module_dir(&self, module: &ModulePath, dir: &Path) -> Result<Option<PathBuf>> {
        self.module_dirs
            .get_or_try((module.clone(), dir.to_path_buf()), || {
                self.inner.module_dir(module, dir)
            })
    }

    fn main_module(&self, dir: &Path) -> Result<ModuleInfo> {
        self.main_modules
            .get_or_try(dir.to_path_buf(), || self.inner.main_module(dir))
    }

    fn module_for_directory(&self, dir: &Path) -> Result<ModulePath> {
        self.directory_modules
            .get_or_try(dir.to_path_buf(), || self.inner.module_for_directory(dir))
    }

    fn standard_package_dir(&self, import_path: &str) -> Result<PathBuf> {
        self.standard_dirs.get_or_try(import_path.to_string(), || {
            self.inner.standard_package_dir(import_path)
        })
    }
}

struct Memo<K, V> {
    entries: Mutex<HashMap<K, V>>,
}

impl<K, V> Default for Memo<K, V> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash, V: Clone> Memo<K, V> {
    fn get_or_try<F>(&self, key: K, compute: F) -> Result<V>
    where
        F: FnOnce() -> Result<V>,
    {
        // A poisoned map only means a panic happened mid-insert; the map
        // itself is still consistent.
        {
            let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(value) = entries.get(&key) {
                return Ok(value.clone());
            }
        }

        let value = compute()?;

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key, value.clone());
        Ok(value)
    }
}

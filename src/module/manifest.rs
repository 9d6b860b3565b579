//! Module oracle that reads Go manifests directly.
//!
//! Resolution follows the layout the `go` command produces:
//!
//! - the main module is found by walking up from the context directory to the
//!   nearest `go.mod`;
//! - required modules live in the module cache at
//!   `<cache>/<escaped path>@<escaped version>`, unless a `replace` directive
//!   points them at a local directory or another module version;
//! - when `vendor/modules.txt` exists next to the main `go.mod`, required
//!   modules are read from `vendor/<module path>` instead;
//! - standard library packages live under `$GOROOT/src`.
//!
//! An import path is owned by the candidate module with the longest matching
//! path whose tree contains the package directory without crossing another
//! `go.mod`.

use std::path::{Component, Path, PathBuf};

use super::gomod::{self, escape_path, unescape_path, GoMod, ReplaceTarget};
use super::{
    is_filesystem_ref, looks_standard, ModuleInfo, ModuleOracle, ModulePath, ModuleRecord,
    Package,
};
use crate::defaults;
use crate::error::{Error, Result};

/// Oracle that needs no Go toolchain.
#[derive(Debug, Clone)]
pub struct ManifestOracle {
    goroot: Option<PathBuf>,
    mod_cache: PathBuf,
}

impl Default for ManifestOracle {
    fn default() -> Self {
        Self::from_env()
    }
}

impl ManifestOracle {
    /// Oracle using `$GOROOT` and the module cache the `go` command would use.
    pub fn from_env() -> Self {
        Self {
            goroot: defaults::default_goroot(),
            mod_cache: defaults::default_mod_cache(),
        }
    }

    pub fn with_goroot(mut self, goroot: impl Into<PathBuf>) -> Self {
        self.goroot = Some(goroot.into());
        self
    }

    pub fn with_mod_cache(mut self, mod_cache: impl Into<PathBuf>) -> Self {
        self.mod_cache = mod_cache.into();
        self
    }

    fn workspace(&self, dir: &Path) -> Result<Workspace> {
        let dir = clean(dir);
        let root = dir
            .ancestors()
            .find(|d| d.join("go.mod").is_file())
            .map(Path::to_path_buf)
            .ok_or_else(|| Error::NoModule { dir: dir.clone() })?;
        let gomod = GoMod::read(&root.join("go.mod"))?;
        let vendored = root
            .join(defaults::VENDOR_DIR)
            .join("modules.txt")
            .is_file();

        let mut candidates = vec![Candidate {
            path: ModulePath::new(gomod.module.clone()),
            source_dir: root.clone(),
            reported_dir: Some(root.clone()),
            replace_dir: None,
        }];

        for require in &gomod.requires {
            let path = ModulePath::new(require.path.clone());
            let candidate = if vendored {
                Candidate {
                    source_dir: root.join(defaults::VENDOR_DIR).join(path.to_rel_path()),
                    path,
                    reported_dir: None,
                    replace_dir: None,
                }
            } else {
                match gomod.replacement(&require.path, &require.version) {
                    Some(ReplaceTarget::Dir(target)) => {
                        let target = clean(&root.join(target));
                        Candidate {
                            path,
                            source_dir: target.clone(),
                            reported_dir: Some(target.clone()),
                            replace_dir: Some(target),
                        }
                    }
                    Some(ReplaceTarget::Module { path: to, version }) => {
                        let dir = self.cache_dir(to, version);
                        Candidate {
                            path,
                            source_dir: dir.clone(),
                            reported_dir: Some(dir),
                            replace_dir: None,
                        }
                    }
                    None => {
                        let dir = self.cache_dir(&require.path, &require.version);
                        Candidate {
                            path,
                            source_dir: dir.clone(),
                            reported_dir: Some(dir),
                            replace_dir: None,
                        }
                    }
                }
            };
            candidates.push(candidate);
        }

        // Longest module path first so nested modules win over their parents.
        candidates.sort_by(|a, b| b.path.as_str().len().cmp(&a.path.as_str().len()));

        Ok(Workspace {
            root,
            module: ModulePath::new(gomod.module),
            candidates,
        })
    }

    fn cache_dir(&self, path: &str, version: &str) -> PathBuf {
        self.mod_cache
            .join(format!("{}@{}", escape_path(path), escape_path(version)))
    }

    fn standard_package(&self, import_path: &str) -> Result<Package> {
        let dir = self.standard_package_dir(import_path)?;
        Ok(Package {
            import_path: import_path.to_string(),
            go_files: go_files(&dir)?,
            dir,
            standard: true,
            module: None,
        })
    }

    /// Module path from a module cache directory such as
    /// `<cache>/github.com/!foo/bar@v1.0.0/sub`.
    fn cache_module(&self, dir: &Path) -> Option<ModulePath> {
        let rel = dir.strip_prefix(&self.mod_cache).ok()?;
        let mut parts = Vec::new();
        for component in rel.components() {
            let part = component.as_os_str().to_str()?;
            match part.split_once('@') {
                Some((name, _version)) => {
                    parts.push(name);
                    return Some(ModulePath::new(unescape_path(&parts.join("/"))));
                }
                None => parts.push(part),
            }
        }
        None
    }
}

struct Workspace {
    root: PathBuf,
    module: ModulePath,
    candidates: Vec<Candidate>,
}

struct Candidate {
    path: ModulePath,
    /// Where the module's files are read from.
    source_dir: PathBuf,
    /// Directory reported in the package's module record.
    reported_dir: Option<PathBuf>,
    replace_dir: Option<PathBuf>,
}

impl Candidate {
    fn record(&self) -> ModuleRecord {
        ModuleRecord {
            path: self.path.clone(),
            dir: self.reported_dir.clone(),
            replace_dir: self.replace_dir.clone(),
        }
    }

    /// Directory of the package `import_path` if this module provides it.
    fn package_dir(&self, import_path: &str) -> Option<PathBuf> {
        if !self.path.is_prefix_of(import_path) {
            return None;
        }
        let rel = &import_path[self.path.as_str().len()..];
        let dir = rel
            .split('/')
            .filter(|s| !s.is_empty())
            .fold(self.source_dir.clone(), |dir, part| dir.join(part));
        (dir.is_dir() && !crosses_module_boundary(&self.source_dir, &dir)).then_some(dir)
    }

    /// Import path of `dir` if it lies inside this module.
    fn import_path_of(&self, dir: &Path) -> Option<String> {
        let rel = dir.strip_prefix(&self.source_dir).ok()?;
        if crosses_module_boundary(&self.source_dir, dir) {
            return None;
        }
        let mut import_path = self.path.as_str().to_string();
        for component in rel.components() {
            import_path.push('/');
            import_path.push_str(component.as_os_str().to_str()?);
        }
        Some(import_path)
    }
}

impl ModuleOracle for ManifestOracle {
    fn load_package(&self, pattern: &str, dir: &Path) -> Result<Package> {
        let workspace = self.workspace(dir)?;
        if !is_filesystem_ref(pattern)
            && looks_standard(pattern)
            && !workspace.module.is_prefix_of(pattern)
        {
            return self.standard_package(pattern);
        }

        let not_found = || Error::PackageNotFound {
            package: pattern.to_string(),
            dir: dir.to_path_buf(),
        };

        let (candidate, import_path, package_dir) = if is_filesystem_ref(pattern) {
            let package_dir = clean(&dir.join(pattern));
            workspace
                .candidates
                .iter()
                .filter(|c| package_dir.starts_with(&c.source_dir))
                .max_by_key(|c| c.source_dir.components().count())
                .and_then(|c| Some((c, c.import_path_of(&package_dir)?, package_dir.clone())))
                .filter(|(_, _, d)| d.is_dir())
                .ok_or_else(not_found)?
        } else {
            workspace
                .candidates
                .iter()
                .find_map(|c| Some((c, pattern.to_string(), c.package_dir(pattern)?)))
                .ok_or_else(not_found)?
        };

        log::trace!(
            "resolved {} to {} in module {}",
            pattern,
            package_dir.display(),
            candidate.path
        );

        Ok(Package {
            import_path,
            go_files: go_files(&package_dir)?,
            dir: package_dir,
            standard: false,
            module: Some(candidate.record()),
        })
    }

    fn module_dir(&self, module: &ModulePath, dir: &Path) -> Result<Option<PathBuf>> {
        let workspace = self.workspace(dir)?;
        let found = workspace
            .candidates
            .iter()
            .find(|c| &c.path == module)
            .map(|c| c.source_dir.clone())
            .filter(|d| d.is_dir());
        if found.is_some() {
            return Ok(found);
        }
        let vendored = workspace
            .root
            .join(defaults::VENDOR_DIR)
            .join(module.to_rel_path());
        Ok(vendored.is_dir().then_some(vendored))
    }

    fn main_module(&self, dir: &Path) -> Result<ModuleInfo> {
        let workspace = self.workspace(dir)?;
        Ok(ModuleInfo {
            path: workspace.module,
            dir: workspace.root,
        })
    }

    fn module_for_directory(&self, dir: &Path) -> Result<ModulePath> {
        let dir = clean(dir);

        if let Some((vendor_root, rel)) = split_vendor(&dir) {
            let modules_txt = vendor_root.join("modules.txt");
            let content = std::fs::read_to_string(&modules_txt).map_err(|e| {
                Error::io(format!("failed to read file {}", modules_txt.display()), e)
            })?;
            return gomod::parse_modules_txt(&modules_txt, &content)?
                .into_iter()
                .map(|m| ModulePath::new(m.path))
                .filter(|m| m.is_prefix_of(&rel))
                .max_by_key(|m| m.as_str().len())
                .ok_or(Error::NoModule { dir });
        }

        if let Some(module) = self.cache_module(&dir) {
            return Ok(module);
        }

        let root = dir
            .ancestors()
            .find(|d| d.join("go.mod").is_file())
            .ok_or_else(|| Error::NoModule { dir: dir.clone() })?;
        Ok(ModulePath::new(GoMod::read(&root.join("go.mod"))?.module))
    }

    fn standard_package_dir(&self, import_path: &str) -> Result<PathBuf> {
        let goroot = self.goroot.as_ref().ok_or_else(|| Error::GoRootUnknown {
            package: import_path.to_string(),
        })?;
        let dir = import_path
            .split('/')
            .fold(goroot.join("src"), |dir, part| dir.join(part));
        if !dir.is_dir() {
            return Err(Error::PackageNotFound {
                package: import_path.to_string(),
                dir: goroot.join("src"),
            });
        }
        Ok(dir)
    }
}

/// Non-test Go files of `dir`, sorted. Files the `go` command ignores (names
/// starting with `.` or `_`) are skipped.
fn go_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| Error::io(format!("failed to read directory {}", dir.display()), e))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry
            .map_err(|e| Error::io(format!("failed to read directory {}", dir.display()), e))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !name.ends_with(".go")
            || name.ends_with("_test.go")
            || name.starts_with('.')
            || name.starts_with('_')
        {
            continue;
        }
        if entry.path().is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Whether a `go.mod` sits in any directory strictly below `root` on the way
/// to `dir` (inclusive).
fn crosses_module_boundary(root: &Path, dir: &Path) -> bool {
    dir.ancestors()
        .take_while(|d| *d != root && d.starts_with(root))
        .any(|d| d.join("go.mod").is_file())
}

/// Split a path inside a vendor tree at its last `vendor` component.
/// Returns the vendor directory and the rest of the path, `/`-joined.
fn split_vendor(dir: &Path) -> Option<(PathBuf, String)> {
    let components: Vec<Component<'_>> = dir.components().collect();
    let index = components
        .iter()
        .rposition(|c| c.as_os_str() == defaults::VENDOR_DIR)?;
    let vendor_root: PathBuf = components[..=index].iter().collect();
    let rest: Vec<&str> = components[index + 1..]
        .iter()
        .filter_map(|c| c.as_os_str().to_str())
        .collect();
    (!rest.is_empty()).then(|| (vendor_root, rest.join("/")))
}

/// Lexically normalize `path`, dropping `.` and resolving `..`.
fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

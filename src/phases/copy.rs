//! Tree Copier
//!
//! Copies the source of one module into the relocation root, keeping only
//! what a build of the module needs.
//!
//! ## Filtering
//!
//! - `vendor` directories are skipped with their whole subtree.
//! - A directory holding Go files is identity-checked: if the oracle says it
//!   belongs to a different module (a nested module), it is skipped with its
//!   subtree. Directories without Go files are traversed without a check.
//! - Only non-test `.go` files are copied. Symbolic links are skipped.
//! - Directories are created with mode `0755`. Directories that end up empty
//!   are removed after the walk; the module root itself is kept.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::defaults::VENDOR_DIR;
use crate::error::{Error, Result, ResultExt};
use crate::module::{ModuleOracle, ModulePath};

/// Copy `module`, read from `source_dir`, to `dest_root/<module path>`.
///
/// Returns the destination directory of the module.
pub fn copy_module<O: ModuleOracle + ?Sized>(
    oracle: &O,
    module: &ModulePath,
    source_dir: &Path,
    dest_root: &Path,
) -> Result<PathBuf> {
    require_dir(source_dir, "source")?;
    require_dir(dest_root, "destination")?;

    let dest = dest_root.join(module.to_rel_path());
    create_dir(&dest)?;

    let mut copied = 0usize;
    let mut walker = WalkDir::new(source_dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = entry?;
        if entry.depth() == 0 {
            continue;
        }
        let file_type = entry.file_type();
        if file_type.is_symlink() {
            log::trace!("skipping symbolic link {}", entry.path().display());
            continue;
        }

        let rel = entry
            .path()
            .strip_prefix(source_dir)
            .map_err(|_| Error::Io {
                context: format!("walked outside of {}", source_dir.display()),
                source: io::Error::new(io::ErrorKind::Other, "unexpected path"),
            })?;
        let target = dest.join(rel);

        if file_type.is_dir() {
            if entry.file_name() == VENDOR_DIR {
                walker.skip_current_dir();
                continue;
            }
            if has_go_files(entry.path())? {
                let owner = oracle
                    .module_for_directory(entry.path())
                    .context(|| format!("failed to determine module of {}", entry.path().display()))?;
                if &owner != module {
                    log::debug!(
                        "skipping {}: it belongs to module {}",
                        entry.path().display(),
                        owner
                    );
                    walker.skip_current_dir();
                    continue;
                }
            }
            create_dir(&target)?;
        } else if is_copied_file(entry.file_name()) {
            fs::copy(entry.path(), &target).map_err(|e| {
                Error::io(
                    format!(
                        "failed to copy {} to {}",
                        entry.path().display(),
                        target.display()
                    ),
                    e,
                )
            })?;
            copied += 1;
        }
    }

    prune_empty_dirs(&dest)?;
    log::debug!("copied {} files of module {} to {}", copied, module, dest.display());
    Ok(dest)
}

fn require_dir(path: &Path, role: &str) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    Err(Error::io(
        format!("{} {} is not a directory", role, path.display()),
        io::Error::new(io::ErrorKind::NotADirectory, "not a directory"),
    ))
}

fn is_copied_file(name: &std::ffi::OsStr) -> bool {
    name.to_str()
        .is_some_and(|n| n.ends_with(".go") && !n.ends_with("_test.go"))
}

fn has_go_files(dir: &Path) -> Result<bool> {
    let entries = fs::read_dir(dir)
        .map_err(|e| Error::io(format!("failed to read directory {}", dir.display()), e))?;
    for entry in entries {
        let entry =
            entry.map_err(|e| Error::io(format!("failed to read directory {}", dir.display()), e))?;
        let is_go = entry
            .file_name()
            .to_str()
            .is_some_and(|n| n.ends_with(".go"));
        if is_go && entry.file_type().is_ok_and(|t| t.is_file()) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Create `dir` and any missing parents with mode `0755`.
pub(crate) fn create_dir(dir: &Path) -> Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    builder
        .create(dir)
        .map_err(|e| Error::io(format!("failed to create directory {}", dir.display()), e))
}

/// Remove every empty directory below `root`, deepest first.
pub(crate) fn prune_empty_dirs(root: &Path) -> Result<()> {
    for entry in WalkDir::new(root).contents_first(true) {
        let entry = entry?;
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            continue;
        }
        let is_empty = fs::read_dir(entry.path())
            .map_err(|e| Error::io(format!("failed to read directory {}", entry.path().display()), e))?
            .next()
            .is_none();
        if is_empty {
            fs::remove_dir(entry.path()).map_err(|e| {
                Error::io(format!("failed to remove directory {}", entry.path().display()), e)
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{ModuleInfo, Package};
    use tempfile::TempDir;

    /// Classifies directories by the nearest `go.mod` above them.
    struct GoModOracle;

    impl ModuleOracle for GoModOracle {
        fn load_package(&self, _pattern: &str, _dir: &Path) -> Result<Package> {
            unreachable!("copier only classifies directories")
        }

        fn module_dir(&self, _module: &ModulePath, _dir: &Path) -> Result<Option<PathBuf>> {
            unreachable!("copier only classifies directories")
        }

        fn main_module(&self, _dir: &Path) -> Result<ModuleInfo> {
            unreachable!("copier only classifies directories")
        }

        fn module_for_directory(&self, dir: &Path) -> Result<ModulePath> {
            let root = dir
                .ancestors()
                .find(|d| d.join("go.mod").is_file())
                .ok_or_else(|| Error::NoModule {
                    dir: dir.to_path_buf(),
                })?;
            let content = fs::read_to_string(root.join("go.mod")).unwrap();
            Ok(ModulePath::new(
                content.trim().trim_start_matches("module ").to_string(),
            ))
        }

        fn standard_package_dir(&self, _import_path: &str) -> Result<PathBuf> {
            unreachable!("copier only classifies directories")
        }
    }

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn module_tree(root: &Path) {
        write(&root.join("go.mod"), "module example.com/hello");
        write(&root.join("main.go"), "package main\n");
        write(&root.join("main_test.go"), "package main\n");
        write(&root.join("README.md"), "# hello\n");
        write(&root.join("lib/lib.go"), "package lib\n");
        write(&root.join("lib/testdata/input.txt"), "data\n");
        write(&root.join("vendor/example.com/dep/dep.go"), "package dep\n");
        write(&root.join("nested/go.mod"), "module example.com/hello/nested");
        write(&root.join("nested/n.go"), "package nested\n");
        write(&root.join("pass/through/deep/d.go"), "package deep\n");
    }

    #[test]
    fn test_copy_filters_tree() {
        let source = TempDir::new().unwrap();
        let dest_root = TempDir::new().unwrap();
        module_tree(source.path());

        let dest = copy_module(
            &GoModOracle,
            &ModulePath::new("example.com/hello"),
            source.path(),
            dest_root.path(),
        )
        .unwrap();

        assert_eq!(dest, dest_root.path().join("example.com/hello"));
        assert!(dest.join("main.go").is_file());
        assert!(dest.join("lib/lib.go").is_file());
        assert!(dest.join("pass/through/deep/d.go").is_file());
        assert!(!dest.join("main_test.go").exists());
        assert!(!dest.join("README.md").exists());
        assert!(!dest.join("go.mod").exists());
        assert!(!dest.join("vendor").exists());
        assert!(!dest.join("nested").exists());
        // Emptied by filtering.
        assert!(!dest.join("lib/testdata").exists());
    }

    #[test]
    fn test_copy_preserves_content() {
        let source = TempDir::new().unwrap();
        let dest_root = TempDir::new().unwrap();
        module_tree(source.path());
        write(&source.path().join("lib/lib.go"), "package lib\n\n// Keep me.\nfunc X() {}\n");

        let dest = copy_module(
            &GoModOracle,
            &ModulePath::new("example.com/hello"),
            source.path(),
            dest_root.path(),
        )
        .unwrap();
        assert_eq!(
            fs::read_to_string(dest.join("lib/lib.go")).unwrap(),
            "package lib\n\n// Keep me.\nfunc X() {}\n"
        );
    }

    #[test]
    #[cfg(unix)]
    fn test_directories_have_mode_0755() {
        use std::os::unix::fs::PermissionsExt;

        let source = TempDir::new().unwrap();
        let dest_root = TempDir::new().unwrap();
        module_tree(source.path());

        let dest = copy_module(
            &GoModOracle,
            &ModulePath::new("example.com/hello"),
            source.path(),
            dest_root.path(),
        )
        .unwrap();
        let mode = fs::metadata(dest.join("lib")).unwrap().permissions().mode();
        // The process umask can only remove bits.
        assert_eq!(mode & 0o777 & !0o755, 0);
        assert_ne!(mode & 0o700, 0);
    }

    #[test]
    #[cfg(unix)]
    fn test_symlinks_are_skipped() {
        let source = TempDir::new().unwrap();
        let dest_root = TempDir::new().unwrap();
        module_tree(source.path());
        std::os::unix::fs::symlink(
            source.path().join("lib/lib.go"),
            source.path().join("linked.go"),
        )
        .unwrap();

        let dest = copy_module(
            &GoModOracle,
            &ModulePath::new("example.com/hello"),
            source.path(),
            dest_root.path(),
        )
        .unwrap();
        assert!(!dest.join("linked.go").exists());
    }

    #[test]
    fn test_source_must_be_directory() {
        let dest_root = TempDir::new().unwrap();
        let err = copy_module(
            &GoModOracle,
            &ModulePath::new("example.com/hello"),
            Path::new("/nonexistent/source"),
            dest_root.path(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("is not a directory"));
    }

    #[test]
    fn test_identity_failure_propagates() {
        let source = TempDir::new().unwrap();
        let dest_root = TempDir::new().unwrap();
        write(&source.path().join("x/x.go"), "package x\n");

        let err = copy_module(
            &GoModOracle,
            &ModulePath::new("example.com/hello"),
            source.path(),
            dest_root.path(),
        )
        .unwrap_err();
        assert!(matches!(err.root_cause(), Error::NoModule { .. }));
    }
}

//! # Directory Checksums
//!
//! Content snapshots of a directory tree, used by verify mode to tell whether
//! regenerating the output would change anything.
//!
//! - [`Checksums`] records the SHA-256 of every regular file, keyed by its
//!   `/`-separated path relative to the snapshot root.
//! - [`ChecksumDiff`] lists the paths that were added, removed or changed
//!   between two snapshots.
//! - [`Backup`] copies a directory aside and puts it back, so a trial run
//!   leaves no trace.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::TempDir;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// SHA-256 of every regular file below a directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Checksums {
    files: BTreeMap<String, String>,
}

impl Checksums {
    /// Snapshot `dir`. Symbolic links are not followed.
    pub fn for_dir(dir: &Path) -> Result<Self> {
        let mut files = BTreeMap::new();
        for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let content = fs::read(entry.path()).map_err(|e| {
                Error::io(format!("failed to read file {}", entry.path().display()), e)
            })?;
            files.insert(relative_key(dir, entry.path()), hex::encode(Sha256::digest(&content)));
        }
        Ok(Self { files })
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Paths that differ from `self` (before) to `after`.
    pub fn diff(&self, after: &Checksums) -> ChecksumDiff {
        let mut diff = ChecksumDiff::default();
        for (path, sum) in &after.files {
            match self.files.get(path) {
                None => diff.added.push(path.clone()),
                Some(before) if before != sum => diff.changed.push(path.clone()),
                Some(_) => {}
            }
        }
        diff.removed = self
            .files
            .keys()
            .filter(|path| !after.files.contains_key(*path))
            .cloned()
            .collect();
        diff
    }
}

fn relative_key(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Difference between two [`Checksums`] snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChecksumDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub changed: Vec<String>,
}

impl ChecksumDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

impl fmt::Display for ChecksumDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for path in &self.added {
            writeln!(f, "added:   {}", path)?;
        }
        for path in &self.removed {
            writeln!(f, "removed: {}", path)?;
        }
        for path in &self.changed {
            writeln!(f, "changed: {}", path)?;
        }
        Ok(())
    }
}

/// Copy of a directory's contents held in a temporary directory.
pub struct Backup {
    dir: PathBuf,
    saved: TempDir,
}

impl Backup {
    /// Copy the contents of `dir` aside.
    pub fn create(dir: &Path) -> Result<Self> {
        let saved = TempDir::new()
            .map_err(|e| Error::io("failed to create temporary directory for backup", e))?;
        copy_tree(dir, saved.path())?;
        log::debug!("backed up {} to {}", dir.display(), saved.path().display());
        Ok(Self {
            dir: dir.to_path_buf(),
            saved,
        })
    }

    /// Replace the contents of the backed-up directory with the saved copy.
    pub fn restore(self) -> Result<()> {
        clear_dir(&self.dir)?;
        copy_tree(self.saved.path(), &self.dir)?;
        log::debug!("restored {}", self.dir.display());
        Ok(())
    }
}

fn clear_dir(dir: &Path) -> Result<()> {
    let entries = fs::read_dir(dir)
        .map_err(|e| Error::io(format!("failed to read directory {}", dir.display()), e))?;
    for entry in entries {
        let entry =
            entry.map_err(|e| Error::io(format!("failed to read directory {}", dir.display()), e))?;
        let path = entry.path();
        let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());
        let removed = if is_dir {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        removed.map_err(|e| Error::io(format!("failed to remove {}", path.display()), e))?;
    }
    Ok(())
}

/// Copy the contents of `src` into the existing directory `dst`.
fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src).follow_links(false).sort_by_file_name() {
        let entry = entry?;
        if entry.depth() == 0 {
            continue;
        }
        let target = dst.join(entry.path().strip_prefix(src).unwrap_or(entry.path()));
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target).map_err(|e| {
                Error::io(format!("failed to create directory {}", target.display()), e)
            })?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), &target).map_err(|e| {
                Error::io(format!("failed to copy {}", entry.path().display()), e)
            })?;
        } else if file_type.is_symlink() {
            #[cfg(unix)]
            {
                let link = fs::read_link(entry.path()).map_err(|e| {
                    Error::io(format!("failed to read link {}", entry.path().display()), e)
                })?;
                std::os::unix::fs::symlink(&link, &target).map_err(|e| {
                    Error::io(format!("failed to create link {}", target.display()), e)
                })?;
            }
        }
    }
    Ok(())
}

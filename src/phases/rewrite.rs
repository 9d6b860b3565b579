//! Reference Rewriter
//!
//! After a module has been relocated, every Go file under the relocation root
//! is rewritten so its references still resolve:
//!
//! - imports of the `flag` package point at the private copy under the
//!   relocation root, except in module trees whose programs keep the
//!   standard library `flag`;
//! - standard library imports are left alone;
//! - imports owned by the module being repackaged gain the relocation prefix;
//! - imports owned by any other module (including a nested module that
//!   shares a path prefix) are left alone;
//! - once any import of a file changes, its import comments
//!   (`// import "..."`, `/* import "..." */`) are dropped, since they would
//!   now contradict the file's location;
//! - `package main` becomes the merged package, and its `func main` is
//!   promoted to the merged entry point.
//!
//! A file is written back only if its text changed.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::entry::promote_entry_point;
use crate::defaults::{
    ENTRY_POINT, MAIN_PACKAGE, MERGED_PACKAGE, SINGLETON_COPY_DIR, SINGLETON_PACKAGE,
};
use crate::error::{Error, Result, ResultExt};
use crate::module::{ModuleOracle, ModulePath};
use crate::syntax::{scanner, Edit, SourceFile};

/// Switches for the rewrite.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteOptions {
    /// Per directory, whether `flag` imports of the files below it keep
    /// pointing at the standard library. The deepest matching directory
    /// decides; files below no listed directory are redirected.
    pub flag_policy: BTreeMap<PathBuf, bool>,
}

impl RewriteOptions {
    /// Set whether files below `dir` keep the standard library `flag`.
    pub fn keep_flag_under(mut self, dir: impl Into<PathBuf>, keep: bool) -> Self {
        self.flag_policy.insert(dir.into(), keep);
        self
    }

    /// Whether `flag` imports of the file at `path` are left alone.
    pub fn keeps_flag(&self, path: &Path) -> bool {
        self.flag_policy
            .iter()
            .filter(|(root, _)| path.starts_with(root))
            .max_by_key(|(root, _)| root.components().count())
            .is_some_and(|(_, keep)| *keep)
    }
}

/// Summary of one rewrite pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteReport {
    /// Directories of files whose entry point was promoted.
    pub entry_points: BTreeSet<PathBuf>,
    /// Whether any import now refers to the private `flag` copy.
    pub singleton_referenced: bool,
    pub files_written: usize,
}

/// New text of one file, if it changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileRewrite {
    pub text: Option<String>,
    pub entry_point: bool,
    pub singleton_referenced: bool,
}

/// Rewrite every Go file below `dest_root`.
///
/// `owner` is the module being repackaged and `prefix` the import path of
/// `dest_root`. Import ownership is resolved relative to `dest_root`.
pub fn rewrite_tree<O: ModuleOracle + ?Sized>(
    oracle: &O,
    dest_root: &Path,
    owner: &ModulePath,
    prefix: &str,
    options: &RewriteOptions,
) -> Result<RewriteReport> {
    let mut report = RewriteReport::default();

    for entry in WalkDir::new(dest_root).sort_by_file_name() {
        let entry = entry?;
        let is_go = entry.file_type().is_file()
            && entry.file_name().to_str().is_some_and(|n| n.ends_with(".go"));
        if !is_go {
            continue;
        }

        let path = entry.path();
        let file = SourceFile::read(path)?;
        let rewrite = rewrite_file(oracle, &file, dest_root, owner, prefix, options)
            .context(|| format!("failed to rewrite {}", path.display()))?;

        if rewrite.entry_point {
            if let Some(dir) = path.parent() {
                report.entry_points.insert(dir.to_path_buf());
            }
        }
        report.singleton_referenced |= rewrite.singleton_referenced;

        if let Some(text) = rewrite.text {
            log::trace!("writing {}", path.display());
            fs::write(path, text)
                .map_err(|e| Error::io(format!("failed to write file {}", path.display()), e))?;
            report.files_written += 1;
        }
    }

    log::debug!(
        "rewrote {} files under {} for module {}",
        report.files_written,
        dest_root.display(),
        owner
    );
    Ok(report)
}

/// Compute the rewrite of a single parsed file.
pub fn rewrite_file<O: ModuleOracle + ?Sized>(
    oracle: &O,
    file: &SourceFile,
    dest_root: &Path,
    owner: &ModulePath,
    prefix: &str,
    options: &RewriteOptions,
) -> Result<FileRewrite> {
    let mut edits = Vec::new();
    let mut result = FileRewrite::default();
    let relocated_prefix = format!("{}/", prefix);

    for import in file.imports() {
        if import.path == SINGLETON_PACKAGE {
            if !options.keeps_flag(file.path()) {
                let target = format!("{}/{}", prefix, SINGLETON_COPY_DIR);
                edits.push(Edit::replace(import.path_span.clone(), scanner::quote(&target)));
                result.singleton_referenced = true;
            }
            continue;
        }
        // Already points into the relocation root.
        if import.path.starts_with(&relocated_prefix) {
            continue;
        }

        let unclassified = |source: Error| Error::Unclassified {
            import: import.path.clone(),
            file: file.path().to_path_buf(),
            source: Box::new(source),
        };

        if oracle
            .is_standard(&import.path, dest_root)
            .map_err(unclassified)?
        {
            continue;
        }

        let package = oracle
            .load_package(&import.path, dest_root)
            .map_err(unclassified)?;
        let module = package.module.ok_or_else(|| {
            unclassified(Error::UnknownModule {
                package: import.path.clone(),
                dir: dest_root.to_path_buf(),
            })
        })?;

        if &module.path == owner {
            let target = format!("{}{}", relocated_prefix, import.path);
            edits.push(Edit::replace(import.path_span.clone(), scanner::quote(&target)));
        }
    }

    if !edits.is_empty() {
        edits.extend(
            file.comments()
                .iter()
                .filter(|c| c.text.starts_with("// import") || c.text.starts_with("/* import"))
                .map(|c| file.remove_comment(c)),
        );
    }

    if file.package().name == MAIN_PACKAGE {
        edits.push(Edit::replace(file.package().span.clone(), MERGED_PACKAGE));
        if file.find_function(ENTRY_POINT).is_some() {
            edits.push(promote_entry_point(file)?);
            result.entry_point = true;
        }
    }

    if !edits.is_empty() {
        let text = file.apply(&edits)?;
        if text != file.source() {
            result.text = Some(text);
        }
    }
    Ok(result)
}

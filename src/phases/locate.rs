//! Module Locator
//!
//! Resolves a package reference to the module that contains it and to the
//! directory the module's source should be read from.
//!
//! ## Resolution Order
//!
//! 1.  **Local override**: the directory a `replace` directive substitutes
//!     for the module.
//! 2.  **Module directory**: the directory reported with the package.
//! 3.  **Module query**: the oracle's directory for the module path.
//! 4.  **Vendor splice**: the first Go file's path, cut at its last
//!     `/vendor/` component, joined with the module path.
//!
//! The locator never modifies the filesystem.

use std::path::{Component, Path, PathBuf};

use crate::defaults::VENDOR_DIR;
use crate::error::{Error, Result};
use crate::module::{ModuleInfo, ModuleOracle, ModulePath, Package};

/// A located program: its main package and the module containing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub module: ModuleInfo,
    pub package: Package,
}

/// Locate the module containing `package_ref`, resolved from `context_dir`.
pub fn locate<O: ModuleOracle + ?Sized>(
    oracle: &O,
    package_ref: &str,
    context_dir: &Path,
) -> Result<ModuleInfo> {
    locate_program(oracle, package_ref, context_dir).map(|program| program.module)
}

/// Locate `package_ref` and keep the resolved package alongside its module.
pub fn locate_program<O: ModuleOracle + ?Sized>(
    oracle: &O,
    package_ref: &str,
    context_dir: &Path,
) -> Result<Program> {
    let package = oracle.load_package(package_ref, context_dir)?;

    let first_file = package.go_files.first().ok_or_else(|| Error::NoGoFiles {
        package: package_ref.to_string(),
        dir: context_dir.to_path_buf(),
    })?;

    let record = package
        .module
        .as_ref()
        .filter(|m| !m.path.as_str().is_empty())
        .ok_or_else(|| Error::UnknownModule {
            package: package_ref.to_string(),
            dir: context_dir.to_path_buf(),
        })?;

    let dir = if let Some(dir) = &record.replace_dir {
        log::trace!("module {} is replaced by {}", record.path, dir.display());
        dir.clone()
    } else if let Some(dir) = &record.dir {
        dir.clone()
    } else if let Some(dir) = oracle.module_dir(&record.path, context_dir)? {
        dir
    } else {
        vendor_splice(&record.path, first_file)?
    };

    log::debug!(
        "located {} in module {} at {}",
        package_ref,
        record.path,
        dir.display()
    );

    let module = ModuleInfo {
        path: record.path.clone(),
        dir,
    };
    Ok(Program { module, package })
}

/// `<prefix>/vendor/<module path>` where `<prefix>` is everything before the
/// last `vendor` component of `file`.
fn vendor_splice(module: &ModulePath, file: &Path) -> Result<PathBuf> {
    let components: Vec<Component<'_>> = file.components().collect();
    let index = components
        .iter()
        .rposition(|c| c.as_os_str() == VENDOR_DIR)
        .ok_or_else(|| Error::ModuleDirNotFound {
            module: module.to_string(),
            message: format!(
                "file {} is not inside a {} directory",
                file.display(),
                VENDOR_DIR
            ),
        })?;
    let vendor_dir: PathBuf = components[..=index].iter().collect();
    Ok(vendor_dir.join(module.to_rel_path()))
}
